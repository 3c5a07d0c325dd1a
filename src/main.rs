#![cfg_attr(target_os = "none", no_std, no_main)]

#[cfg(target_os = "none")]
mod app {
    use defmt::{info, unwrap};
    use embassy_executor::{InterruptExecutor, Spawner};
    use embassy_nrf::gpio::{Input, Level, Output, OutputDrive, Pull};
    use embassy_nrf::interrupt;
    use embassy_nrf::interrupt::{InterruptExt, Priority};
    use embassy_nrf::peripherals::{P0_07, P0_08, P0_15, SPI3};
    use embassy_nrf::wdt::WatchdogHandle;
    use embassy_nrf::Peri;
    use embassy_time::Delay;

    use nrf_velokeys::ble::{self, BleControllerBuilder};
    use nrf_velokeys::config::{BASE_NOTE, KEYS, MAX_VELOCITY, MIDI_CHANNEL, MIN_VELOCITY};
    use nrf_velokeys::led::engine::run_led_engine;
    use nrf_velokeys::led::ws2812::Ws2812Strip;
    use nrf_velokeys::matrix::Matrix;
    use nrf_velokeys::power::SystemOff;
    use nrf_velokeys::scanner::run_scanner;
    use nrf_velokeys::{BLE_CONNECTED, LED_EVENTS, MIDI_OUTBOX, watchdog};

    use {defmt_rtt as _, panic_probe as _};

    type NrfMatrix = Matrix<Output<'static>, Input<'static>, Delay>;

    static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

    #[interrupt]
    unsafe fn EGU1_SWI1() {
        unsafe { EXECUTOR_HIGH.on_interrupt() }
    }

    #[embassy_executor::task]
    async fn scan_task(mut matrix: NrfMatrix, mut watchdog: WatchdogHandle) -> ! {
        let mut midi = MIDI_OUTBOX.sender();
        let mut power = SystemOff;

        run_scanner(
            &mut matrix,
            &mut midi,
            LED_EVENTS.sender(),
            &mut watchdog,
            &mut power,
        )
        .await
    }

    #[embassy_executor::task]
    async fn led_task(
        spi: Peri<'static, SPI3>,
        sck: Peri<'static, P0_08>,
        data: Peri<'static, P0_07>,
        mut watchdog: WatchdogHandle,
    ) -> ! {
        let mut strip = Ws2812Strip::new(spi, sck, data);
        run_led_engine(&mut strip, LED_EVENTS.receiver(), &mut watchdog).await
    }

    /// Status led follows the BLE connection
    #[embassy_executor::task]
    async fn status_led_task(led_pin: Peri<'static, P0_15>) -> ! {
        let mut led = Output::new(led_pin, Level::Low, OutputDrive::Standard);
        let mut connected = unwrap!(BLE_CONNECTED.receiver());

        loop {
            if connected.changed().await {
                led.set_high();
            } else {
                led.set_low();
            }
        }
    }

    #[embassy_executor::main]
    async fn main(spawner: Spawner) {
        // init peripherals
        let p = embassy_nrf::init(Default::default());

        info!(
            "[boot] {} keys, notes {}..{}, velocity {}..{}, midi channel {}",
            KEYS,
            BASE_NOTE,
            BASE_NOTE as usize + KEYS - 1,
            MIN_VELOCITY,
            MAX_VELOCITY,
            MIDI_CHANNEL + 1
        );

        let [scan_wdt, led_wdt] = watchdog::start(p.WDT);

        // rows idle high, columns pulled up
        let matrix = Matrix::init(
            [
                Output::new(p.P1_04, Level::High, OutputDrive::Standard),
                Output::new(p.P1_05, Level::High, OutputDrive::Standard),
                Output::new(p.P1_06, Level::High, OutputDrive::Standard),
                Output::new(p.P1_07, Level::High, OutputDrive::Standard),
                Output::new(p.P1_08, Level::High, OutputDrive::Standard),
                Output::new(p.P1_09, Level::High, OutputDrive::Standard),
            ],
            [
                Output::new(p.P1_10, Level::High, OutputDrive::Standard),
                Output::new(p.P1_11, Level::High, OutputDrive::Standard),
                Output::new(p.P1_12, Level::High, OutputDrive::Standard),
                Output::new(p.P1_13, Level::High, OutputDrive::Standard),
                Output::new(p.P1_14, Level::High, OutputDrive::Standard),
                Output::new(p.P1_15, Level::High, OutputDrive::Standard),
            ],
            [
                Input::new(p.P1_00, Pull::Up),
                Input::new(p.P1_01, Pull::Up),
                Input::new(p.P1_02, Pull::Up),
                Input::new(p.P1_03, Pull::Up),
            ],
            Delay,
        );

        // scanning preempts the leds and the ble host
        interrupt::EGU1_SWI1.set_priority(Priority::P6);
        let high_spawner = EXECUTOR_HIGH.start(interrupt::EGU1_SWI1);
        high_spawner.must_spawn(scan_task(matrix, scan_wdt));

        spawner.must_spawn(led_task(p.SPI3, p.P0_08, p.P0_07, led_wdt));
        spawner.must_spawn(status_led_task(p.P0_15));

        // init ble
        let (sdc, mpsl, mut rng) = unwrap!(
            BleControllerBuilder::new(
                p.PPI_CH17, p.PPI_CH18, p.PPI_CH19, p.PPI_CH20, p.PPI_CH21, p.PPI_CH22,
                p.PPI_CH23, p.PPI_CH24, p.PPI_CH25, p.PPI_CH26, p.PPI_CH27, p.PPI_CH28,
                p.PPI_CH29, p.PPI_CH30, p.PPI_CH31, p.RNG, p.RTC0, p.TIMER0, p.TEMP,
            )
            .init()
        );

        // run ble
        ble::run(sdc, mpsl, &mut rng, spawner).await;
    }
}

#[cfg(not(target_os = "none"))]
fn main() {}
