use embassy_executor::Spawner;
use embassy_futures::join::join;
use embassy_nrf::mode::Async;
use embassy_nrf::peripherals::{self, RNG};
use embassy_nrf::{Peri, bind_interrupts, pac, rng};
use nrf_mpsl::Peripherals as mpsl_Peripherals;
use nrf_mpsl::raw::{
    MPSL_CLOCK_LF_SRC_RC, MPSL_DEFAULT_CLOCK_ACCURACY_PPM, MPSL_DEFAULT_SKIP_WAIT_LFCLK_STARTED,
    MPSL_RECOMMENDED_RC_CTIV, MPSL_RECOMMENDED_RC_TEMP_CTIV,
};
use nrf_sdc::mpsl::MultiprotocolServiceLayer;
use nrf_sdc::{
    self as sdc, Mem, Peripherals as sdc_Peripherals, SoftdeviceController,
    mpsl::{
        ClockInterruptHandler, HighPrioInterruptHandler, LowPrioInterruptHandler,
        raw::mpsl_clock_lfclk_cfg_t,
    },
};
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha12Rng;
use static_cell::StaticCell;
use trouble_host::gap::{GapConfig, PeripheralConfig};
use trouble_host::prelude::{DefaultPacketPool, Runner};
use trouble_host::{Address, Host, HostResources, Stack};

use crate::ble::ble_server::{APPEARANCE, Server};
use crate::config::BLE_NAME;

mod ble_server;
mod peripheral;

bind_interrupts!(struct Irqs {
    RNG => rng::InterruptHandler<RNG>;
    EGU0_SWI0 => LowPrioInterruptHandler;
    CLOCK_POWER => ClockInterruptHandler;
    RADIO => HighPrioInterruptHandler;
    TIMER0 => HighPrioInterruptHandler;
    RTC0 => HighPrioInterruptHandler;
});

/// Softdevice controller memory for one peripheral link, in bytes.
const SDC_MEMORY_SIZE: usize = 3312;

const CONNECTIONS_MAX: usize = 1;
const L2CAP_CHANNELS_MAX: usize = 2;

type BleHostResources = HostResources<DefaultPacketPool, CONNECTIONS_MAX, L2CAP_CHANNELS_MAX>;

pub struct BleControllerBuilder<'a> {
    sdc_p: sdc_Peripherals<'a>,
    sdc_mem: Mem<SDC_MEMORY_SIZE>,
    //
    ppi_ch19: Peri<'a, peripherals::PPI_CH19>,
    ppi_ch30: Peri<'a, peripherals::PPI_CH30>,
    ppi_ch31: Peri<'a, peripherals::PPI_CH31>,
    rng_p: Peri<'a, peripherals::RNG>,
    rtc0: Peri<'a, peripherals::RTC0>,
    timer0: Peri<'a, peripherals::TIMER0>,
    temp: Peri<'a, peripherals::TEMP>,
}

impl<'a> BleControllerBuilder<'a>
where
    'a: 'static,
{
    const LFCLK_CFG: mpsl_clock_lfclk_cfg_t = mpsl_clock_lfclk_cfg_t {
        source: MPSL_CLOCK_LF_SRC_RC as u8,
        rc_ctiv: MPSL_RECOMMENDED_RC_CTIV as u8,
        rc_temp_ctiv: MPSL_RECOMMENDED_RC_TEMP_CTIV as u8,
        accuracy_ppm: MPSL_DEFAULT_CLOCK_ACCURACY_PPM as u16,
        skip_wait_lfclk_started: MPSL_DEFAULT_SKIP_WAIT_LFCLK_STARTED != 0,
    };

    fn build_sdc<'d, const N: usize>(
        p: nrf_sdc::Peripherals<'d>,
        rng: &'d mut rng::Rng<RNG, Async>,
        mpsl: &'d MultiprotocolServiceLayer,
        mem: &'d mut sdc::Mem<N>,
    ) -> Result<SoftdeviceController<'d>, nrf_sdc::Error> {
        sdc::Builder::new()?
            .support_adv()?
            .support_peripheral()?
            .peripheral_count(CONNECTIONS_MAX as u8)?
            .build(p, rng, mpsl, mem)
    }

    pub fn new(
        ppi_ch17: Peri<'a, peripherals::PPI_CH17>,
        ppi_ch18: Peri<'a, peripherals::PPI_CH18>,
        ppi_ch19: Peri<'a, peripherals::PPI_CH19>,
        ppi_ch20: Peri<'a, peripherals::PPI_CH20>,
        ppi_ch21: Peri<'a, peripherals::PPI_CH21>,
        ppi_ch22: Peri<'a, peripherals::PPI_CH22>,
        ppi_ch23: Peri<'a, peripherals::PPI_CH23>,
        ppi_ch24: Peri<'a, peripherals::PPI_CH24>,
        ppi_ch25: Peri<'a, peripherals::PPI_CH25>,
        ppi_ch26: Peri<'a, peripherals::PPI_CH26>,
        ppi_ch27: Peri<'a, peripherals::PPI_CH27>,
        ppi_ch28: Peri<'a, peripherals::PPI_CH28>,
        ppi_ch29: Peri<'a, peripherals::PPI_CH29>,
        ppi_ch30: Peri<'a, peripherals::PPI_CH30>,
        ppi_ch31: Peri<'a, peripherals::PPI_CH31>,
        rng_p: Peri<'a, peripherals::RNG>,
        rtc0: Peri<'a, peripherals::RTC0>,
        timer0: Peri<'a, peripherals::TIMER0>,
        temp: Peri<'a, peripherals::TEMP>,
    ) -> Self {
        let sdc_p = sdc_Peripherals::new(
            ppi_ch17, ppi_ch18, ppi_ch20, ppi_ch21, ppi_ch22, ppi_ch23, ppi_ch24, ppi_ch25,
            ppi_ch26, ppi_ch27, ppi_ch28, ppi_ch29,
        );

        Self {
            sdc_p,
            sdc_mem: sdc::Mem::<SDC_MEMORY_SIZE>::new(),
            ppi_ch19,
            ppi_ch30,
            ppi_ch31,
            rng_p,
            rtc0,
            timer0,
            temp,
        }
    }

    pub fn init(
        self,
    ) -> Result<
        (
            SoftdeviceController<'a>,
            &'static MultiprotocolServiceLayer<'a>,
            ChaCha12Rng,
        ),
        nrf_sdc::Error,
    > {
        let mpsl = {
            let p = mpsl_Peripherals::new(
                self.rtc0,
                self.timer0,
                self.temp,
                self.ppi_ch19,
                self.ppi_ch30,
                self.ppi_ch31,
            );
            MultiprotocolServiceLayer::new(p, Irqs, Self::LFCLK_CFG)
        }?;

        let sdc_rng = {
            static SDC_RNG: StaticCell<rng::Rng<'static, RNG, Async>> = StaticCell::new();
            SDC_RNG.init(rng::Rng::new(self.rng_p, Irqs))
        };

        let sdc_mem = {
            static SDC_MEM: StaticCell<sdc::Mem<SDC_MEMORY_SIZE>> = StaticCell::new();
            SDC_MEM.init(self.sdc_mem)
        };

        let mpsl = {
            static MPSL: StaticCell<MultiprotocolServiceLayer> = StaticCell::new();
            MPSL.init(mpsl)
        };

        // host seed drawn from the hardware rng before the controller takes it
        let mut seed = [0u8; 32];
        sdc_rng.blocking_fill_bytes(&mut seed);
        let rng = ChaCha12Rng::from_seed(seed);
        let sdc = Self::build_sdc(self.sdc_p, sdc_rng, mpsl, sdc_mem)?;

        Ok((sdc, mpsl, rng))
    }
}

/// Static random address from the factory programmed device id
pub fn get_device_address() -> Address {
    let ficr = pac::FICR;
    let high = u64::from(ficr.deviceaddr(1).read() & 0x0000_ffff);
    let addr = (high << 32) | u64::from(ficr.deviceaddr(0).read());
    // static random addresses have the two top bits set
    let addr = addr | 0x0000_c000_0000_0000;
    let bytes = addr.to_le_bytes();

    Address::random([bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5]])
}

/// Run BLE: host stack, MIDI and config services
pub async fn run<RNG>(
    sdc: SoftdeviceController<'static>,
    mpsl: &'static MultiprotocolServiceLayer<'static>,
    random_generator: &mut RNG,
    spawner: Spawner,
) where
    RNG: RngCore + CryptoRng,
{
    let address = get_device_address();
    info!("[ble] address: {:?}", address);

    let resources = {
        static RESOURCES: StaticCell<BleHostResources> = StaticCell::new();
        RESOURCES.init(BleHostResources::new())
    };

    let stack = {
        static STACK: StaticCell<Stack<'_, SoftdeviceController<'_>, DefaultPacketPool>> =
            StaticCell::new();
        STACK.init(
            trouble_host::new(sdc, resources)
                .set_random_address(address)
                .set_random_generator_seed(random_generator),
        )
    };

    let Host {
        mut peripheral,
        runner,
        ..
    } = stack.build();

    // run the mpsl task
    spawner.must_spawn(mpsl_task(mpsl));

    let server = match Server::new_with_config(GapConfig::Peripheral(PeripheralConfig {
        name: BLE_NAME,
        appearance: &APPEARANCE,
    })) {
        Ok(server) => server,
        Err(e) => {
            error!("[ble] failed to create GATT server: {:?}", e);
            return;
        }
    };

    join(ble_task(runner), peripheral::serve(&mut peripheral, &server)).await;
}

/// Host background task
async fn ble_task(mut runner: Runner<'_, SoftdeviceController<'static>, DefaultPacketPool>) {
    loop {
        if let Err(e) = runner.run().await {
            error!("[ble_task] error: {:?}", e);
        }
    }
}

#[embassy_executor::task]
async fn mpsl_task(mpsl: &'static MultiprotocolServiceLayer<'static>) -> ! {
    mpsl.run().await;
}
