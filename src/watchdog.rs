/// One per worker. A missed feed on any channel resets the SoC.
pub trait LivenessChannel {
    fn feed(&mut self);
}

/// For host builds and workers that run without a watchdog
pub struct Unsupervised;

impl LivenessChannel for Unsupervised {
    fn feed(&mut self) {}
}

#[cfg(target_os = "none")]
mod nrf {
    use embassy_nrf::Peri;
    use embassy_nrf::peripherals::WDT;
    use embassy_nrf::wdt::{Config, HaltConfig, SleepConfig, Watchdog, WatchdogHandle};

    use super::LivenessChannel;
    use crate::config::{WATCHDOG_CHANNELS, WATCHDOG_TIMEOUT};

    /// WDT runs from the 32.768 kHz clock
    const WDT_TICK_HZ: u64 = 32_768;

    impl LivenessChannel for WatchdogHandle {
        fn feed(&mut self) {
            self.pet();
        }
    }

    /// Start the watchdog with one reload register per worker.
    pub fn start(wdt: Peri<'static, WDT>) -> [WatchdogHandle; WATCHDOG_CHANNELS] {
        let mut config = Config::default();
        config.timeout_ticks = (WATCHDOG_TIMEOUT.as_millis() * WDT_TICK_HZ / 1_000) as u32;
        config.action_during_sleep = SleepConfig::RUN;
        config.action_during_debug_halt = HaltConfig::PAUSE;

        match Watchdog::try_new(wdt, config) {
            Ok((_wdt, handles)) => {
                info!("[wdt] started, {} channels", WATCHDOG_CHANNELS);
                handles
            }
            Err(_) => {
                // already running from a previous boot with another config
                error!("[wdt] failed to start");
                panic!("watchdog");
            }
        }
    }
}

#[cfg(target_os = "none")]
pub use nrf::start;
