use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, with_timeout};

use crate::config::{BLACKOUT_TIMEOUT, DIM_TIMEOUT, SLEEP_TIMEOUT};
use crate::matrix::{MatrixIo, PinProfile};

/// Time of the last key activity.
///
/// Kept as wrapping 32 bit milliseconds, the Cortex-M4 has no 64 bit atomics.
/// The device sleeps after minutes, far inside the 24 day signed window.
pub struct ActivityClock {
    last_ms: AtomicU32,
}

impl ActivityClock {
    pub const fn new() -> Self {
        Self {
            last_ms: AtomicU32::new(0),
        }
    }

    pub fn touch(&self, now: Instant) {
        self.last_ms.store(now.as_millis() as u32, Ordering::Relaxed);
    }

    /// Time since the last touch. A touch stamped after `now` counts as no
    /// idle time.
    pub fn idle_for(&self, now: Instant) -> Duration {
        let last = self.last_ms.load(Ordering::Relaxed);
        let elapsed = (now.as_millis() as u32).wrapping_sub(last) as i32;
        Duration::from_millis(elapsed.max(0) as u64)
    }
}

impl Default for ActivityClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Updated by the scan worker, read by the scan and LED workers
pub static ACTIVITY: ActivityClock = ActivityClock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum IdleLevel {
    Active,
    /// Strip dark, keys still scanned
    Dim,
    Sleep,
}

impl IdleLevel {
    pub fn classify(idle: Duration) -> Self {
        if idle >= SLEEP_TIMEOUT {
            IdleLevel::Sleep
        } else if idle >= DIM_TIMEOUT {
            IdleLevel::Dim
        } else {
            IdleLevel::Active
        }
    }
}

/// Raised by the scan worker before sleeping; the LED worker blacks out the
/// strip and answers on [`BLACKOUT_DONE`].
pub static BLACKOUT_REQUEST: Signal<CriticalSectionRawMutex, ()> = Signal::new();
pub static BLACKOUT_DONE: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Platform deep sleep primitive. Wakeup is a reset.
pub trait PowerDown {
    fn power_down(&mut self) -> !;
}

/// Black out the strip, arm the matrix as wake source and power down.
pub async fn enter_deep_sleep<M: MatrixIo, P: PowerDown>(matrix: &mut M, power: &mut P) -> ! {
    info!("[power] idle timeout, entering deep sleep");

    BLACKOUT_REQUEST.signal(());
    if with_timeout(BLACKOUT_TIMEOUT, BLACKOUT_DONE.wait()).await.is_err() {
        warn!("[power] strip blackout not confirmed");
    }

    matrix.apply_profile(PinProfile::WakeSense);
    power.power_down()
}

/// nRF52840 System OFF with the columns sensing low.
#[cfg(target_os = "none")]
pub struct SystemOff;

#[cfg(target_os = "none")]
impl PowerDown for SystemOff {
    fn power_down(&mut self) -> ! {
        use crate::config::COL_PINS;
        use embassy_nrf::pac;
        use embassy_nrf::pac::gpio::vals;

        // gpio drivers are still alive, write the pin config directly
        for pin in COL_PINS {
            pac::P1.pin_cnf(pin).write(|w| {
                w.set_dir(vals::Dir::INPUT);
                w.set_input(vals::Input::CONNECT);
                w.set_pull(vals::Pull::PULLUP);
                w.set_sense(vals::Sense::LOW);
            });
        }

        info!("[power] system off");
        pac::POWER.systemoff().write(|w| w.set_systemoff(true));

        loop {
            cortex_m::asm::wfe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_from_boot() {
        let clock = ActivityClock::new();
        assert_eq!(clock.idle_for(Instant::from_secs(30)), Duration::from_secs(30));
    }

    #[test]
    fn touch_restarts_idle() {
        let clock = ActivityClock::new();
        clock.touch(Instant::from_secs(100));
        assert_eq!(clock.idle_for(Instant::from_secs(100)), Duration::from_secs(0));
        assert_eq!(clock.idle_for(Instant::from_millis(100_250)), Duration::from_millis(250));
    }

    #[test]
    fn idle_survives_wrap() {
        let clock = ActivityClock::new();
        let before_wrap = Instant::from_millis(u32::MAX as u64 - 500);
        clock.touch(before_wrap);
        let after_wrap = Instant::from_millis(u32::MAX as u64 + 1_500);
        assert_eq!(clock.idle_for(after_wrap), Duration::from_millis(2_000));
    }

    #[test]
    fn touch_ahead_of_now_is_not_idle() {
        // the scan worker can touch between another worker reading the time
        // and loading the clock
        let clock = ActivityClock::new();
        clock.touch(Instant::from_millis(1_000));

        let idle = clock.idle_for(Instant::from_millis(999));
        assert_eq!(idle, Duration::from_millis(0));
        assert_eq!(IdleLevel::classify(idle), IdleLevel::Active);
    }

    #[test]
    fn idle_thresholds() {
        assert_eq!(IdleLevel::classify(Duration::from_secs(59)), IdleLevel::Active);
        assert_eq!(IdleLevel::classify(Duration::from_secs(60)), IdleLevel::Dim);
        assert_eq!(IdleLevel::classify(Duration::from_secs(299)), IdleLevel::Dim);
        assert_eq!(IdleLevel::classify(Duration::from_secs(300)), IdleLevel::Sleep);
    }
}
