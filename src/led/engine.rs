use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Receiver;
use embassy_time::{Duration, Instant, Timer};
use libm::fabsf;
use smart_leds::RGB8;

use super::theme::Theme;
use super::{BLACK, Frame, LedStrip, aurora, pixel_index};
use crate::config::{
    FADE_FACTOR, FRAME_PERIOD, KEYS, LED_COUNT, STARTUP_TICK_PERIOD, STARTUP_TICKS,
};
use crate::events::LedEvent;
use crate::power::{ACTIVITY, BLACKOUT_DONE, BLACKOUT_REQUEST, IdleLevel};
use crate::settings::SETTINGS;
use crate::watchdog::LivenessChannel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Phase {
    Startup { tick: u16 },
    Running,
    Dim,
}

pub struct LedEngine {
    current: [[f32; 3]; LED_COUNT],
    target: Frame,
    frame: Frame,
    phase: Phase,
}

impl LedEngine {
    pub fn new() -> Self {
        Self {
            current: [[0.0; 3]; LED_COUNT],
            target: [BLACK; LED_COUNT],
            frame: [BLACK; LED_COUNT],
            phase: Phase::Startup { tick: 0 },
        }
    }

    /// Engine past the boot animation
    pub fn running() -> Self {
        Self {
            phase: Phase::Running,
            ..Self::new()
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn target(&self, pixel: usize) -> RGB8 {
        self.target[pixel]
    }

    pub fn frame_period(&self) -> Duration {
        match self.phase {
            Phase::Startup { .. } => STARTUP_TICK_PERIOD,
            _ => FRAME_PERIOD,
        }
    }

    pub fn apply(&mut self, event: LedEvent, theme: Theme) {
        let key = event.key_index as usize;
        if key >= KEYS {
            warn!("[leds] event for unknown key {}", key);
            return;
        }

        self.target[pixel_index(key)] = if event.is_on {
            theme.color(event.velocity)
        } else {
            BLACK
        };

        if self.phase == Phase::Dim {
            #[cfg(feature = "debug")]
            debug!("[leds] leaving dim");
            self.phase = Phase::Running;
        }
    }

    /// Advance one frame. Returns the pixels to push when anything changed.
    pub fn step(&mut self, idle: Duration) -> Option<&Frame> {
        match self.phase {
            Phase::Startup { tick } => {
                aurora::render(tick, &mut self.frame);

                let tick = tick + 1;
                self.phase = if tick >= STARTUP_TICKS {
                    info!("[leds] startup done");
                    // fade the running frame in from black
                    self.current = [[0.0; 3]; LED_COUNT];
                    Phase::Running
                } else {
                    Phase::Startup { tick }
                };
                Some(&self.frame)
            }
            Phase::Running if IdleLevel::classify(idle) >= IdleLevel::Dim => {
                info!("[leds] idle, dimming strip");
                Some(self.blackout())
            }
            Phase::Running => self.interpolate().then_some(&self.frame),
            Phase::Dim => None,
        }
    }

    /// Drop every pixel to black at once and stay dark until the next event.
    pub fn blackout(&mut self) -> &Frame {
        self.current = [[0.0; 3]; LED_COUNT];
        self.target = [BLACK; LED_COUNT];
        self.frame = [BLACK; LED_COUNT];
        self.phase = Phase::Dim;
        &self.frame
    }

    fn interpolate(&mut self) -> bool {
        let mut changed = false;

        for ((current, target), shown) in self
            .current
            .iter_mut()
            .zip(self.target.iter())
            .zip(self.frame.iter_mut())
        {
            let target = [target.r as f32, target.g as f32, target.b as f32];
            for (c, t) in current.iter_mut().zip(target) {
                let next = *c + (t - *c) * FADE_FACTOR;
                *c = if fabsf(t - next) < 1.0 { t } else { next };
            }

            let next = RGB8::new(
                to_channel(current[0]),
                to_channel(current[1]),
                to_channel(current[2]),
            );
            if next != *shown {
                *shown = next;
                changed = true;
            }
        }

        changed
    }
}

impl Default for LedEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn to_channel(value: f32) -> u8 {
    (value + 0.5) as u8
}

/// LED worker: drain events, render a frame, feed the watchdog, sleep.
pub async fn run_led_engine<S, W, M, const N: usize>(
    strip: &mut S,
    events: Receiver<'_, M, LedEvent, N>,
    watchdog: &mut W,
) -> !
where
    S: LedStrip,
    W: LivenessChannel,
    M: RawMutex,
{
    let mut engine = LedEngine::new();
    info!("[leds] startup animation");

    loop {
        let theme = SETTINGS.theme();
        while let Ok(event) = events.try_receive() {
            engine.apply(event, theme);
        }

        if let Some(frame) = engine.step(ACTIVITY.idle_for(Instant::now())) {
            strip.render(frame);
        }
        watchdog.feed();

        if let Either::Second(()) =
            select(Timer::after(engine.frame_period()), BLACKOUT_REQUEST.wait()).await
        {
            strip.render(engine.blackout());
            BLACKOUT_DONE.signal(());
        }
    }
}
