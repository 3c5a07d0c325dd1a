//! Boot animation: three drifting sine waves per channel.

use libm::sinf;
use smart_leds::RGB8;

use super::Frame;
use crate::config::{STARTUP_FADE_TICKS, STARTUP_TICKS};

/// Brightness envelope, ramps in and out over [`STARTUP_FADE_TICKS`]
fn fade(tick: u16) -> f32 {
    let remaining = STARTUP_TICKS.saturating_sub(tick);

    if tick < STARTUP_FADE_TICKS {
        tick as f32 / STARTUP_FADE_TICKS as f32
    } else if remaining < STARTUP_FADE_TICKS {
        remaining as f32 / STARTUP_FADE_TICKS as f32
    } else {
        1.0
    }
}

pub fn render(tick: u16, frame: &mut Frame) {
    let t = tick as f32 * 0.05;
    let level = fade(tick);

    for (i, pixel) in frame.iter_mut().enumerate() {
        let p = i as f32 * 0.3;
        let w1 = 0.5 + 0.5 * sinf(t + p);
        let w2 = 0.5 + 0.5 * sinf(t * 0.7 - p);
        let w3 = 0.5 + 0.5 * sinf(t * 1.3 + p);

        *pixel = RGB8::new(
            (w1 * 60.0 * level) as u8,
            (w2 * 40.0 * level) as u8,
            ((w3 * 80.0 + 20.0) * level) as u8,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::led::BLACK;
    use crate::config::LED_COUNT;

    #[test]
    fn starts_dark() {
        let mut frame = [RGB8::new(9, 9, 9); LED_COUNT];
        render(0, &mut frame);
        assert!(frame.iter().all(|p| *p == BLACK));
    }

    #[test]
    fn envelope() {
        assert_eq!(fade(0), 0.0);
        assert_eq!(fade(100), 0.5);
        assert_eq!(fade(200), 1.0);
        assert_eq!(fade(750), 1.0);
        assert_eq!(fade(1_400), 0.5);
        assert!(fade(1_499) < 0.01);
    }

    #[test]
    fn stays_within_wave_amplitude() {
        let mut frame = [BLACK; LED_COUNT];
        for tick in (0..STARTUP_TICKS).step_by(7) {
            render(tick, &mut frame);
            for pixel in frame {
                assert!(pixel.r <= 60);
                assert!(pixel.g <= 40);
                assert!(pixel.b <= 100);
            }
        }
    }

    #[test]
    fn blue_floor_at_full_brightness() {
        let mut frame = [BLACK; LED_COUNT];
        render(700, &mut frame);
        assert!(frame.iter().all(|p| p.b >= 20));
    }
}
