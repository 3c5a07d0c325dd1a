pub mod aurora;
pub mod engine;
pub mod theme;
#[cfg(target_os = "none")]
pub mod ws2812;

use smart_leds::RGB8;

use crate::config::{LED_COUNT, PIXEL_OFFSET};

pub const BLACK: RGB8 = RGB8::new(0, 0, 0);

pub type Frame = [RGB8; LED_COUNT];

/// SPI clock of the strip encoder
pub const STRIP_SPI_HZ: u32 = 2_000_000;
/// Four SPI bytes per color channel
pub const STRIP_BYTES_PER_PIXEL: usize = 12;
/// Low bytes after the pixels that latch the frame
pub const STRIP_RESET_BYTES: usize = 140;
/// Encoded frame plus latch, sent in one transfer
pub const STRIP_BUFFER_LEN: usize = LED_COUNT * STRIP_BYTES_PER_PIXEL + STRIP_RESET_BYTES;

/// Addressable strip, blocks until the frame is latched.
pub trait LedStrip {
    fn render(&mut self, pixels: &Frame);
}

/// Strip pixel lit by a key
pub const fn pixel_index(key_index: usize) -> usize {
    key_index + PIXEL_OFFSET
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KEYS;

    #[test]
    fn keys_skip_the_first_pixel() {
        assert_eq!(pixel_index(0), 1);
        assert_eq!(pixel_index(KEYS - 1), LED_COUNT - 1);
    }

    #[test]
    fn strip_buffer_holds_a_frame_and_its_latch() {
        assert_eq!(STRIP_BUFFER_LEN - STRIP_RESET_BYTES, LED_COUNT * 3 * 4);

        // newer WS2812B parts need 280 us low to latch
        let latch_us = STRIP_RESET_BYTES as u64 * 8 * 1_000_000 / STRIP_SPI_HZ as u64;
        assert!(latch_us >= 280, "latch {} us", latch_us);
    }
}
