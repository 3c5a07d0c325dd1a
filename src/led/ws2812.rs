use embassy_nrf::peripherals::{P0_07, P0_08, SPI3};
use embassy_nrf::spim::{self, Spim};
use embassy_nrf::{Peri, bind_interrupts};
use smart_leds::SmartLedsWrite;
use static_cell::StaticCell;
use ws2812_spi::prerendered::Ws2812;

use super::{Frame, LedStrip, STRIP_BUFFER_LEN};

bind_interrupts!(struct Irqs {
    SPIM3 => spim::InterruptHandler<SPI3>;
});

/// WS2812 strip clocked out of SPIM3 MOSI. SCK is routed to an unused pin.
///
/// Frames are encoded into RAM first and leave as a single EasyDMA transfer,
/// latch included, so the scan interrupt cannot stall the line mid frame.
pub struct Ws2812Strip {
    ws: Ws2812<'static, Spim<'static, SPI3>>,
}

impl Ws2812Strip {
    pub fn new(
        spi: Peri<'static, SPI3>,
        sck: Peri<'static, P0_08>,
        data: Peri<'static, P0_07>,
    ) -> Self {
        let mut config = spim::Config::default();
        // STRIP_SPI_HZ, the encoder needs 2 to 3.8 MHz
        config.frequency = spim::Frequency::M2;

        let spim = Spim::new_txonly(spi, Irqs, sck, data, config);

        let buffer = {
            static BUFFER: StaticCell<[u8; STRIP_BUFFER_LEN]> = StaticCell::new();
            BUFFER.init([0; STRIP_BUFFER_LEN])
        };

        Self {
            ws: Ws2812::new(spim, buffer),
        }
    }
}

impl LedStrip for Ws2812Strip {
    fn render(&mut self, pixels: &Frame) {
        if self.ws.write(pixels.iter().copied()).is_err() {
            error!("[leds] strip write failed");
        }
    }
}
