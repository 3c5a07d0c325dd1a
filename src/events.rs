use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Sender;

/// Key transition handed from the scan worker to the LED worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct LedEvent {
    pub key_index: u8,
    pub velocity: u8,
    pub is_on: bool,
}

impl LedEvent {
    pub fn on(key_index: u8, velocity: u8) -> Self {
        Self { key_index, velocity, is_on: true }
    }

    pub fn off(key_index: u8) -> Self {
        Self { key_index, velocity: 0, is_on: false }
    }
}

/// Never blocks the scanner. A full queue drops the event.
pub fn publish<M: RawMutex, const N: usize>(sender: &Sender<'_, M, LedEvent, N>, event: LedEvent) {
    if sender.try_send(event).is_err() {
        warn!("[leds] event queue full, dropped {:?}", event);
    }
}
