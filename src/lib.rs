#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

#[cfg(target_os = "none")]
pub mod ble;
pub mod config;
pub mod events;
pub mod key;
pub mod led;
pub mod matrix;
pub mod midi;
pub mod power;
pub mod scanner;
pub mod settings;
pub mod velocity;
pub mod watchdog;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::watch::Watch;

use crate::config::{LED_EVENT_CAPACITY, MIDI_OUTBOX_CAPACITY};
use crate::events::LedEvent;
use crate::midi::MidiPacket;

/// Scan worker to LED worker
pub static LED_EVENTS: Channel<CriticalSectionRawMutex, LedEvent, LED_EVENT_CAPACITY> =
    Channel::new();

/// Scan worker to the BLE MIDI characteristic
pub static MIDI_OUTBOX: Channel<CriticalSectionRawMutex, MidiPacket, MIDI_OUTBOX_CAPACITY> =
    Channel::new();

/// Central connected, published by the BLE task
pub static BLE_CONNECTED: Watch<CriticalSectionRawMutex, bool, 1> = Watch::new();

use embassy_time::{Duration, Timer};
pub async fn delay_ms(delay: u64) {
    let duration = Duration::from_millis(delay);
    Timer::after(duration).await;
}
