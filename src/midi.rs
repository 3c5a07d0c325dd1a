//! MIDI messages and their BLE MIDI framing.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Sender;

use crate::config::MIDI_CHANNEL;

/// One BLE MIDI packet carrying a single channel message
pub type MidiPacket = [u8; 5];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum MidiError {
    /// The outbound queue is full, the message was dropped
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum MidiMessage {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
}

impl MidiMessage {
    pub fn status(&self) -> u8 {
        let kind = match self {
            MidiMessage::NoteOn { .. } => 0x90,
            MidiMessage::NoteOff { .. } => 0x80,
        };
        kind | (MIDI_CHANNEL & 0x0F)
    }

    pub fn to_bytes(&self) -> [u8; 3] {
        match *self {
            MidiMessage::NoteOn { note, velocity } => [self.status(), note & 0x7F, velocity & 0x7F],
            MidiMessage::NoteOff { note } => [self.status(), note & 0x7F, 0],
        }
    }

    /// Frame the message as a BLE MIDI packet.
    ///
    /// The 13 bit timestamp is split over the header (high 6 bits) and the
    /// timestamp byte (low 7 bits), both with bit 7 set.
    pub fn to_ble_packet(&self, timestamp_ms: u64) -> MidiPacket {
        let ts = (timestamp_ms & 0x1FFF) as u16;
        let [status, data1, data2] = self.to_bytes();

        [
            0x80 | ((ts >> 7) as u8 & 0x3F),
            0x80 | (ts as u8 & 0x7F),
            status,
            data1,
            data2,
        ]
    }
}

/// Outbound path for framed MIDI packets.
pub trait MidiOut {
    fn send_packet(&mut self, packet: &[u8]) -> Result<(), MidiError>;
}

impl<M: RawMutex, const N: usize> MidiOut for Sender<'_, M, MidiPacket, N> {
    fn send_packet(&mut self, packet: &[u8]) -> Result<(), MidiError> {
        let mut framed = [0u8; 5];
        let len = packet.len().min(framed.len());
        framed[..len].copy_from_slice(&packet[..len]);

        self.try_send(framed).map_err(|_| MidiError::Busy)
    }
}
