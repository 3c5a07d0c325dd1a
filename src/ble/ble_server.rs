use trouble_host::prelude::*;

use crate::config::DEFAULT_SENSITIVITY;
use crate::midi::MidiPacket;
use crate::settings::Setting;

/// BLE MIDI service UUID, little endian for the advertisement
pub const MIDI_SERVICE_UUID: [u8; 16] = [
    0x00, 0xc7, 0xc4, 0x4e, 0xe3, 0x6c, 0x51, 0xa7, 0x33, 0x4b, 0xe8, 0xed, 0x5a, 0x0e, 0xb8, 0x03,
];

/// GAP appearance "Unknown", there is no assigned musical instrument category
pub const APPEARANCE: BluetoothUuid16 = BluetoothUuid16::new(0x0000);

#[gatt_server]
pub struct Server {
    midi_service: MidiService,
    config_service: ConfigService,
}

#[gatt_service(uuid = "03b80e5a-ede8-4b33-a751-6ce34ec4c700")]
pub struct MidiService {
    #[characteristic(
        uuid = "7772e5db-3868-4112-a1a9-f2669d106bf3",
        read,
        write_without_response,
        notify
    )]
    io: MidiPacket,
}

#[gatt_service(uuid = "12345678-1234-5678-1234-56789abc0000")]
pub struct ConfigService {
    #[characteristic(uuid = "12345678-1234-5678-1234-56789abc0001", read, write, value = DEFAULT_SENSITIVITY)]
    sensitivity: u8,
    #[characteristic(uuid = "12345678-1234-5678-1234-56789abc0002", read, write)]
    theme: u8,
    /// Signed semitones carried as a raw byte
    #[characteristic(uuid = "12345678-1234-5678-1234-56789abc0003", read, write)]
    transpose: u8,
}

impl Server<'_> {
    /// Setting behind a config characteristic handle
    pub fn setting(&self, handle: u16) -> Option<(Setting, Characteristic<u8>)> {
        let config = &self.config_service;

        [
            (Setting::Sensitivity, config.sensitivity),
            (Setting::Theme, config.theme),
            (Setting::Transpose, config.transpose),
        ]
        .into_iter()
        .find(|(_, characteristic)| characteristic.handle == handle)
    }
}
