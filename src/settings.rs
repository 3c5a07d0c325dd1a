use core::sync::atomic::{AtomicI8, AtomicU8, Ordering};

use crate::config::{DEFAULT_SENSITIVITY, MAX_SENSITIVITY, MAX_TRANSPOSE};
use crate::led::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum SettingsError {
    /// Every setting is exactly one byte on the wire
    InvalidLength(usize),
}

/// A writable setting as exposed over BLE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Setting {
    Sensitivity,
    Theme,
    Transpose,
}

pub struct Settings {
    sensitivity: AtomicU8,
    theme: AtomicU8,
    transpose: AtomicI8,
}

impl Settings {
    pub const fn new() -> Self {
        Self {
            sensitivity: AtomicU8::new(DEFAULT_SENSITIVITY),
            theme: AtomicU8::new(0),
            transpose: AtomicI8::new(0),
        }
    }

    pub fn sensitivity(&self) -> u8 {
        self.sensitivity.load(Ordering::Relaxed)
    }

    /// Raw theme id as last written, unknown ids included
    pub fn theme_id(&self) -> u8 {
        self.theme.load(Ordering::Relaxed)
    }

    pub fn theme(&self) -> Theme {
        Theme::from_id(self.theme_id())
    }

    pub fn transpose(&self) -> i8 {
        self.transpose.load(Ordering::Relaxed)
    }

    pub fn set_sensitivity(&self, value: u8) -> u8 {
        let value = value.min(MAX_SENSITIVITY);
        self.sensitivity.store(value, Ordering::Relaxed);
        value
    }

    /// Theme ids are stored as written, see [`Theme::from_id`].
    pub fn set_theme(&self, id: u8) -> u8 {
        self.theme.store(id, Ordering::Relaxed);
        id
    }

    pub fn set_transpose(&self, value: i8) -> i8 {
        let value = value.clamp(-MAX_TRANSPOSE, MAX_TRANSPOSE);
        self.transpose.store(value, Ordering::Relaxed);
        value
    }

    /// Apply a one byte write from the host and return the byte actually stored.
    pub fn write(&self, setting: Setting, data: &[u8]) -> Result<u8, SettingsError> {
        let [byte] = data else {
            return Err(SettingsError::InvalidLength(data.len()));
        };

        let stored = match setting {
            Setting::Sensitivity => self.set_sensitivity(*byte),
            Setting::Theme => self.set_theme(*byte),
            Setting::Transpose => self.set_transpose(*byte as i8) as u8,
        };

        info!("[settings] {:?} updated to {}", setting, stored);
        Ok(stored)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

/// Written by the BLE config service, read by the scan and LED workers
pub static SETTINGS: Settings = Settings::new();
