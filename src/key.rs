use embassy_time::Instant;

use crate::config::{
    BASE_NOTE, CONTACT2_RELEASE_DEBOUNCE, NOTE_RELEASE_DEBOUNCE, PRESS_RELEASE_DEBOUNCE,
};
use crate::settings::Settings;
use crate::velocity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum KeyEvent {
    /// Rising edge of contact 1
    Contact1,
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyState {
    m1_active: bool,
    m2_active: bool,
    note_playing: bool,
    m1_time: Instant,
    m2_time: Instant,
    m1_latch: Instant,
    m2_latch: Instant,
    /// Contact 2 as read on the latest pass, before debounce
    m2_raw: bool,
    velocity: u8,
    /// Note number sent with the note on, reused for the note off
    note: u8,
}

impl KeyState {
    pub const fn new() -> Self {
        let zero = Instant::from_ticks(0);
        Self {
            m1_active: false,
            m2_active: false,
            note_playing: false,
            m1_time: zero,
            m2_time: zero,
            m1_latch: zero,
            m2_latch: zero,
            m2_raw: false,
            velocity: 0,
            note: 0,
        }
    }

    pub fn note_playing(&self) -> bool {
        self.note_playing
    }

    /// Either contact is considered closed
    pub fn is_held(&self) -> bool {
        self.m1_active || self.m2_active
    }

    pub fn is_idle(&self) -> bool {
        !self.is_held() && !self.note_playing
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn contact1(&mut self, closed: bool, now: Instant) -> Option<KeyEvent> {
        if closed {
            if !self.m1_active {
                self.m1_active = true;
                self.m1_time = now;
                self.m1_latch = now;
                return Some(KeyEvent::Contact1);
            }
            return None;
        }

        if self.m1_active {
            let hold = if self.note_playing {
                NOTE_RELEASE_DEBOUNCE
            } else {
                PRESS_RELEASE_DEBOUNCE
            };

            let expired = now.saturating_duration_since(self.m1_latch) >= hold;
            if expired && !self.m2_active && !self.m2_raw {
                self.m1_active = false;
            }
        }
        None
    }

    pub fn contact2(
        &mut self,
        closed: bool,
        now: Instant,
        key_index: usize,
        settings: &Settings,
    ) -> Option<KeyEvent> {
        self.m2_raw = closed;

        if closed {
            if self.m2_active {
                return None;
            }

            self.m2_active = true;
            self.m2_time = now;
            self.m2_latch = now;

            if !self.m1_active {
                warn!("[key] key {} contact 2 without contact 1, lost contact 1", key_index);
                return None;
            }
            if self.note_playing {
                return None;
            }

            let gap = self.m2_time.saturating_duration_since(self.m1_time);
            self.velocity = velocity::estimate(gap, settings.sensitivity());
            self.note = note_number(key_index, settings.transpose());
            self.note_playing = true;

            return Some(KeyEvent::NoteOn {
                note: self.note,
                velocity: self.velocity,
            });
        }

        if self.m2_active
            && now.saturating_duration_since(self.m2_latch) >= CONTACT2_RELEASE_DEBOUNCE
        {
            self.m2_active = false;
        }
        None
    }

    /// Note off once both contacts have settled open.
    pub fn release(&mut self) -> Option<KeyEvent> {
        if self.note_playing && !self.m1_active && !self.m2_active {
            self.note_playing = false;
            return Some(KeyEvent::NoteOff { note: self.note });
        }
        None
    }

    /// Clear every flag, ending a sounding note.
    pub fn force_reset(&mut self) -> Option<KeyEvent> {
        let event = self
            .note_playing
            .then_some(KeyEvent::NoteOff { note: self.note });

        self.m1_active = false;
        self.m2_active = false;
        self.note_playing = false;
        self.m2_raw = false;

        event
    }
}

impl Default for KeyState {
    fn default() -> Self {
        Self::new()
    }
}

/// MIDI note for a key, clamped to the 7 bit range.
pub fn note_number(key_index: usize, transpose: i8) -> u8 {
    let note = BASE_NOTE as i32 + key_index as i32 + transpose as i32;
    note.clamp(0, 127) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    /// Run one scan tick for a key, contact 1 first like the scanner does
    fn tick(
        key: &mut KeyState,
        m1: bool,
        m2: bool,
        ms: u64,
        settings: &Settings,
    ) -> Vec<KeyEvent> {
        let mut events = Vec::new();
        events.extend(key.contact1(m1, at(ms)));
        events.extend(key.contact2(m2, at(ms), 0, settings));
        events.extend(key.release());
        events
    }

    #[test]
    fn strike_and_release() {
        let settings = Settings::new();
        let mut key = KeyState::new();

        assert_eq!(tick(&mut key, true, false, 1_000, &settings), [KeyEvent::Contact1]);
        assert_eq!(
            tick(&mut key, true, true, 1_020, &settings),
            [KeyEvent::NoteOn { note: 60, velocity: 106 }]
        );
        assert!(key.note_playing());

        // contact 2 settles first, contact 1 follows on the next pass
        assert!(tick(&mut key, false, false, 1_500, &settings).is_empty());
        assert_eq!(
            tick(&mut key, false, false, 1_501, &settings),
            [KeyEvent::NoteOff { note: 60 }]
        );
        assert!(key.is_idle());
    }

    #[test]
    fn contact1_flicker_keeps_velocity_anchor() {
        let settings = Settings::new();
        let mut key = KeyState::new();

        tick(&mut key, true, false, 0, &settings);
        // open for 100 ms, still inside the press debounce
        for ms in 1..100 {
            assert!(tick(&mut key, false, false, ms, &settings).is_empty());
        }
        let events = tick(&mut key, true, true, 100, &settings);
        assert_eq!(events, [KeyEvent::NoteOn { note: 60, velocity: 20 }]);
    }

    #[test]
    fn contact1_alone_times_out_silently() {
        let settings = Settings::new();
        let mut key = KeyState::new();

        tick(&mut key, true, false, 0, &settings);
        assert!(tick(&mut key, false, false, 10, &settings).is_empty());
        assert!(key.is_held());
        assert!(tick(&mut key, false, false, 249, &settings).is_empty());
        assert!(key.is_held());
        assert!(tick(&mut key, false, false, 250, &settings).is_empty());
        assert!(key.is_idle());
    }

    #[test]
    fn contact2_without_contact1_is_dropped() {
        let settings = Settings::new();
        let mut key = KeyState::new();

        assert!(key.contact2(true, at(5), 0, &settings).is_none());
        assert!(!key.note_playing());
        assert!(key.release().is_none());
    }

    #[test]
    fn no_second_note_on_while_playing() {
        let settings = Settings::new();
        let mut key = KeyState::new();

        tick(&mut key, true, false, 0, &settings);
        tick(&mut key, true, true, 10, &settings);
        // contact 2 bounces while contact 1 stays closed
        tick(&mut key, true, false, 70, &settings);
        assert!(tick(&mut key, true, true, 80, &settings).is_empty());
        assert!(key.note_playing());
    }

    #[test]
    fn contact2_release_is_debounced() {
        let settings = Settings::new();
        let mut key = KeyState::new();

        tick(&mut key, true, false, 0, &settings);
        tick(&mut key, true, true, 10, &settings);
        // everything opens 20 ms after contact 2 closed
        assert!(tick(&mut key, false, false, 30, &settings).is_empty());
        assert!(tick(&mut key, false, false, 59, &settings).is_empty());
        assert!(key.note_playing());
        tick(&mut key, false, false, 60, &settings);
        assert_eq!(
            tick(&mut key, false, false, 61, &settings),
            [KeyEvent::NoteOff { note: 60 }]
        );
    }

    #[test]
    fn note_off_uses_note_from_note_on() {
        let settings = Settings::new();
        let mut key = KeyState::new();

        tick(&mut key, true, false, 0, &settings);
        tick(&mut key, true, true, 10, &settings);
        settings.set_transpose(7);
        tick(&mut key, false, false, 500, &settings);
        assert_eq!(
            tick(&mut key, false, false, 501, &settings),
            [KeyEvent::NoteOff { note: 60 }]
        );
    }

    #[test]
    fn release_on_idle_key_is_noop() {
        let mut key = KeyState::new();
        assert!(key.release().is_none());
        assert!(key.force_reset().is_none());
    }

    #[test]
    fn force_reset_ends_the_note() {
        let settings = Settings::new();
        let mut key = KeyState::new();

        tick(&mut key, true, false, 0, &settings);
        tick(&mut key, true, true, 10, &settings);
        assert_eq!(key.force_reset(), Some(KeyEvent::NoteOff { note: 60 }));
        assert!(key.is_idle());
        assert!(key.release().is_none());
    }

    #[test]
    fn note_numbers_clamp() {
        assert_eq!(note_number(0, 0), 60);
        assert_eq!(note_number(23, 12), 95);
        assert_eq!(note_number(5, -12), 53);
        assert_eq!(note_number(200, 12), 127);
    }
}
