use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Sender;
use embassy_time::{Instant, Timer};
use heapless::Vec;

use crate::config::{COLS, DIAGNOSTIC_INTERVAL, KEYS, ROWS, SCAN_YIELD, STUCK_NOTE_TIMEOUT};
use crate::events::{LedEvent, publish};
use crate::key::{KeyEvent, KeyState};
use crate::matrix::MatrixIo;
use crate::midi::{MidiMessage, MidiOut};
use crate::power::{ACTIVITY, ActivityClock, IdleLevel, PowerDown, enter_deep_sleep};
use crate::settings::{SETTINGS, Settings};
use crate::watchdog::LivenessChannel;

/// Room for contact 1, note on and a forced note off for every key
pub const SCAN_EVENT_CAPACITY: usize = 3 * KEYS;

pub type ScanEvents = Vec<ScanEvent, SCAN_EVENT_CAPACITY>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct ScanEvent {
    pub key_index: u8,
    pub event: KeyEvent,
}

fn push(events: &mut ScanEvents, key_index: usize, event: KeyEvent) {
    let event = ScanEvent {
        key_index: key_index as u8,
        event,
    };
    if events.push(event).is_err() {
        warn!("[scan] event buffer full, dropped {:?}", event);
    }
}

/// Tracks how long notes have been sounding without a break
struct StuckMonitor {
    since: Option<Instant>,
}

impl StuckMonitor {
    const fn new() -> Self {
        Self { since: None }
    }

    fn is_stuck(&mut self, sounding: usize, now: Instant) -> bool {
        if sounding == 0 {
            self.since = None;
            return false;
        }

        let since = *self.since.get_or_insert(now);
        now.saturating_duration_since(since) >= STUCK_NOTE_TIMEOUT
    }
}

pub struct Scanner {
    keys: [KeyState; KEYS],
    passes: u32,
    stuck: StuckMonitor,
}

impl Scanner {
    pub const fn new() -> Self {
        Self {
            keys: [KeyState::new(); KEYS],
            passes: 0,
            stuck: StuckMonitor::new(),
        }
    }

    pub fn key(&self, index: usize) -> &KeyState {
        &self.keys[index]
    }

    pub fn passes(&self) -> u32 {
        self.passes
    }

    /// One full pass over the matrix followed by the note off sweep.
    pub fn scan<M: MatrixIo>(
        &mut self,
        matrix: &mut M,
        now: Instant,
        settings: &Settings,
        events: &mut ScanEvents,
    ) {
        for row in 0..ROWS {
            let sample = matrix.sample_row(row);

            for col in 0..COLS {
                let index = row * COLS + col;
                let key = &mut self.keys[index];

                if let Some(event) = key.contact1(sample.first[col], now) {
                    push(events, index, event);
                }
                if let Some(event) = key.contact2(sample.second[col], now, index, settings) {
                    push(events, index, event);
                }
            }
        }

        self.release_sweep(events);
        self.passes = self.passes.wrapping_add(1);
    }

    pub fn release_sweep(&mut self, events: &mut ScanEvents) {
        for (index, key) in self.keys.iter_mut().enumerate() {
            if let Some(event) = key.release() {
                push(events, index, event);
            }
        }
    }

    /// Periodic bookkeeping, runs every [`DIAGNOSTIC_INTERVAL`] passes.
    pub fn housekeeping(&mut self, now: Instant, activity: &ActivityClock, events: &mut ScanEvents) {
        if self.passes % DIAGNOSTIC_INTERVAL != 0 {
            return;
        }

        let held = self.keys.iter().filter(|k| k.is_held()).count();
        let sounding = self.keys.iter().filter(|k| k.note_playing()).count();

        // a held key keeps the device awake even without new edges
        if held > 0 {
            activity.touch(now);
        }

        #[cfg(feature = "debug")]
        debug!("[scan] pass {}: {} held, {} sounding", self.passes, held, sounding);

        if self.stuck.is_stuck(sounding, now) {
            warn!("[scan] {} notes stuck, resetting all keys", sounding);
            self.force_reset(events);
            self.stuck = StuckMonitor::new();
        }
    }

    pub fn force_reset(&mut self, events: &mut ScanEvents) {
        for (index, key) in self.keys.iter_mut().enumerate() {
            if let Some(event) = key.force_reset() {
                push(events, index, event);
            }
        }
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Hand the events of one pass to MIDI and the LEDs. Never blocks.
pub fn dispatch<O, M, const N: usize>(
    events: &[ScanEvent],
    now: Instant,
    midi: &mut O,
    leds: &Sender<'_, M, LedEvent, N>,
    activity: &ActivityClock,
) where
    O: MidiOut,
    M: RawMutex,
{
    for ScanEvent { key_index, event } in events.iter().copied() {
        let (message, led) = match event {
            KeyEvent::Contact1 => {
                activity.touch(now);
                continue;
            }
            KeyEvent::NoteOn { note, velocity } => (
                MidiMessage::NoteOn { note, velocity },
                LedEvent::on(key_index, velocity),
            ),
            KeyEvent::NoteOff { note } => (MidiMessage::NoteOff { note }, LedEvent::off(key_index)),
        };

        #[cfg(feature = "debug")]
        info!("[scan] key {}: {:?}", key_index, message);

        // not connected or outbox full, the note is lost but keys keep working
        if let Err(_e) = midi.send_packet(&message.to_ble_packet(now.as_millis())) {
            #[cfg(feature = "debug")]
            debug!("[scan] midi dropped: {:?}", _e);
        }
        publish(leds, led);
    }
}

/// Scan worker loop. Only returns through deep sleep.
pub async fn run_scanner<X, O, W, P, M, const N: usize>(
    matrix: &mut X,
    midi: &mut O,
    leds: Sender<'_, M, LedEvent, N>,
    watchdog: &mut W,
    power: &mut P,
) -> !
where
    X: MatrixIo,
    O: MidiOut,
    W: LivenessChannel,
    P: PowerDown,
    M: RawMutex,
{
    let mut scanner = Scanner::new();
    let mut events = ScanEvents::new();

    info!("[scan] scanning {} keys", KEYS);

    loop {
        let now = Instant::now();
        events.clear();

        scanner.scan(matrix, now, &SETTINGS, &mut events);
        scanner.housekeeping(now, &ACTIVITY, &mut events);
        dispatch(&events, now, midi, &leds, &ACTIVITY);

        if IdleLevel::classify(ACTIVITY.idle_for(now)) == IdleLevel::Sleep {
            enter_deep_sleep(matrix, power).await;
        }

        watchdog.feed();
        Timer::after(SCAN_YIELD).await;
    }
}
