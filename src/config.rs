use embassy_time::Duration;

/// Rows per contact bank
pub const ROWS: usize = 6;
/// Columns shared by both banks
pub const COLS: usize = 4;
pub const KEYS: usize = ROWS * COLS;

/// Name your keyboard
pub const BLE_NAME: &str = "Superr MIDI";

// ── MIDI ────────────────────────────────────────────────────────────────────

/// MIDI channel 1, zero based
pub const MIDI_CHANNEL: u8 = 0;
/// Note emitted by key 0 with no transpose (C4)
pub const BASE_NOTE: u8 = 60;

pub const MIN_VELOCITY: u8 = 20;
pub const MAX_VELOCITY: u8 = 127;
/// Contact gap at or beyond which a strike gets the minimum velocity
pub const VELOCITY_WINDOW: Duration = Duration::from_millis(100);

// ── runtime settings ────────────────────────────────────────────────────────

pub const DEFAULT_SENSITIVITY: u8 = 50;
pub const MAX_SENSITIVITY: u8 = 100;
pub const MAX_TRANSPOSE: i8 = 12;

// ── key debounce ────────────────────────────────────────────────────────────

/// Contact 1 release hold while the note is still being struck
pub const PRESS_RELEASE_DEBOUNCE: Duration = Duration::from_millis(250);
/// Contact 1 release hold once the note is sounding
pub const NOTE_RELEASE_DEBOUNCE: Duration = Duration::from_millis(50);
/// Contact 2 release hold
pub const CONTACT2_RELEASE_DEBOUNCE: Duration = Duration::from_millis(50);

/// Notes sounding without a break for this long get force released
pub const STUCK_NOTE_TIMEOUT: Duration = Duration::from_secs(5);

// ── scan timing ─────────────────────────────────────────────────────────────

/// Row held low before the columns are read, in us
pub const ROW_SETTLE_US: u32 = 100;
/// Pause between bank 1 and bank 2 of the same row, in us
pub const BANK_ISOLATION_US: u32 = 50;
/// Scan worker yield between passes
pub const SCAN_YIELD: Duration = Duration::from_micros(100);
/// Passes between diagnostic bookkeeping runs
pub const DIAGNOSTIC_INTERVAL: u32 = 200;

// ── leds ────────────────────────────────────────────────────────────────────

/// Pixel 0 is sacrificial, key k lights pixel k + 1
pub const PIXEL_OFFSET: usize = 1;
pub const LED_COUNT: usize = KEYS + PIXEL_OFFSET;
pub const LED_EVENT_CAPACITY: usize = 50;

pub const FRAME_PERIOD: Duration = Duration::from_millis(16);
/// Fraction of the remaining distance covered each frame
pub const FADE_FACTOR: f32 = 0.25;

pub const STARTUP_TICKS: u16 = 1500;
pub const STARTUP_FADE_TICKS: u16 = 200;
pub const STARTUP_TICK_PERIOD: Duration = Duration::from_millis(10);

// ── power ───────────────────────────────────────────────────────────────────

/// Idle time before the strip goes dark
pub const DIM_TIMEOUT: Duration = Duration::from_secs(60);
/// Idle time before deep sleep
pub const SLEEP_TIMEOUT: Duration = Duration::from_secs(300);
/// How long the scan worker waits for the LED worker to black out the strip
pub const BLACKOUT_TIMEOUT: Duration = Duration::from_millis(100);

/// Feed deadline for every watchdog channel
pub const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(5);
/// One channel for the scan worker, one for the LED worker
pub const WATCHDOG_CHANNELS: usize = 2;

// ── ble ─────────────────────────────────────────────────────────────────────

pub const MIDI_OUTBOX_CAPACITY: usize = 32;

/// Column pins on port 1, armed as wake sources before system off
pub const COL_PINS: [usize; COLS] = [0, 1, 2, 3];
