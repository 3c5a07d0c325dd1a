use embassy_time::Duration;

use crate::config::{
    DEFAULT_SENSITIVITY, MAX_SENSITIVITY, MAX_VELOCITY, MIN_VELOCITY, VELOCITY_WINDOW,
};

/// Velocity at sensitivity 50
fn raw_velocity(gap: Duration) -> u32 {
    let gap_ms = gap.as_millis();
    let window_ms = VELOCITY_WINDOW.as_millis();

    if gap_ms == 0 {
        MAX_VELOCITY as u32
    } else if gap_ms >= window_ms {
        MIN_VELOCITY as u32
    } else {
        let range = (MAX_VELOCITY - MIN_VELOCITY) as u64;
        MAX_VELOCITY as u32 - (gap_ms * range / window_ms) as u32
    }
}

/// Velocity for the gap between contact 1 and contact 2: linear from 127 at
/// zero gap to 20 at the window edge, then scaled by sensitivity / 50.
pub fn estimate(gap: Duration, sensitivity: u8) -> u8 {
    let sensitivity = sensitivity.min(MAX_SENSITIVITY) as u32;
    let scaled = raw_velocity(gap) * sensitivity / DEFAULT_SENSITIVITY as u32;

    scaled.min(MAX_VELOCITY as u32) as u8
}
