use smart_leds::RGB8;

use crate::config::{MAX_VELOCITY, MIN_VELOCITY};

/// Velocity to color mapping picked by the companion app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Theme {
    /// Blue for soft strikes sweeping to red, with a green tint at the top
    #[default]
    Aurora,
    /// Red through orange to white-hot
    Fire,
    /// Dim green to bright green, white flash on the hardest strikes
    Matrix,
}

impl Theme {
    /// Ids not known to this firmware fall back to aurora.
    pub fn from_id(id: u8) -> Self {
        match id {
            1 => Theme::Fire,
            2 => Theme::Matrix,
            _ => Theme::Aurora,
        }
    }

    pub fn id(self) -> u8 {
        match self {
            Theme::Aurora => 0,
            Theme::Fire => 1,
            Theme::Matrix => 2,
        }
    }

    pub fn color(self, velocity: u8) -> RGB8 {
        let clamped = velocity.clamp(MIN_VELOCITY, MAX_VELOCITY);
        let t = (clamped - MIN_VELOCITY) as f32 / (MAX_VELOCITY - MIN_VELOCITY) as f32;

        // float to int casts saturate, so every channel stays in 0..=255
        match self {
            Theme::Aurora => RGB8::new(
                (t * 255.0) as u8,
                if t > 0.8 { ((t - 0.8) * 150.0) as u8 } else { 0 },
                ((1.0 - t) * 255.0) as u8,
            ),
            Theme::Fire => RGB8::new(
                255,
                (t * 200.0) as u8,
                if t > 0.8 { ((t - 0.8) * 255.0) as u8 } else { 0 },
            ),
            Theme::Matrix => RGB8::new(
                if t > 0.9 { ((t - 0.9) * 2550.0) as u8 } else { 0 },
                (50.0 + t * 205.0) as u8,
                0,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THEMES: [Theme; 3] = [Theme::Aurora, Theme::Fire, Theme::Matrix];

    #[test]
    fn unknown_ids_fall_back_to_aurora() {
        assert_eq!(Theme::from_id(0), Theme::Aurora);
        assert_eq!(Theme::from_id(1), Theme::Fire);
        assert_eq!(Theme::from_id(2), Theme::Matrix);
        assert_eq!(Theme::from_id(3), Theme::Aurora);
        assert_eq!(Theme::from_id(255), Theme::Aurora);
    }

    #[test]
    fn ids_round_trip() {
        for theme in THEMES {
            assert_eq!(Theme::from_id(theme.id()), theme);
        }
    }

    /// Channel equality within one step of float rounding
    fn assert_close(actual: RGB8, expected: RGB8) {
        let close = |a: u8, b: u8| a.abs_diff(b) <= 1;
        assert!(
            close(actual.r, expected.r) && close(actual.g, expected.g) && close(actual.b, expected.b),
            "{:?} != {:?}",
            actual,
            expected
        );
    }

    #[test]
    fn aurora_endpoints() {
        assert_close(Theme::Aurora.color(20), RGB8::new(0, 0, 255));
        assert_close(Theme::Aurora.color(127), RGB8::new(255, 30, 0));
    }

    #[test]
    fn fire_endpoints() {
        assert_close(Theme::Fire.color(20), RGB8::new(255, 0, 0));
        assert_close(Theme::Fire.color(127), RGB8::new(255, 200, 51));
    }

    #[test]
    fn matrix_endpoints() {
        assert_close(Theme::Matrix.color(20), RGB8::new(0, 50, 0));
        assert_close(Theme::Matrix.color(127), RGB8::new(255, 255, 0));
    }

    #[test]
    fn velocities_below_the_floor_map_like_the_floor() {
        for theme in THEMES {
            assert_eq!(theme.color(0), theme.color(20));
        }
    }

    #[test]
    fn brighter_with_velocity() {
        let soft = Theme::Matrix.color(40);
        let hard = Theme::Matrix.color(110);
        assert!(hard.g > soft.g);

        let soft = Theme::Aurora.color(40);
        let hard = Theme::Aurora.color(110);
        assert!(hard.r > soft.r);
        assert!(hard.b < soft.b);
    }
}
