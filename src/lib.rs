//! Beatshot - a beat-synchronized bullet-hell simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (timeline, emitters, pools, collisions)
//! - `clock`: Audio-derived time source
//! - `audio`: Music playback seam consumed by the timeline
//! - `settings`: Data-driven tunables

pub mod audio;
pub mod clock;
pub mod error;
pub mod settings;
pub mod sim;

pub use audio::{AudioPlayer, HeadlessAudio};
pub use clock::{ClockSource, ManualClock};
pub use error::{ConfigError, ProgramError};
pub use settings::{PlayerSettings, Settings};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (50 Hz)
    pub const SIM_DT: f32 = 1.0 / 50.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Beats in one bar
    pub const BEATS_PER_BAR: u32 = 4;

    /// Playfield half extents (world units)
    pub const SCREEN_HALF_WIDTH: f32 = 3.5;
    pub const SCREEN_HALF_HEIGHT: f32 = 3.5;
    /// Entities further than this beyond the playfield edge are retired
    pub const RETIRE_MARGIN: f32 = 1.0;

    /// Seconds between a stage being rolled and its music starting
    pub const STAGE_LEAD_IN: f64 = 1.0;
    /// Length of the exit leg once a route is exhausted
    pub const EXIT_BEATS: u32 = 4;
}

/// Wrap an angle in degrees towards the [-180, 180] range.
///
/// This is not a modulo: values above 180 fold to `a % 180 - 180` and values
/// below -180 fold to `180 - (-a % 180)`. Exact multiples of 360 above 180
/// therefore land on -180, and replays depend on that.
#[inline]
pub fn wrap_angle(angle: i32) -> i32 {
    if angle < -180 {
        return 180 - (angle.unsigned_abs() % 180) as i32;
    }
    if angle > 180 {
        return (angle % 180) - 180;
    }
    angle
}

/// Signed angle in whole degrees from straight down to `dir`
/// (counter-clockwise positive, truncated toward zero).
#[inline]
pub fn signed_angle_from_down(dir: Vec2) -> i32 {
    if dir.length_squared() < f32::EPSILON {
        return 0;
    }
    // down = (0, -1): cross = dir.x, dot = -dir.y
    dir.x.atan2(-dir.y).to_degrees() as i32
}

/// Unit direction obtained by rotating straight down by `degrees`
#[inline]
pub fn direction_from_angle(degrees: i32) -> Vec2 {
    let rad = (degrees as f32).to_radians();
    Vec2::new(rad.sin(), -rad.cos())
}

/// True if `pos` lies outside the playfield extended by `margin`
#[inline]
pub fn out_of_bounds(pos: Vec2, margin: f32) -> bool {
    pos.x.abs() > consts::SCREEN_HALF_WIDTH + margin
        || pos.y.abs() > consts::SCREEN_HALF_HEIGHT + margin
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_wrap_literal_cases() {
        assert_eq!(wrap_angle(181), -179);
        assert_eq!(wrap_angle(-181), 179);
        assert_eq!(wrap_angle(270), -90);
        assert_eq!(wrap_angle(180), 180);
        assert_eq!(wrap_angle(-180), -180);
        assert_eq!(wrap_angle(360), -180);
        assert_eq!(wrap_angle(-360), 180);
        assert_eq!(wrap_angle(45), 45);
    }

    #[test]
    fn test_wrap_extremes_do_not_overflow() {
        assert!((-180..=180).contains(&wrap_angle(i32::MIN)));
        assert!((-180..=180).contains(&wrap_angle(i32::MAX)));
    }

    #[test]
    fn test_signed_angle_from_down() {
        assert_eq!(signed_angle_from_down(Vec2::new(0.0, -1.0)), 0);
        assert_eq!(signed_angle_from_down(Vec2::new(1.0, 0.0)), 90);
        assert_eq!(signed_angle_from_down(Vec2::new(-1.0, 0.0)), -90);
        assert_eq!(signed_angle_from_down(Vec2::new(1.0, -1.0)), 45);
        assert_eq!(signed_angle_from_down(Vec2::ZERO), 0);
    }

    #[test]
    fn test_direction_round_trips_angle() {
        for deg in [-170, -90, -30, 0, 15, 90, 135] {
            let dir = direction_from_angle(deg);
            assert!((dir.length() - 1.0).abs() < 1e-5);
            let back = signed_angle_from_down(dir);
            assert!((back - deg).abs() <= 1, "{deg} -> {back}");
        }
    }

    #[test]
    fn test_out_of_bounds_margin() {
        assert!(!out_of_bounds(Vec2::new(4.4, 0.0), consts::RETIRE_MARGIN));
        assert!(out_of_bounds(Vec2::new(4.6, 0.0), consts::RETIRE_MARGIN));
        assert!(out_of_bounds(Vec2::new(0.0, -4.6), consts::RETIRE_MARGIN));
    }

    proptest! {
        #[test]
        fn prop_wrap_in_range_and_idempotent(a in -10_000i32..=10_000) {
            let w = wrap_angle(a);
            prop_assert!((-180..=180).contains(&w));
            prop_assert_eq!(wrap_angle(w), w);
        }

        #[test]
        fn prop_wrap_only_lands_on_minus_180_for_multiples(a in -10_000i32..=10_000) {
            // -180 is only produced by -180 itself or exact multiples of 180 above 180
            if wrap_angle(a) == -180 {
                prop_assert!(a == -180 || (a > 180 && a % 180 == 0));
            }
        }
    }
}
