//! Easing curves over normalized time
//!
//! Enemy legs and powerup falls sample these with t in [0, 1].

use serde::{Deserialize, Serialize};

/// A curve mapping normalized time to a normalized value
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Curve {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    /// Smoothstep, zero slope at both ends
    EaseInOut,
    /// Holds a single value regardless of time
    Constant { value: f32 },
}

impl Curve {
    pub fn evaluate(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match *self {
            Curve::Linear => t,
            Curve::EaseIn => t * t,
            Curve::EaseOut => t * (2.0 - t),
            Curve::EaseInOut => t * t * (3.0 - 2.0 * t),
            Curve::Constant { value } => value,
        }
    }
}
