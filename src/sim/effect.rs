//! Cosmetic effects
//!
//! Effects never affect gameplay. They live in their own pool so a burst of
//! kills cannot starve shots of slots.

use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    #[default]
    Kill,
    ShieldHit,
    HurtHit,
    Pickup,
    PlayerHit,
    Bomb,
}

#[derive(Debug, Clone, Default)]
pub struct Effect {
    pub kind: EffectKind,
    pub pos: Vec2,
    /// Seconds left
    pub ttl: f32,
}

impl Effect {
    pub fn tick(&mut self, dt: f32) -> bool {
        self.ttl -= dt;
        self.ttl > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::pool::Pool;

    #[test]
    fn test_effects_expire() {
        let mut pool = Pool::new(2, |_| Effect::default());
        pool.spawn(|e| {
            e.kind = EffectKind::Kill;
            e.ttl = 0.25;
        });
        pool.tick(|e, _| e.tick(0.1));
        pool.tick(|e, _| e.tick(0.1));
        assert_eq!(pool.active_count(), 1);
        pool.tick(|e, _| e.tick(0.1));
        assert_eq!(pool.active_count(), 0);
    }
}
