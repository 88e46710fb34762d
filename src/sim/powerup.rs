//! Falling powerup clusters
//!
//! A cluster carries three orbs spinning around its centre: shield (or an
//! extend), power and bomb. Touching an orb grants it. Staying close to the
//! cluster long enough grants all three.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::curve::Curve;
use crate::consts::SCREEN_HALF_HEIGHT;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerupSettings {
    /// Name spawn tables use to place a powerup
    pub name: String,
    /// Seconds to fall from top to bottom
    pub fall_duration: f32,
    /// Seconds the player must stay close to collect everything
    pub triple_duration: f32,
    /// Spin in degrees per second, untouched and fully charged
    pub turn_speed_start: f32,
    pub turn_speed_end: f32,
    /// Normalized height over normalized remaining time
    pub fall_curve: Curve,
    pub orb_radius: f32,
    /// Orb distance from the cluster centre
    pub orb_distance: f32,
}

impl Default for PowerupSettings {
    fn default() -> Self {
        Self {
            name: "powerup".to_string(),
            fall_duration: 10.0,
            triple_duration: 2.5,
            turn_speed_start: 180.0,
            turn_speed_end: 720.0,
            fall_curve: Curve::Linear,
            orb_radius: 0.25,
            orb_distance: 0.5,
        }
    }
}

impl PowerupSettings {
    /// Radius within which the triple timer runs
    pub fn outer_radius(&self) -> f32 {
        self.orb_distance + self.orb_radius
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orb {
    Shield,
    Extend,
    Power,
    Bomb,
}

/// What happened to a powerup this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerupOutcome {
    Falling,
    /// Fell off the bottom
    Expired,
    Collected(Orb),
    /// Shield (or extend), power and bomb at once
    CollectedAll { extend: bool },
}

#[derive(Debug, Clone, Default)]
pub struct Powerup {
    pub pos: Vec2,
    /// Degrees
    pub rotation: f32,
    fall_timer: f32,
    triple_timer: f32,
    extend: bool,
}

impl Powerup {
    pub fn spawn(&mut self, lane: f32, extend: bool, settings: &PowerupSettings) {
        self.pos = Vec2::new(lane, SCREEN_HALF_HEIGHT + 1.0);
        self.rotation = 0.0;
        self.fall_timer = settings.fall_duration;
        self.triple_timer = settings.triple_duration;
        self.extend = extend;
    }

    /// Carries an extend instead of a shield
    pub fn has_extend(&self) -> bool {
        self.extend
    }

    /// Orbs and their world positions
    pub fn orbs(&self, settings: &PowerupSettings) -> [(Orb, Vec2); 3] {
        let first = if self.extend { Orb::Extend } else { Orb::Shield };
        let place = |offset_deg: f32| {
            let rad = (self.rotation + offset_deg).to_radians();
            self.pos + Vec2::new(rad.sin(), rad.cos()) * settings.orb_distance
        };
        [
            (first, place(0.0)),
            (Orb::Power, place(120.0)),
            (Orb::Bomb, place(240.0)),
        ]
    }

    pub fn tick(
        &mut self,
        player: Option<Vec2>,
        settings: &PowerupSettings,
        dt: f32,
    ) -> PowerupOutcome {
        self.fall_timer -= dt;
        if self.fall_timer <= 0.0 {
            return PowerupOutcome::Expired;
        }

        let top = SCREEN_HALF_HEIGHT + 1.0;
        let t = settings.fall_curve.evaluate(self.fall_timer / settings.fall_duration);
        self.pos.y = -top + 2.0 * top * t;

        let charge = (self.triple_timer / settings.triple_duration).clamp(0.0, 1.0);
        let speed = settings.turn_speed_end
            + (settings.turn_speed_start - settings.turn_speed_end) * charge;
        self.rotation = (self.rotation + speed * dt) % 360.0;

        let Some(player) = player else {
            self.triple_timer = settings.triple_duration;
            return PowerupOutcome::Falling;
        };

        let outer = settings.outer_radius();
        if player.distance_squared(self.pos) < outer * outer {
            self.triple_timer -= dt;
            if self.triple_timer <= 0.0 {
                return PowerupOutcome::CollectedAll {
                    extend: self.extend,
                };
            }
        } else {
            self.triple_timer = settings.triple_duration;
        }

        let r2 = settings.orb_radius * settings.orb_radius;
        self.orbs(settings)
            .into_iter()
            .find(|(_, pos)| pos.distance_squared(player) < r2)
            .map_or(PowerupOutcome::Falling, |(orb, _)| {
                PowerupOutcome::Collected(orb)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_falls_top_to_bottom_then_expires() {
        let settings = PowerupSettings::default();
        let mut p = Powerup::default();
        p.spawn(2.0, false, &settings);
        assert_eq!(p.tick(None, &settings, 5.0), PowerupOutcome::Falling);
        assert!(p.pos.y.abs() < 1e-5);
        assert_eq!(p.pos.x, 2.0);
        assert_eq!(p.tick(None, &settings, 5.0), PowerupOutcome::Expired);
    }

    #[test]
    fn test_touching_an_orb_collects_it() {
        let settings = PowerupSettings::default();
        let mut p = Powerup::default();
        p.spawn(0.0, false, &settings);
        p.tick(None, &settings, 0.01);
        let (orb, pos) = p.orbs(&settings)[1];
        assert_eq!(orb, Orb::Power);
        // Next tick moves the cluster a little; aim at where the orb will be
        let outcome = p.tick(Some(pos), &settings, 0.001);
        assert_eq!(outcome, PowerupOutcome::Collected(Orb::Power));
    }

    #[test]
    fn test_extend_replaces_shield() {
        let settings = PowerupSettings::default();
        let mut p = Powerup::default();
        p.spawn(0.0, true, &settings);
        assert!(p.has_extend());
        assert_eq!(p.orbs(&settings)[0].0, Orb::Extend);
    }

    #[test]
    fn test_lingering_collects_all() {
        let settings = PowerupSettings {
            fall_curve: Curve::Constant { value: 0.5 },
            triple_duration: 0.1,
            ..Default::default()
        };
        let mut p = Powerup::default();
        p.spawn(0.0, false, &settings);
        p.tick(None, &settings, 0.02);
        // Centre of the cluster is inside the outer radius but off every orb
        let mut outcome = PowerupOutcome::Falling;
        for _ in 0..10 {
            outcome = p.tick(Some(p.pos), &settings, 0.02);
            if outcome != PowerupOutcome::Falling {
                break;
            }
        }
        assert_eq!(outcome, PowerupOutcome::CollectedAll { extend: false });
    }
}
