//! Projectiles and the three shot pools

use glam::Vec2;

use super::archetype::{ShotArchetype, ShotId, TargetType};
use super::emitter::ShotRequest;
use super::pool::Pool;
use crate::consts::RETIRE_MARGIN;
use crate::settings::Settings;
use crate::{direction_from_angle, out_of_bounds};

#[derive(Debug, Clone, Default)]
pub struct Shot {
    pub archetype: ShotId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub damage: f32,
    pub angle: i32,
    /// World tick the shot was spawned on
    pub born_tick: u64,
}

impl Shot {
    pub fn reset(&mut self, request: &ShotRequest, archetype: &ShotArchetype, tick: u64) {
        self.archetype = request.shot;
        self.pos = request.origin;
        self.vel = direction_from_angle(request.angle) * archetype.speed;
        self.radius = archetype.radius;
        self.damage = request.damage;
        self.angle = request.angle;
        self.born_tick = tick;
    }

    /// Shots spawned this tick wait for the next one to move or collide
    #[inline]
    pub fn is_fresh(&self, tick: u64) -> bool {
        self.born_tick == tick
    }

    /// Move one step. False once it has left the playfield.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.pos += self.vel * dt;
        !out_of_bounds(self.pos, RETIRE_MARGIN)
    }
}

/// Shots grouped by who they can hurt
#[derive(Debug, Clone)]
pub struct ShotPools {
    /// Aimed at the player
    pub enemy: Pool<Shot>,
    /// Aimed at enemies
    pub player: Pool<Shot>,
    /// Hurt both sides
    pub neutral: Pool<Shot>,
}

impl ShotPools {
    pub fn new(settings: &Settings) -> Self {
        Self {
            enemy: Pool::new(settings.enemy_shot_pool, |_| Shot::default()),
            player: Pool::new(settings.player_shot_pool, |_| Shot::default()),
            neutral: Pool::new(settings.neutral_shot_pool, |_| Shot::default()),
        }
    }

    pub fn pool_for(&mut self, target: TargetType) -> &mut Pool<Shot> {
        match target {
            TargetType::Player => &mut self.enemy,
            TargetType::Enemy => &mut self.player,
            TargetType::Both => &mut self.neutral,
        }
    }

    /// Spawn into the pool matching the archetype's target. False if full.
    pub fn spawn(&mut self, request: &ShotRequest, archetype: &ShotArchetype, tick: u64) -> bool {
        let spawned = self
            .pool_for(archetype.target)
            .spawn(|shot| shot.reset(request, archetype, tick));
        if !spawned {
            log::debug!("Shot pool for {:?} exhausted", archetype.target);
        }
        spawned
    }

    /// Move every shot that existed before this tick
    pub fn tick(&mut self, dt: f32, tick: u64) {
        for pool in [&mut self.enemy, &mut self.player, &mut self.neutral] {
            pool.tick(|shot, _| shot.is_fresh(tick) || shot.advance(dt));
        }
    }

    pub fn active_count(&self) -> usize {
        self.enemy.active_count() + self.player.active_count() + self.neutral.active_count()
    }

    pub fn clear_all(&mut self) {
        for pool in [&mut self.enemy, &mut self.player, &mut self.neutral] {
            pool.clear(|_| {});
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archetype(target: TargetType) -> ShotArchetype {
        ShotArchetype {
            name: "test".into(),
            target,
            speed: 10.0,
            radius: 0.1,
        }
    }

    fn request(angle: i32) -> ShotRequest {
        ShotRequest {
            origin: Vec2::ZERO,
            angle,
            shot: ShotId(0),
            damage: 1.0,
        }
    }

    #[test]
    fn test_velocity_follows_angle() {
        let mut shot = Shot::default();
        shot.reset(&request(0), &archetype(TargetType::Player), 0);
        assert!((shot.vel - Vec2::new(0.0, -10.0)).length() < 1e-4);
        shot.reset(&request(180), &archetype(TargetType::Player), 0);
        assert!((shot.vel - Vec2::new(0.0, 10.0)).length() < 1e-4);
        shot.reset(&request(90), &archetype(TargetType::Player), 0);
        assert!((shot.vel - Vec2::new(10.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_routes_by_target() {
        let mut pools = ShotPools::new(&Settings::default());
        pools.spawn(&request(0), &archetype(TargetType::Player), 0);
        pools.spawn(&request(0), &archetype(TargetType::Enemy), 0);
        pools.spawn(&request(0), &archetype(TargetType::Enemy), 0);
        pools.spawn(&request(0), &archetype(TargetType::Both), 0);
        assert_eq!(pools.enemy.active_count(), 1);
        assert_eq!(pools.player.active_count(), 2);
        assert_eq!(pools.neutral.active_count(), 1);
        pools.clear_all();
        assert_eq!(pools.active_count(), 0);
    }

    #[test]
    fn test_fresh_shots_hold_still_for_a_tick() {
        let mut pools = ShotPools::new(&Settings::default());
        pools.spawn(&request(0), &archetype(TargetType::Player), 3);
        pools.tick(0.1, 3);
        assert_eq!(pools.enemy.iter_active().next().map(|s| s.pos), Some(Vec2::ZERO));
        pools.tick(0.1, 4);
        let pos = pools.enemy.iter_active().next().map(|s| s.pos).expect("alive");
        assert!((pos.y + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_retired_past_margin() {
        let settings = Settings {
            enemy_shot_pool: 1,
            ..Default::default()
        };
        let mut pools = ShotPools::new(&settings);
        pools.spawn(&request(0), &archetype(TargetType::Player), 0);
        // 10 units/s straight down from the centre: gone once past y = -4.5
        for tick in 1..=4 {
            pools.tick(0.1, tick);
        }
        assert_eq!(pools.enemy.active_count(), 1);
        pools.tick(0.1, 5);
        assert_eq!(pools.enemy.active_count(), 0);
        assert!(pools.spawn(&request(0), &archetype(TargetType::Player), 6));
    }
}
