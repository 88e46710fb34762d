//! Circle overlap tests and the per-tick hit resolution passes
//!
//! Resolution order is fixed and observable:
//! 1. Every enemy against neutral shots, player shots, then the player body.
//!    Shield boxes are always tested before hurt boxes.
//! 2. Enemy shots, then neutral shots, then enemy hit boxes against the player.
//!
//! Enemies are resolved first so a shot that kills an enemy can no longer
//! reach the player in the same tick.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::archetype::{Catalog, EnemyArchetype};
use super::effect::EffectKind;
use super::enemy::Enemy;
use super::pool::Pool;
use super::shot::Shot;
use super::state::{GameEvent, ShotFire, World};

/// Circle collider positioned relative to its owner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    #[serde(default)]
    pub offset: Vec2,
    pub radius: f32,
}

impl Circle {
    #[inline]
    pub fn center(&self, owner: Vec2) -> Vec2 {
        owner + self.offset
    }

    /// True if a circle at `pos` with `radius` touches this one
    #[inline]
    pub fn overlaps(&self, owner: Vec2, pos: Vec2, radius: f32) -> bool {
        circles_overlap(self.center(owner), self.radius, pos, radius)
    }
}

#[inline]
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let r = ra + rb;
    a.distance_squared(b) < r * r
}

/// True if any of `boxes` (placed at `owner`) touches the circle
pub fn any_overlap(boxes: &[Circle], owner: Vec2, pos: Vec2, radius: f32) -> bool {
    boxes.iter().any(|b| b.overlaps(owner, pos, radius))
}

/// What a shot did to an enemy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotContact {
    Miss,
    /// Absorbed without damage
    Shielded,
    Hurt,
}

/// Shield first, then hurt
pub fn shot_contact(shot: &Shot, enemy_pos: Vec2, archetype: &EnemyArchetype) -> ShotContact {
    if any_overlap(&archetype.shield_boxes, enemy_pos, shot.pos, shot.radius) {
        ShotContact::Shielded
    } else if any_overlap(&archetype.hurt_boxes, enemy_pos, shot.pos, shot.radius) {
        ShotContact::Hurt
    } else {
        ShotContact::Miss
    }
}

/// Retire every shot in `pool` that touches the enemy, summing damage.
/// Contact positions go to `contacts`.
fn try_damage(
    pool: &mut Pool<Shot>,
    enemy_pos: Vec2,
    archetype: &EnemyArchetype,
    tick: u64,
    contacts: &mut Vec<(EffectKind, Vec2)>,
) -> f32 {
    let mut damage = 0.0;
    pool.tick(|shot, _| {
        if shot.is_fresh(tick) {
            return true;
        }
        match shot_contact(shot, enemy_pos, archetype) {
            ShotContact::Miss => true,
            ShotContact::Shielded => {
                contacts.push((EffectKind::ShieldHit, shot.pos));
                false
            }
            ShotContact::Hurt => {
                damage += shot.damage;
                contacts.push((EffectKind::HurtHit, shot.pos));
                false
            }
        }
    });
    damage
}

/// Retire the first shot touching the player. True on a hit.
fn try_hit_player(pool: &mut Pool<Shot>, player_pos: Vec2, player_radius: f32, tick: u64) -> bool {
    let mut hit = false;
    pool.tick(|shot, _| {
        if hit || shot.is_fresh(tick) {
            return true;
        }
        if circles_overlap(shot.pos, shot.radius, player_pos, player_radius) {
            hit = true;
            return false;
        }
        true
    });
    hit
}

/// Run both resolution passes for this tick
pub fn resolve(world: &mut World) {
    resolve_enemies(world);
    resolve_player(world);
}

/// Pass 1: everything that can hurt enemies
fn resolve_enemies(world: &mut World) {
    let World {
        catalog,
        enemies,
        shots,
        player,
        timeline,
        rng,
        events,
        tick_count,
        ..
    } = world;
    let catalog: &Catalog = catalog;
    let tick = *tick_count;
    let settings = &catalog.settings;
    let revenge = timeline.loop_count() >= settings.revenge_from_loop;
    let player_alive = player.is_alive();
    let player_pos = player.pos;
    let melee = settings.melee_damage;

    let mut contacts = Vec::new();
    let mut kills: Vec<(Vec2, u64)> = Vec::new();

    enemies.tick(|enemy: &mut Enemy, _| {
        let archetype = catalog.enemy(enemy.archetype);
        let mut damage = try_damage(&mut shots.neutral, enemy.pos, archetype, tick, &mut contacts);
        damage += try_damage(&mut shots.player, enemy.pos, archetype, tick, &mut contacts);

        if player_alive
            && !any_overlap(
                &archetype.shield_boxes,
                enemy.pos,
                player_pos,
                settings.player.hit_radius,
            )
            && any_overlap(
                &archetype.hurt_boxes,
                enemy.pos,
                player_pos,
                settings.player.hit_radius,
            )
        {
            damage += melee;
        }

        if damage <= 0.0 || !enemy.try_die(damage) {
            return true;
        }

        kills.push((enemy.pos, archetype.score));
        if revenge {
            let mut fire = ShotFire {
                target: player_alive.then_some(player_pos),
                fallback_angle: 0,
                catalog,
                shots: &mut *shots,
                rng: &mut *rng,
                events: &mut *events,
                tick,
            };
            enemy.fire_revenge(&mut fire);
        }
        false
    });

    for (kind, pos) in contacts {
        world.spawn_effect(kind, pos);
    }
    let mut points = 0;
    for (pos, score) in kills {
        world.events.push(GameEvent::EnemyKilled { pos, score });
        world.spawn_effect(EffectKind::Kill, pos);
        points += score;
    }
    world.award_score(points);
}

/// Pass 2: everything that can hurt the player
fn resolve_player(world: &mut World) {
    if !world.player.is_alive() || world.player.is_invulnerable() {
        return;
    }
    let tick = world.tick_count;
    let pos = world.player.pos;
    let radius = world.catalog.settings.player.hit_radius;

    let hit = try_hit_player(&mut world.shots.enemy, pos, radius, tick)
        || try_hit_player(&mut world.shots.neutral, pos, radius, tick)
        || {
            let catalog = &world.catalog;
            world
                .enemies
                .iter_active()
                .any(|e| any_overlap(&catalog.enemy(e.archetype).hit_boxes, e.pos, pos, radius))
        };

    if hit {
        world.hurt_player();
    }
}
