//! World state and presentation events
//!
//! One `World` owns the timeline, every pool and the player. Subsystems get
//! it (or the fields they need) passed in explicitly.

use std::ops::Range;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::archetype::{Catalog, EnemyId, ShotId};
use super::effect::{Effect, EffectKind};
use super::emitter::{FireContext, ShotRequest};
use super::enemy::{Enemy, EnemySpawn, LegTiming};
use super::player::{HitOutcome, Player};
use super::pool::Pool;
use super::powerup::{Orb, Powerup};
use super::shot::ShotPools;
use super::stage::SpawnTarget;
use super::timeline::{BeatInfo, Timeline, TimelineEvent};
use crate::audio::AudioPlayer;
use crate::signed_angle_from_down;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Nothing started yet
    Idle,
    Playing,
    Paused,
    /// Out of lives
    GameOver,
}

/// Fire-and-forget notifications for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    StageStarted {
        stage: usize,
        name: String,
        loop_count: u32,
        start: f64,
    },
    /// First beat of a bar
    Bar {
        bar: i32,
    },
    Beat {
        bar: i32,
        beat: i32,
        total: i64,
    },
    EnemySpawned {
        archetype: EnemyId,
        pos: Vec2,
    },
    PowerupSpawned {
        pos: Vec2,
        extend: bool,
    },
    /// A due spawn found its pool full
    SpawnDropped {
        beat: i64,
    },
    ShotFired {
        shot: ShotId,
        pos: Vec2,
        angle: i32,
    },
    Effect {
        kind: EffectKind,
        pos: Vec2,
    },
    EnemyKilled {
        pos: Vec2,
        score: u64,
    },
    PowerupCollected {
        orb: Orb,
        pos: Vec2,
    },
    BombUsed {
        pos: Vec2,
    },
    PlayerHit {
        pos: Vec2,
        shield_lost: bool,
    },
    PlayerDied {
        pos: Vec2,
    },
    ExtendEarned {
        score: u64,
    },
    Paused,
    Resumed {
        lost: f64,
    },
    GameOver {
        score: u64,
    },
}

/// Fire context shared by enemy and player emitters
pub struct ShotFire<'a> {
    /// Point to aim at, if there is one
    pub target: Option<Vec2>,
    /// Angle used when there is nothing to aim at
    pub fallback_angle: i32,
    pub catalog: &'a Catalog,
    pub shots: &'a mut ShotPools,
    pub rng: &'a mut Pcg32,
    pub events: &'a mut Vec<GameEvent>,
    pub tick: u64,
}

impl FireContext for ShotFire<'_> {
    fn angle_to_target(&self, origin: Vec2) -> i32 {
        self.target
            .map_or(self.fallback_angle, |target| signed_angle_from_down(target - origin))
    }

    fn random_spread(&mut self, spread: i32) -> i32 {
        let spread = spread.saturating_abs();
        self.rng.random_range(-spread..=spread)
    }

    fn spawn_shot(&mut self, request: ShotRequest) -> bool {
        let archetype = self.catalog.shot(request.shot);
        if !self.shots.spawn(&request, archetype, self.tick) {
            return false;
        }
        self.events.push(GameEvent::ShotFired {
            shot: request.shot,
            pos: request.origin,
            angle: request.angle,
        });
        true
    }
}

/// Put a cosmetic effect in its pool and announce it. A full pool drops it.
pub(crate) fn spawn_effect(
    effects: &mut Pool<Effect>,
    events: &mut Vec<GameEvent>,
    ttl: f32,
    kind: EffectKind,
    pos: Vec2,
) {
    let spawned = effects.spawn(|e| {
        e.kind = kind;
        e.pos = pos;
        e.ttl = ttl;
    });
    if !spawned {
        log::debug!("Effect pool full, dropping {:?}", kind);
        return;
    }
    events.push(GameEvent::Effect { kind, pos });
}

/// Complete simulation state
pub struct World {
    pub catalog: Catalog,
    pub phase: GamePhase,
    pub timeline: Timeline,
    pub enemies: Pool<Enemy>,
    pub shots: ShotPools,
    pub effects: Pool<Effect>,
    pub powerups: Pool<Powerup>,
    pub player: Player,
    pub score: u64,
    /// Score at which the next extend is earned
    pub next_extend: u64,
    /// An extend was earned and waits for a powerup to carry it
    pub extend_pending: bool,
    /// Ticks simulated while playing
    pub tick_count: u64,
    pub rng: Pcg32,
    /// Dispatch decision of the last spawn event, for `CarryOver`
    pub carry_over: bool,
    pub events: Vec<GameEvent>,
}

impl World {
    pub fn new(catalog: Catalog) -> Self {
        let settings = &catalog.settings;
        let max_emitters = settings.max_emitters;
        let depth = settings.max_repeat_depth;
        log::debug!("Allocating {} pooled entities", settings.total_pool_slots());

        Self {
            phase: GamePhase::Idle,
            timeline: Timeline::new(settings.stage_lead_in),
            enemies: Pool::new(settings.enemy_pool, |_| Enemy::new(max_emitters, depth)),
            shots: ShotPools::new(settings),
            effects: Pool::new(settings.effect_pool, |_| Effect::default()),
            powerups: Pool::new(settings.powerup_pool, |_| Powerup::default()),
            player: Player::new(&settings.player, max_emitters, depth),
            score: 0,
            next_extend: settings.extend_every,
            extend_pending: false,
            tick_count: 0,
            rng: Pcg32::seed_from_u64(settings.seed),
            carry_over: true,
            events: Vec::with_capacity(256),
            catalog,
        }
    }

    /// Start (or restart) a run from stage 0
    pub fn start_game(&mut self, now: f64, audio: &mut impl AudioPlayer) {
        self.clear_pools();
        let settings = &self.catalog.settings;
        self.player.reset(&settings.player);
        self.score = 0;
        self.next_extend = settings.extend_every;
        self.extend_pending = false;
        self.tick_count = 0;
        self.rng = Pcg32::seed_from_u64(settings.seed);
        self.carry_over = true;

        match self.timeline.start_game(now, &self.catalog.stages, audio) {
            Some(event) => {
                self.phase = GamePhase::Playing;
                self.on_timeline_event(event, now);
            }
            None => self.phase = GamePhase::Idle,
        }
    }

    /// Retire everything in every pool
    pub fn clear_pools(&mut self) {
        self.enemies.clear(|_| {});
        self.shots.clear_all();
        self.effects.clear(|_| {});
        self.powerups.clear(|_| {});
    }

    pub fn pause(&mut self, now: f64, audio: &mut impl AudioPlayer) -> bool {
        if self.phase != GamePhase::Playing || !self.timeline.pause(now, audio) {
            return false;
        }
        self.phase = GamePhase::Paused;
        self.events.push(GameEvent::Paused);
        log::info!("Paused at {:.3}", now);
        true
    }

    /// Resume and shift every entity deadline by the paused duration
    pub fn resume(&mut self, now: f64, audio: &mut impl AudioPlayer) -> bool {
        if self.phase != GamePhase::Paused {
            return false;
        }
        let Some(lost) = self.timeline.resume(now, audio) else {
            return false;
        };
        self.enemies.tick(|enemy, _| {
            enemy.on_unpause(lost);
            true
        });
        self.phase = GamePhase::Playing;
        self.events.push(GameEvent::Resumed { lost });
        true
    }

    /// Hand queued events to the presentation layer
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, GameEvent> {
        self.events.drain(..)
    }

    /// Active enemies that count for `NoEnemiesPresent`
    pub fn counted_enemies(&self) -> usize {
        self.enemies.iter_active().filter(|e| e.is_counted()).count()
    }

    pub fn spawn_effect(&mut self, kind: EffectKind, pos: Vec2) {
        let ttl = self.catalog.settings.effect_ttl;
        spawn_effect(&mut self.effects, &mut self.events, ttl, kind, pos);
    }

    pub fn award_score(&mut self, points: u64) {
        if points == 0 {
            return;
        }
        self.score += points;
        let every = self.catalog.settings.extend_every;
        if every == 0 {
            return;
        }
        while self.score >= self.next_extend {
            self.extend_pending = true;
            self.next_extend += every;
            self.events.push(GameEvent::ExtendEarned { score: self.score });
        }
    }

    pub fn hurt_player(&mut self) {
        let pos = self.player.pos;
        match self.player.hit(&self.catalog.settings.player) {
            HitOutcome::Ignored => {}
            HitOutcome::ShieldLost => {
                self.events.push(GameEvent::PlayerHit {
                    pos,
                    shield_lost: true,
                });
                self.spawn_effect(EffectKind::ShieldHit, pos);
            }
            HitOutcome::LifeLost => {
                self.events.push(GameEvent::PlayerHit {
                    pos,
                    shield_lost: false,
                });
                self.spawn_effect(EffectKind::PlayerHit, pos);
            }
            HitOutcome::Dead => {
                log::info!("Player died with {} points", self.score);
                self.events.push(GameEvent::PlayerDied { pos });
                self.spawn_effect(EffectKind::PlayerHit, pos);
            }
        }
    }

    /// Spend a bomb: wipes every shot that can hurt the player
    pub fn use_bomb(&mut self) -> bool {
        if !self.player.is_alive() || !self.player.use_bomb() {
            return false;
        }
        self.shots.enemy.clear(|_| {});
        self.shots.neutral.clear(|_| {});
        let pos = self.player.pos;
        self.events.push(GameEvent::BombUsed { pos });
        self.spawn_effect(EffectKind::Bomb, pos);
        true
    }

    pub(crate) fn on_timeline_event(&mut self, event: TimelineEvent, now: f64) {
        match event {
            TimelineEvent::StageStarted {
                stage,
                loop_count,
                start,
            } => {
                self.carry_over = true;
                self.events.push(GameEvent::StageStarted {
                    stage,
                    name: self.catalog.stages[stage].name.clone(),
                    loop_count,
                    start,
                });
            }
            TimelineEvent::Beat(info) => {
                if info.is_downbeat() {
                    self.events.push(GameEvent::Bar { bar: info.bar });
                }
                self.events.push(GameEvent::Beat {
                    bar: info.bar,
                    beat: info.beat,
                    total: info.total,
                });
                // Enemies spawned on this beat hear it too
                self.dispatch_spawns(&info, now);
                self.broadcast_beat(now);
            }
        }
    }

    fn leg_timing(&self, now: f64) -> LegTiming {
        LegTiming {
            now,
            beat_len: self.timeline.beat_length(),
            exit_beats: self.catalog.settings.exit_beats,
        }
    }

    /// Materialize the spawn events that came due on this beat
    fn dispatch_spawns(&mut self, info: &BeatInfo, now: f64) {
        let Some(stage_idx) = self.timeline.stage_index() else {
            return;
        };
        let timing = self.leg_timing(now);
        let spawns: Range<usize> = info.spawns.clone();

        for index in spawns {
            let counted = self.counted_enemies();
            let event = &self.catalog.stages[stage_idx].spawns[index];
            let permitted = event.condition.permits(counted, self.carry_over);
            self.carry_over = permitted;
            if !permitted {
                log::debug!("Spawn {} held back by {:?}", index, event.condition);
                continue;
            }

            let spawned = match event.target {
                SpawnTarget::Enemy(id) => {
                    let spawn = EnemySpawn {
                        id,
                        archetype: self.catalog.enemy(id),
                        lane: event.lane,
                        mirrored: event.mirrored,
                        exempt: event.exempt,
                        route: event.route.as_ref(),
                    };
                    let ok = self.enemies.spawn(|enemy| enemy.spawn(&spawn, timing));
                    if ok {
                        self.events.push(GameEvent::EnemySpawned {
                            archetype: id,
                            pos: Vec2::new(event.lane, crate::consts::SCREEN_HALF_HEIGHT + 1.0),
                        });
                    }
                    ok
                }
                SpawnTarget::Powerup => {
                    let extend = self.extend_pending && self.player.shielded;
                    let settings = &self.catalog.powerup;
                    let ok = self
                        .powerups
                        .spawn(|p| p.spawn(event.lane, extend, settings));
                    if ok {
                        if extend {
                            self.extend_pending = false;
                        }
                        self.events.push(GameEvent::PowerupSpawned {
                            pos: Vec2::new(event.lane, crate::consts::SCREEN_HALF_HEIGHT + 1.0),
                            extend,
                        });
                    }
                    ok
                }
            };

            if spawned {
                log::debug!("Spawned event {} at beat {}", index, event.beat);
            } else {
                log::warn!("Pool full, dropping spawn {} at beat {}", index, event.beat);
                self.events.push(GameEvent::SpawnDropped { beat: event.beat });
            }
        }
    }

    /// Beat broadcast to every subscriber
    fn broadcast_beat(&mut self, now: f64) {
        let timing = self.leg_timing(now);
        self.enemies.tick(|enemy, _| {
            enemy.on_beat(timing);
            true
        });
        self.player.on_beat();
    }

    /// Apply a collected orb to the player
    pub(crate) fn grant_orb(player: &mut Player, orb: Orb, settings: &crate::settings::PlayerSettings) {
        match orb {
            Orb::Shield => player.grant_shield(),
            Orb::Extend => player.grant_extend(),
            Orb::Power => player.grant_power(settings),
            Orb::Bomb => player.grant_bomb(settings),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::HeadlessAudio;

    const CONFIG: &str = r#"{
        "settings": { "enemy_pool": 2, "extend_every": 100 },
        "shots": [{ "name": "pellet", "target": "player" }],
        "enemies": [{ "name": "drone", "score": 60, "emitters": [] }],
        "player": { "power_levels": [[]] },
        "stages": [{
            "name": "one",
            "track": "one",
            "bpm": 120,
            "spawns": [
                { "beat": 0, "lane": 0.0, "prefab": "drone", "condition": "no_enemies_present" },
                { "beat": 0, "lane": 1.0, "prefab": "drone", "condition": "carry_over" },
                { "beat": 1, "lane": 0.0, "prefab": "drone", "condition": "no_enemies_present" },
                { "beat": 1, "lane": 1.0, "prefab": "drone", "condition": "carry_over" },
                { "beat": 2, "lane": 2.0, "prefab": "drone" }
            ]
        }]
    }"#;

    fn world() -> (World, HeadlessAudio) {
        let catalog = Catalog::from_json(CONFIG).expect("config should load");
        (World::new(catalog), HeadlessAudio::new(60.0))
    }

    fn beat(world: &mut World, total: i64, spawns: Range<usize>) {
        world.dispatch_spawns(
            &BeatInfo {
                bar: 0,
                beat: total as i32,
                total,
                spawns,
            },
            0.0,
        );
    }

    #[test]
    fn test_full_effect_pool_drops_announcement() {
        let mut effects = Pool::new(1, |_| Effect::default());
        let mut events = Vec::new();
        spawn_effect(&mut effects, &mut events, 0.5, EffectKind::Pickup, Vec2::ZERO);
        spawn_effect(&mut effects, &mut events, 0.5, EffectKind::ShieldHit, Vec2::ONE);
        assert_eq!(effects.active_count(), 1);
        assert_eq!(
            events,
            vec![GameEvent::Effect {
                kind: EffectKind::Pickup,
                pos: Vec2::ZERO
            }]
        );
    }

    #[test]
    fn test_start_game_enters_playing() {
        let (mut world, mut audio) = world();
        assert_eq!(world.phase, GamePhase::Idle);
        world.start_game(0.0, &mut audio);
        assert_eq!(world.phase, GamePhase::Playing);
        assert!(matches!(
            world.events.first(),
            Some(GameEvent::StageStarted { stage: 0, .. })
        ));
    }

    #[test]
    fn test_spawn_conditions_and_carry_over() {
        let (mut world, mut audio) = world();
        world.start_game(0.0, &mut audio);

        // No enemies yet: both spawn
        beat(&mut world, 0, 0..2);
        assert_eq!(world.enemies.active_count(), 2);

        // Enemies present: held back, and the carry-over follows suit
        beat(&mut world, 1, 2..4);
        assert_eq!(world.enemies.active_count(), 2);
        assert!(!world.carry_over);

        // Unconditional spawn with a full pool is dropped
        world.drain_events().for_each(drop);
        beat(&mut world, 2, 4..5);
        assert!(world
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::SpawnDropped { beat: 2 })));
    }

    #[test]
    fn test_extends_are_earned_on_thresholds() {
        let (mut world, _) = world();
        world.award_score(60);
        assert!(!world.extend_pending);
        world.award_score(150);
        assert!(world.extend_pending);
        assert_eq!(world.next_extend, 300);
    }

    #[test]
    fn test_pause_and_resume() {
        let (mut world, mut audio) = world();
        assert!(!world.pause(0.0, &mut audio));
        world.start_game(0.0, &mut audio);
        assert!(world.pause(0.5, &mut audio));
        assert_eq!(world.phase, GamePhase::Paused);
        assert!(world.resume(2.5, &mut audio));
        assert_eq!(world.phase, GamePhase::Playing);
        assert!(world
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::Resumed { lost } if (*lost - 2.0).abs() < 1e-12)));
    }

    #[test]
    fn test_events_serialize_tagged() {
        let json = serde_json::to_string(&GameEvent::BombUsed { pos: Vec2::ZERO })
            .expect("event should serialize");
        assert!(json.contains(r#""event":"bomb_used""#));
    }
}
