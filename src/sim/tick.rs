//! Fixed timestep simulation tick
//!
//! Advances the world by one step. Stage timing comes from the audio clock
//! reading passed in as `now`; motion that is not beat-driven uses `dt`.

use glam::Vec2;

use super::collision;
use super::state::{GameEvent, GamePhase, ShotFire, World, spawn_effect};
use super::effect::EffectKind;
use super::powerup::PowerupOutcome;
use crate::audio::AudioPlayer;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Stick direction, normalized by the player
    pub movement: Vec2,
    /// Fire held
    pub fire: bool,
    /// Bomb pressed
    pub bomb: bool,
    /// Pause toggle
    pub pause: bool,
    /// Start a new run from stage 0
    pub restart: bool,
}

/// Advance the world by one fixed timestep at audio time `now`
pub fn tick(world: &mut World, input: &TickInput, now: f64, audio: &mut impl AudioPlayer, dt: f32) {
    if world.phase == GamePhase::Playing {
        world.effects.tick(|effect, _| effect.tick(dt));
    }

    if input.restart {
        world.start_game(now, audio);
        return;
    }

    if input.pause {
        match world.phase {
            GamePhase::Playing => {
                world.pause(now, audio);
            }
            GamePhase::Paused => {
                world.resume(now, audio);
            }
            _ => {}
        }
    }

    if world.phase != GamePhase::Playing {
        return;
    }

    if !world.player.is_alive() {
        world.phase = GamePhase::GameOver;
        world.timeline.stop(audio);
        world.events.push(GameEvent::GameOver { score: world.score });
        log::info!("Game over with {} points", world.score);
        return;
    }

    world.tick_count += 1;

    if let Some(event) = world.timeline.advance(now, &world.catalog.stages, audio) {
        world.on_timeline_event(event, now);
    }

    tick_enemies(world, now);
    tick_player(world, input, dt);
    tick_powerups(world, dt);
    world.shots.tick(dt, world.tick_count);
    collision::resolve(world);
}

fn tick_enemies(world: &mut World, now: f64) {
    let World {
        catalog,
        enemies,
        shots,
        player,
        rng,
        events,
        tick_count,
        ..
    } = world;
    let cutoff = catalog.settings.fire_cutoff_height;
    let mut fire = ShotFire {
        target: player.is_alive().then_some(player.pos),
        fallback_angle: 0,
        catalog: &*catalog,
        shots,
        rng,
        events,
        tick: *tick_count,
    };
    enemies.tick(|enemy, _| enemy.tick(now, cutoff, &mut fire));
}

fn tick_player(world: &mut World, input: &TickInput, dt: f32) {
    {
        let World {
            catalog,
            enemies,
            shots,
            player,
            rng,
            events,
            tick_count,
            ..
        } = world;
        let settings = &catalog.settings.player;

        player.load_power_level(catalog.power_level(player.power));
        player.apply_movement(input.movement, settings, dt);

        let origin = player.pos;
        let nearest = enemies
            .iter_active()
            .map(|e| e.pos)
            .min_by(|a, b| {
                a.distance_squared(origin)
                    .partial_cmp(&b.distance_squared(origin))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        let mut fire = ShotFire {
            target: nearest,
            fallback_angle: 180,
            catalog: &*catalog,
            shots,
            rng,
            events,
            tick: *tick_count,
        };
        player.handle_fire(input.fire, settings, &mut fire);
        player.tick_timers();
    }

    if input.bomb {
        world.use_bomb();
    }
}

fn tick_powerups(world: &mut World, dt: f32) {
    let World {
        catalog,
        powerups,
        effects,
        player,
        events,
        ..
    } = world;
    let settings = &catalog.powerup;
    let player_settings = &catalog.settings.player;
    let ttl = catalog.settings.effect_ttl;
    let target = player.is_alive().then_some(player.pos);

    powerups.tick(|powerup, _| {
        let pos = powerup.pos;
        match powerup.tick(target, settings, dt) {
            PowerupOutcome::Falling => true,
            PowerupOutcome::Expired => false,
            PowerupOutcome::Collected(orb) => {
                World::grant_orb(player, orb, player_settings);
                events.push(GameEvent::PowerupCollected { orb, pos });
                spawn_effect(effects, events, ttl, EffectKind::Pickup, pos);
                false
            }
            PowerupOutcome::CollectedAll { .. } => {
                for (orb, orb_pos) in powerup.orbs(settings) {
                    World::grant_orb(player, orb, player_settings);
                    events.push(GameEvent::PowerupCollected { orb, pos: orb_pos });
                }
                spawn_effect(effects, events, ttl, EffectKind::Pickup, pos);
                false
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::HeadlessAudio;
    use crate::consts::SIM_DT;
    use crate::sim::archetype::Catalog;

    const CONFIG: &str = r#"{
        "settings": { "stage_lead_in": 0.0 },
        "shots": [
            { "name": "bolt", "target": "enemy", "speed": 10.0 },
            { "name": "pellet", "target": "player", "speed": 2.0 }
        ],
        "enemies": [{
            "name": "turret",
            "health": 3.0,
            "score": 100,
            "hurt_boxes": [{ "radius": 0.4 }],
            "emitters": [{
                "shot": "pellet",
                "program": [{ "op": "set_mode", "mode": "random" }, { "op": "reset_angle" }, { "op": "offset_angle", "degrees": 30 }, { "op": "fire" }, { "op": "wait_frames", "frames": 10 }]
            }]
        }],
        "player": {
            "power_levels": [[{
                "shot": "bolt",
                "program": [{ "op": "set_mode", "mode": "aimed" }, { "op": "fire" }, { "op": "wait_frames", "frames": 4 }]
            }]]
        },
        "stages": [{
            "name": "one",
            "track": "one",
            "bpm": 120,
            "routes": [{ "name": "hover", "steps": [{ "target": [0.0, 2.0], "beats": 1 }, { "target": [0.0, 2.0], "beats": 32 }] }],
            "spawns": [
                { "beat": 0, "lane": 0.0, "prefab": "turret", "route": "hover" },
                { "beat": 1, "lane": 1.0, "prefab": "powerup" }
            ]
        }]
    }"#;

    fn world() -> (World, HeadlessAudio) {
        let catalog = Catalog::from_json(CONFIG).expect("config should load");
        (World::new(catalog), HeadlessAudio::new(120.0))
    }

    fn run(world: &mut World, audio: &mut HeadlessAudio, input: &TickInput, from: u64, ticks: u64) {
        for i in from..from + ticks {
            tick(world, input, i as f64 * SIM_DT as f64, audio, SIM_DT);
        }
    }

    #[test]
    fn test_idle_until_started() {
        let (mut world, mut audio) = world();
        run(&mut world, &mut audio, &TickInput::default(), 0, 10);
        assert_eq!(world.phase, GamePhase::Idle);
        assert_eq!(world.tick_count, 0);

        let start = TickInput {
            restart: true,
            ..Default::default()
        };
        tick(&mut world, &start, 0.0, &mut audio, SIM_DT);
        assert_eq!(world.phase, GamePhase::Playing);
    }

    #[test]
    fn test_tick_pause() {
        let (mut world, mut audio) = world();
        world.start_game(0.0, &mut audio);
        run(&mut world, &mut audio, &TickInput::default(), 1, 10);
        let ticks = world.tick_count;

        let input = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut world, &input, 0.3, &mut audio, SIM_DT);
        assert_eq!(world.phase, GamePhase::Paused);
        assert!(audio.is_paused());

        // Nothing moves while paused
        run(&mut world, &mut audio, &TickInput::default(), 20, 10);
        assert_eq!(world.tick_count, ticks);

        tick(&mut world, &input, 1.0, &mut audio, SIM_DT);
        assert_eq!(world.phase, GamePhase::Playing);
        assert!(!audio.is_paused());
    }

    #[test]
    fn test_enemy_spawns_on_first_beat_and_fires() {
        let (mut world, mut audio) = world();
        world.start_game(0.0, &mut audio);
        run(&mut world, &mut audio, &TickInput::default(), 1, 2);
        assert_eq!(world.enemies.active_count(), 1);

        run(&mut world, &mut audio, &TickInput::default(), 3, 60);
        assert!(world.shots.enemy.active_count() > 0);
        assert!(world
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::PowerupSpawned { extend: false, .. })));
    }

    #[test]
    fn test_player_fire_kills_enemy() {
        let (mut world, mut audio) = world();
        world.start_game(0.0, &mut audio);
        world.player.pos = Vec2::new(0.0, -2.0);
        let fire = TickInput {
            fire: true,
            ..Default::default()
        };
        run(&mut world, &mut audio, &fire, 1, 150);
        assert_eq!(world.score, 100);
        assert!(world
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::EnemyKilled { score: 100, .. })));
    }

    #[test]
    fn test_bomb_clears_enemy_shots() {
        let (mut world, mut audio) = world();
        world.start_game(0.0, &mut audio);
        // Off to the side so the player is not hit before bombing
        world.player.pos = Vec2::new(3.0, -3.0);
        run(&mut world, &mut audio, &TickInput::default(), 1, 60);
        assert!(world.shots.enemy.active_count() > 0);
        let bombs = world.player.bombs;

        let bomb = TickInput {
            bomb: true,
            ..Default::default()
        };
        tick(&mut world, &bomb, 61.0 * SIM_DT as f64, &mut audio, SIM_DT);
        assert_eq!(world.shots.enemy.active_count(), 0);
        assert_eq!(world.player.bombs, bombs - 1);
    }

    #[test]
    fn test_game_over_after_last_life() {
        let (mut world, mut audio) = world();
        world.start_game(0.0, &mut audio);
        world.player.lives = 0;
        tick(&mut world, &TickInput::default(), 0.02, &mut audio, SIM_DT);
        assert_eq!(world.phase, GamePhase::GameOver);
        assert!(audio.current().is_none());
    }

    #[test]
    fn test_determinism() {
        let (mut world1, mut audio1) = world();
        let (mut world2, mut audio2) = world();
        world1.start_game(0.0, &mut audio1);
        world2.start_game(0.0, &mut audio2);

        let inputs = [
            TickInput {
                movement: Vec2::new(1.0, 0.0),
                fire: true,
                ..Default::default()
            },
            TickInput::default(),
            TickInput {
                movement: Vec2::new(-1.0, 1.0),
                ..Default::default()
            },
        ];

        for i in 0..300u64 {
            let input = &inputs[(i % 3) as usize];
            let now = i as f64 * SIM_DT as f64;
            tick(&mut world1, input, now, &mut audio1, SIM_DT);
            tick(&mut world2, input, now, &mut audio2, SIM_DT);
        }

        assert_eq!(world1.tick_count, world2.tick_count);
        assert_eq!(world1.score, world2.score);
        assert_eq!(world1.events, world2.events);
        assert_eq!(world1.player.pos, world2.player.pos);
    }
}
