//! Beatshot headless runner
//!
//! Loads a game config, drives the simulation against a simulated audio clock
//! and prints presentation events as JSON lines.
//!
//! Usage: `beatshot [config.json] [seconds]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::path::Path;

    use beatshot::consts::*;
    use beatshot::sim::{Catalog, GamePhase, TickInput, World, tick};
    use beatshot::{ClockSource, HeadlessAudio, ManualClock};

    const DEMO: &str = include_str!("../assets/demo.json");
    /// Render frames per second the runner pretends to draw at
    const FRAME_DT: f32 = 1.0 / 60.0;

    env_logger::init();
    log::info!("Beatshot (headless) starting...");

    let args: Vec<String> = std::env::args().collect();
    let catalog = match args.get(1) {
        Some(path) => Catalog::load(Path::new(path)),
        None => Catalog::from_json(DEMO),
    };
    let catalog = match catalog {
        Ok(catalog) => catalog,
        Err(e) => {
            log::error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    if !catalog.refused.is_empty() {
        log::warn!("Playing without refused stages: {}", catalog.refused.join(", "));
    }
    let seconds: f64 = args
        .get(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(60.0);

    let mut world = World::new(catalog);
    let clock = ManualClock::new(0.0);
    let mut audio = HeadlessAudio::new(30.0);
    let mut input = TickInput {
        restart: true,
        ..Default::default()
    };
    let mut accumulator = 0.0f32;

    while clock.now() < seconds {
        clock.advance(FRAME_DT as f64);
        accumulator += FRAME_DT;

        let mut substeps = 0;
        while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            tick(&mut world, &input, clock.now(), &mut audio, SIM_DT);
            accumulator -= SIM_DT;
            substeps += 1;

            // Clear one-shot inputs after processing
            input.restart = false;
            input.bomb = false;
            input.pause = false;

            for event in world.drain_events() {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => log::warn!("Unserializable event {:?}: {}", event, e),
                }
            }
        }

        if world.phase == GamePhase::GameOver {
            break;
        }

        // Autopilot: sway across the bottom, fire constantly, bomb when crowded
        let t = clock.now() as f32;
        input.movement = glam::Vec2::new(t.sin(), 0.0);
        input.fire = true;
        input.bomb = world.shots.enemy.active_count() > world.catalog.settings.enemy_shot_pool * 3 / 4;
    }

    log::info!(
        "Finished after {} ticks: score {}, lives {}, stage {:?} loop {}",
        world.tick_count,
        world.score,
        world.player.lives,
        world.timeline.stage_index(),
        world.timeline.loop_count()
    );
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Library-only on the web; the host page drives the simulation
}
