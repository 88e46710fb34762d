//! Enemies: route legs timed on the audio clock, emitter bursts, health

use std::sync::Arc;

use glam::Vec2;

use super::archetype::{EnemyArchetype, EnemyId};
use super::curve::Curve;
use super::emitter::{self, Emitter, FireContext, ShotRequest};
use super::stage::{RouteRef, RouteStep};
use crate::consts::{RETIRE_MARGIN, SCREEN_HALF_HEIGHT};
use crate::{out_of_bounds, wrap_angle};

/// Everything needed to bring an enemy on screen
#[derive(Debug, Clone, Copy)]
pub struct EnemySpawn<'a> {
    pub id: EnemyId,
    pub archetype: &'a EnemyArchetype,
    pub lane: f32,
    pub mirrored: bool,
    pub exempt: bool,
    pub route: Option<&'a RouteRef>,
}

/// Beat timing shared by every route leg
#[derive(Debug, Clone, Copy)]
pub struct LegTiming {
    pub now: f64,
    pub beat_len: f64,
    pub exit_beats: u32,
}

#[derive(Debug, Clone)]
pub struct Enemy {
    pub archetype: EnemyId,
    pub pos: Vec2,
    health: f32,
    mirrored: bool,
    exempt: bool,
    x_curve: Curve,
    y_curve: Curve,

    emitters: Vec<Emitter>,
    emitter_count: usize,
    firing: bool,
    /// Bursts left on this leg; None fires continuously
    bursts_left: Option<u32>,
    holding_fire: bool,
    rearm: bool,
    wait_to_fire: bool,

    route: Option<Arc<[RouteStep]>>,
    next_step: usize,
    beats_to_go: i32,
    start: Vec2,
    destination: Vec2,
    dest_time: f64,
    dest_duration: f64,
    exiting: bool,
}

impl Enemy {
    /// An idle slot with room for `max_emitters` emitters
    pub fn new(max_emitters: usize, max_repeat_depth: usize) -> Self {
        Self {
            archetype: EnemyId::default(),
            pos: Vec2::ZERO,
            health: 0.0,
            mirrored: false,
            exempt: false,
            x_curve: Curve::default(),
            y_curve: Curve::default(),
            emitters: (0..max_emitters)
                .map(|_| Emitter::new(max_repeat_depth))
                .collect(),
            emitter_count: 0,
            firing: false,
            bursts_left: None,
            holding_fire: false,
            rearm: false,
            wait_to_fire: false,
            route: None,
            next_step: 0,
            beats_to_go: 0,
            start: Vec2::ZERO,
            destination: Vec2::ZERO,
            dest_time: 0.0,
            dest_duration: 0.0,
            exiting: false,
        }
    }

    pub fn spawn(&mut self, spawn: &EnemySpawn<'_>, timing: LegTiming) {
        let archetype = spawn.archetype;
        self.archetype = spawn.id;
        self.health = archetype.health;
        self.mirrored = spawn.mirrored;
        self.exempt = spawn.exempt;
        self.x_curve = archetype.x_curve;
        self.y_curve = archetype.y_curve;

        self.emitter_count = archetype.emitters.len().min(self.emitters.len());
        for (slot, spec) in self.emitters.iter_mut().zip(&archetype.emitters) {
            slot.load(spec, spawn.mirrored);
        }
        self.firing = false;
        self.bursts_left = None;
        self.holding_fire = false;
        self.rearm = false;
        self.wait_to_fire = false;

        self.exiting = false;
        self.beats_to_go = 0;
        self.pos = Vec2::new(spawn.lane, SCREEN_HALF_HEIGHT + 1.0);
        self.destination = self.pos;
        self.dest_time = timing.now;
        self.dest_duration = 0.0;

        match spawn.route {
            Some(route) => {
                self.route = Some(route.steps.clone());
                self.next_step = route.start;
                self.take_step(timing);
            }
            None => {
                self.route = None;
                self.exit_stage(timing);
            }
        }
    }

    #[inline]
    pub fn health(&self) -> f32 {
        self.health
    }

    /// Counted by `NoEnemiesPresent` spawn conditions
    #[inline]
    pub fn is_counted(&self) -> bool {
        !self.exempt
    }

    #[inline]
    pub fn is_exiting(&self) -> bool {
        self.exiting
    }

    /// A burst is in progress
    #[inline]
    pub fn is_firing(&self) -> bool {
        self.firing
    }

    #[inline]
    pub fn is_holding_fire(&self) -> bool {
        self.holding_fire
    }

    pub fn emitters(&self) -> &[Emitter] {
        &self.emitters[..self.emitter_count]
    }

    /// Apply damage. True when it kills.
    pub fn try_die(&mut self, damage: f32) -> bool {
        self.health -= damage;
        self.health <= 0.0
    }

    /// Move along the current leg and run emitters. False once the exit leg
    /// has finished or the enemy has left the playfield margin, and the slot
    /// should be retired.
    pub fn tick(&mut self, now: f64, fire_cutoff: f32, ctx: &mut impl FireContext) -> bool {
        if now < self.dest_time {
            let t = ((self.dest_time - now) / self.dest_duration) as f32;
            let tx = self.x_curve.evaluate(1.0 - t);
            let ty = self.y_curve.evaluate(1.0 - t);
            self.pos = Vec2::new(
                self.start.x + (self.destination.x - self.start.x) * tx,
                self.start.y + (self.destination.y - self.start.y) * ty,
            );
        } else {
            self.pos = self.destination;
            if self.exiting {
                return false;
            }
        }
        if out_of_bounds(self.pos, RETIRE_MARGIN) {
            return false;
        }

        if self.pos.y < fire_cutoff || self.holding_fire {
            return true;
        }

        let pos = self.pos;
        let emitters = &mut self.emitters[..self.emitter_count];
        if self.rearm {
            self.rearm = false;
            self.firing = emitter::restart_all(emitters, pos, ctx);
            return true;
        }
        if emitter::tick_all(emitters, pos, ctx) {
            self.firing = true;
            return true;
        }

        self.firing = false;
        if let Some(left) = self.bursts_left.as_mut() {
            *left = left.saturating_sub(1);
            if *left == 0 {
                self.holding_fire = true;
                return true;
            }
        }
        self.firing = emitter::restart_all(emitters, pos, ctx);
        true
    }

    /// Beat broadcast: count down beat waits and the current leg
    pub fn on_beat(&mut self, timing: LegTiming) {
        for emitter in &mut self.emitters[..self.emitter_count] {
            emitter.on_beat();
        }
        if self.exiting || (self.wait_to_fire && self.firing) {
            return;
        }
        self.beats_to_go -= 1;
        if self.beats_to_go > 0 {
            return;
        }
        self.take_step(timing);
    }

    /// Shift the leg deadline by the time spent paused
    pub fn on_unpause(&mut self, lost: f64) {
        self.dest_time += lost;
    }

    /// One aimed shot from every emitter, used when killed in later loops
    pub fn fire_revenge(&self, ctx: &mut impl FireContext) {
        for emitter in self.emitters() {
            let origin = emitter.origin(self.pos);
            let angle = wrap_angle(ctx.angle_to_target(origin));
            ctx.spawn_shot(ShotRequest {
                origin,
                angle,
                shot: emitter.shot(),
                damage: emitter.damage(),
            });
        }
    }

    fn take_step(&mut self, timing: LegTiming) {
        let step = self
            .route
            .as_ref()
            .and_then(|steps| steps.get(self.next_step))
            .copied();
        let Some(step) = step else {
            self.exit_stage(timing);
            return;
        };
        self.next_step += 1;

        self.wait_to_fire = step.wait_to_fire;
        self.bursts_left = (step.fire_bursts > 0).then_some(step.fire_bursts);
        if self.holding_fire {
            self.holding_fire = false;
            self.rearm = true;
        }
        self.start_move(step.target, step.beats, self.mirrored, timing);
    }

    fn exit_stage(&mut self, timing: LegTiming) {
        self.exiting = true;
        let target = Vec2::new(self.pos.x, -SCREEN_HALF_HEIGHT - 1.0);
        self.start_move(target, timing.exit_beats, false, timing);
    }

    fn start_move(&mut self, mut target: Vec2, beats: u32, mirrored: bool, timing: LegTiming) {
        if mirrored {
            target.x = -target.x;
        }
        self.beats_to_go = beats as i32;
        if beats == 0 {
            self.pos = target;
            self.destination = target;
            self.dest_time = timing.now;
            return;
        }
        self.start = self.pos;
        self.destination = target;
        self.dest_duration = beats as f64 * timing.beat_len;
        self.dest_time = timing.now + self.dest_duration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::archetype::ShotId;
    use crate::sim::emitter::{EmitterSpec, Instruction, Program};

    #[derive(Default)]
    struct Counter {
        fired: Vec<ShotRequest>,
    }

    impl FireContext for Counter {
        fn angle_to_target(&self, _origin: Vec2) -> i32 {
            0
        }

        fn random_spread(&mut self, _spread: i32) -> i32 {
            0
        }

        fn spawn_shot(&mut self, request: ShotRequest) -> bool {
            self.fired.push(request);
            true
        }
    }

    fn archetype(program: Vec<Instruction>) -> EnemyArchetype {
        EnemyArchetype {
            name: "drone".into(),
            health: 3.0,
            score: 100,
            hurt_boxes: Vec::new(),
            shield_boxes: Vec::new(),
            hit_boxes: Vec::new(),
            x_curve: Curve::EaseInOut,
            y_curve: Curve::Linear,
            emitters: vec![EmitterSpec {
                offset: Vec2::new(0.0, -0.2),
                shot: ShotId(0),
                damage: 1.0,
                program: Program::new(program, true, 8).expect("valid program"),
            }],
        }
    }

    fn route(steps: Vec<RouteStep>) -> RouteRef {
        RouteRef {
            steps: steps.into(),
            start: 0,
        }
    }

    fn step(x: f32, y: f32, beats: u32) -> RouteStep {
        RouteStep {
            target: Vec2::new(x, y),
            beats,
            fire_bursts: 0,
            wait_to_fire: false,
        }
    }

    fn timing(now: f64) -> LegTiming {
        LegTiming {
            now,
            beat_len: 0.5,
            exit_beats: 4,
        }
    }

    fn spawned(arch: &EnemyArchetype, route: Option<&RouteRef>, mirrored: bool) -> Enemy {
        let mut enemy = Enemy::new(4, 8);
        enemy.spawn(
            &EnemySpawn {
                id: EnemyId(0),
                archetype: arch,
                lane: 1.0,
                mirrored,
                exempt: false,
                route,
            },
            timing(0.0),
        );
        enemy
    }

    #[test]
    fn test_leg_follows_curves() {
        let arch = archetype(vec![Instruction::WaitBeats(100)]);
        let route = route(vec![step(2.0, 1.0, 2)]);
        let mut enemy = spawned(&arch, Some(&route), false);
        assert_eq!(enemy.pos, Vec2::new(1.0, 4.5));

        let mut ctx = Counter::default();
        enemy.tick(0.5, -10.0, &mut ctx);
        assert!((enemy.pos.x - 1.5).abs() < 1e-5);
        assert!((enemy.pos.y - 2.75).abs() < 1e-5);

        enemy.tick(1.0, -10.0, &mut ctx);
        assert_eq!(enemy.pos, Vec2::new(2.0, 1.0));
    }

    #[test]
    fn test_mirrored_route_negates_x() {
        let arch = archetype(vec![Instruction::WaitBeats(100)]);
        let route = route(vec![step(2.0, 1.0, 0)]);
        let enemy = spawned(&arch, Some(&route), true);
        // Zero-beat legs teleport
        assert_eq!(enemy.pos, Vec2::new(-2.0, 1.0));
    }

    #[test]
    fn test_route_exhaustion_exits_and_retires() {
        let arch = archetype(vec![Instruction::WaitBeats(100)]);
        let route = route(vec![step(0.0, 1.0, 2)]);
        let mut enemy = spawned(&arch, Some(&route), false);
        let mut ctx = Counter::default();

        enemy.on_beat(timing(0.5));
        assert!(enemy.tick(1.0, -10.0, &mut ctx));
        assert!(!enemy.is_exiting());
        enemy.on_beat(timing(1.0));
        assert!(enemy.is_exiting());

        // Exit leg: 4 beats straight down
        assert!(enemy.tick(2.0, -10.0, &mut ctx));
        assert!(enemy.tick(2.99, -10.0, &mut ctx));
        assert!(!enemy.tick(3.0, -10.0, &mut ctx));
        assert_eq!(enemy.pos, Vec2::new(0.0, -4.5));
    }

    #[test]
    fn test_leaving_playfield_retires() {
        let arch = archetype(vec![Instruction::WaitBeats(100)]);
        // A leg aimed well past the bottom margin
        let route = route(vec![step(1.0, -12.0, 4)]);
        let mut enemy = spawned(&arch, Some(&route), false);
        let mut ctx = Counter::default();

        let mut now = 0.0;
        while enemy.tick(now, -10.0, &mut ctx) {
            assert!(enemy.pos.y >= -4.5, "alive at {:?}", enemy.pos);
            now += 0.02;
            assert!(now < 2.0, "never retired");
        }
        assert!(!enemy.is_exiting());
        assert!(enemy.pos.y < -4.5);
    }

    #[test]
    fn test_no_route_exits_immediately() {
        let arch = archetype(vec![Instruction::Fire]);
        let enemy = spawned(&arch, None, false);
        assert!(enemy.is_exiting());
    }

    #[test]
    fn test_unpause_shifts_leg() {
        let arch = archetype(vec![Instruction::WaitBeats(100)]);
        let route = route(vec![step(3.0, 4.5, 2)]);
        let mut enemy = spawned(&arch, Some(&route), false);
        let mut ctx = Counter::default();
        enemy.tick(0.5, -10.0, &mut ctx);
        let paused_at = enemy.pos;

        enemy.on_unpause(10.0);
        enemy.tick(10.5, -10.0, &mut ctx);
        assert!((enemy.pos - paused_at).length() < 1e-5);
    }

    #[test]
    fn test_fire_cutoff() {
        let arch = archetype(vec![Instruction::Fire]);
        let route = route(vec![step(0.0, -3.0, 0)]);
        let mut enemy = spawned(&arch, Some(&route), false);
        let mut ctx = Counter::default();
        for tick in 0..5 {
            enemy.tick(tick as f64 * 0.02, -1.5, &mut ctx);
        }
        assert!(ctx.fired.is_empty());
    }

    #[test]
    fn test_continuous_fire_restarts_bursts() {
        let arch = archetype(vec![Instruction::Fire, Instruction::WaitFrames(2)]);
        let route = route(vec![step(0.0, 2.0, 0)]);
        let mut enemy = spawned(&arch, Some(&route), false);
        let mut ctx = Counter::default();
        for tick in 0..9 {
            enemy.tick(tick as f64 * 0.02, -1.5, &mut ctx);
        }
        // Each burst: fire, wait two ticks, end; the restart fires again
        assert_eq!(ctx.fired.len(), 3);
        assert!((ctx.fired[0].origin - Vec2::new(0.0, 1.8)).length() < 1e-5);
    }

    #[test]
    fn test_burst_count_holds_fire_until_next_step() {
        let arch = archetype(vec![Instruction::Fire]);
        let mut first = step(0.0, 2.0, 0);
        first.fire_bursts = 2;
        let route = route(vec![first, step(1.0, 2.0, 0)]);
        let mut enemy = spawned(&arch, Some(&route), false);
        let mut ctx = Counter::default();
        for tick in 0..10 {
            enemy.tick(tick as f64 * 0.02, -1.5, &mut ctx);
        }
        assert_eq!(ctx.fired.len(), 2);
        assert!(enemy.is_holding_fire());

        enemy.on_beat(timing(0.5));
        assert!(!enemy.is_holding_fire());
        enemy.tick(0.52, -1.5, &mut ctx);
        assert_eq!(ctx.fired.len(), 3);
    }

    #[test]
    fn test_wait_to_fire_holds_route() {
        let arch = archetype(vec![Instruction::Fire, Instruction::WaitFrames(100)]);
        let mut first = step(0.0, 2.0, 1);
        first.wait_to_fire = true;
        let route = route(vec![first, step(1.0, 2.0, 1)]);
        let mut enemy = spawned(&arch, Some(&route), false);
        let mut ctx = Counter::default();
        enemy.tick(0.6, -1.5, &mut ctx);
        assert!(enemy.is_firing());

        enemy.on_beat(timing(0.6));
        assert_eq!(enemy.destination, Vec2::new(0.0, 2.0));
    }

    #[test]
    fn test_damage_and_revenge() {
        let arch = archetype(vec![Instruction::Fire]);
        let mut enemy = spawned(&arch, None, false);
        assert!(!enemy.try_die(2.0));
        assert!(enemy.try_die(1.0));

        let mut ctx = Counter::default();
        enemy.fire_revenge(&mut ctx);
        assert_eq!(ctx.fired.len(), 1);
        assert!((ctx.fired[0].origin - Vec2::new(1.0, 4.3)).length() < 1e-5);
    }
}
