//! The player ship: movement, held-fire bursts, lives, bombs and shield

use glam::Vec2;

use super::emitter::{self, Emitter, EmitterSpec, FireContext};
use crate::consts::{SCREEN_HALF_HEIGHT, SCREEN_HALF_WIDTH};
use crate::settings::PlayerSettings;

/// Result of taking a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// Ignored during invulnerability
    Ignored,
    ShieldLost,
    LifeLost,
    Dead,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub pos: Vec2,
    pub lives: u32,
    pub bombs: u32,
    pub power: u32,
    pub shielded: bool,
    invulnerable: u32,
    firing: bool,
    fire_frames: i32,
    emitters: Vec<Emitter>,
    emitter_count: usize,
    loaded_power: Option<u32>,
}

impl Player {
    pub fn new(settings: &PlayerSettings, max_emitters: usize, max_repeat_depth: usize) -> Self {
        let mut player = Self {
            pos: Vec2::ZERO,
            lives: 0,
            bombs: 0,
            power: 0,
            shielded: false,
            invulnerable: 0,
            firing: false,
            fire_frames: -1,
            emitters: (0..max_emitters)
                .map(|_| Emitter::new(max_repeat_depth))
                .collect(),
            emitter_count: 0,
            loaded_power: None,
        };
        player.reset(settings);
        player
    }

    /// Back to the start-of-run loadout
    pub fn reset(&mut self, settings: &PlayerSettings) {
        self.pos = Vec2::new(settings.start_position.0, settings.start_position.1);
        self.lives = settings.lives;
        self.bombs = settings.bombs;
        self.power = 0;
        self.shielded = false;
        self.invulnerable = 0;
        self.firing = false;
        self.fire_frames = -1;
        self.emitter_count = 0;
        self.loaded_power = None;
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.lives > 0
    }

    #[inline]
    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable > 0
    }

    /// A burst is in progress (moves at the slow speed)
    #[inline]
    pub fn is_firing(&self) -> bool {
        self.firing
    }

    pub fn emitters(&self) -> &[Emitter] {
        &self.emitters[..self.emitter_count]
    }

    /// Swap in the emitters for the current power level when it changed
    pub fn load_power_level(&mut self, specs: &[EmitterSpec]) {
        if self.loaded_power == Some(self.power) {
            return;
        }
        self.emitter_count = specs.len().min(self.emitters.len());
        for (slot, spec) in self.emitters.iter_mut().zip(specs) {
            slot.load(spec, false);
        }
        self.firing = false;
        self.loaded_power = Some(self.power);
    }

    /// Move, clamped to the playfield
    pub fn apply_movement(&mut self, movement: Vec2, settings: &PlayerSettings, dt: f32) {
        let dir = movement.normalize_or_zero();
        let speed = if self.firing {
            settings.slow_speed
        } else {
            settings.fast_speed
        };
        let pos = self.pos + dir * speed * dt;
        self.pos = Vec2::new(
            pos.x.clamp(-SCREEN_HALF_WIDTH, SCREEN_HALF_WIDTH),
            pos.y.clamp(-SCREEN_HALF_HEIGHT, SCREEN_HALF_HEIGHT),
        );
    }

    /// Held fire latches for a few frames; bursts restart while latched
    pub fn handle_fire(&mut self, fire: bool, settings: &PlayerSettings, ctx: &mut impl FireContext) {
        if fire {
            self.fire_frames = settings.fire_buffer_frames;
        }
        let pos = self.pos;
        emitter::tick_burst(
            &mut self.emitters[..self.emitter_count],
            pos,
            ctx,
            &mut self.firing,
            &mut self.fire_frames,
        );
    }

    /// Release beat waits in the loaded emitters
    pub fn on_beat(&mut self) {
        for emitter in &mut self.emitters[..self.emitter_count] {
            emitter.on_beat();
        }
    }

    /// Count down invulnerability
    pub fn tick_timers(&mut self) {
        self.invulnerable = self.invulnerable.saturating_sub(1);
    }

    /// Spend a bomb. False if none are left.
    pub fn use_bomb(&mut self) -> bool {
        if self.bombs == 0 {
            return false;
        }
        self.bombs -= 1;
        true
    }

    pub fn hit(&mut self, settings: &PlayerSettings) -> HitOutcome {
        if !self.is_alive() || self.is_invulnerable() {
            return HitOutcome::Ignored;
        }
        self.invulnerable = settings.invulnerable_frames;
        if self.shielded {
            self.shielded = false;
            return HitOutcome::ShieldLost;
        }
        self.lives -= 1;
        self.power = self.power.saturating_sub(1);
        if self.lives == 0 {
            self.firing = false;
            HitOutcome::Dead
        } else {
            HitOutcome::LifeLost
        }
    }

    pub fn grant_shield(&mut self) {
        self.shielded = true;
    }

    pub fn grant_extend(&mut self) {
        self.lives += 1;
    }

    pub fn grant_power(&mut self, settings: &PlayerSettings) {
        self.power = (self.power + 1).min(settings.power_limit);
    }

    pub fn grant_bomb(&mut self, settings: &PlayerSettings) {
        self.bombs = (self.bombs + 1).min(settings.bomb_limit);
    }
}
