//! Game settings and tunables
//!
//! Loaded alongside the stage data; every field has a default so partial
//! documents are valid.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Player tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Movement speed while firing (units/s)
    pub slow_speed: f32,
    /// Movement speed while not firing (units/s)
    pub fast_speed: f32,
    /// Frames the fire input stays latched after release
    pub fire_buffer_frames: i32,
    /// Lives at the start of a run
    pub lives: u32,
    pub bombs: u32,
    pub bomb_limit: u32,
    pub power_limit: u32,
    /// Frames of invulnerability after being hit
    pub invulnerable_frames: u32,
    /// Radius used by contact checks against enemy boxes
    pub hit_radius: f32,
    /// Where the player appears on (re)start
    pub start_position: (f32, f32),
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            slow_speed: 4.0,
            fast_speed: 8.0,
            fire_buffer_frames: 20,
            lives: 3,
            bombs: 2,
            bomb_limit: 5,
            power_limit: 4,
            invulnerable_frames: 100,
            hit_radius: 0.05,
            start_position: (0.0, -SCREEN_HALF_HEIGHT + 1.0),
        }
    }
}

/// Simulation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Pools ===
    pub enemy_pool: usize,
    pub enemy_shot_pool: usize,
    pub player_shot_pool: usize,
    pub neutral_shot_pool: usize,
    pub effect_pool: usize,
    pub powerup_pool: usize,

    // === Timeline ===
    /// Seconds between rolling a stage and its music starting
    pub stage_lead_in: f64,
    /// Beats taken by the exit leg once a route runs out
    pub exit_beats: u32,

    // === Emitters ===
    /// Enemies below this height stop firing
    pub fire_cutoff_height: f32,
    /// Reject ambiguous repeat structure when loading programs
    pub strict_programs: bool,
    pub max_emitters: usize,
    pub max_repeat_depth: usize,
    /// First loop (1-based) in which killed enemies fire revenge shots
    pub revenge_from_loop: u32,

    // === Collision ===
    /// Damage dealt per tick by the player body to enemy hurt boxes
    pub melee_damage: f32,
    /// Seconds cosmetic effects stay alive
    pub effect_ttl: f32,

    // === Scoring ===
    /// Points between extends (0 disables)
    pub extend_every: u64,

    /// RNG seed for random fire spread
    pub seed: u64,

    pub player: PlayerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enemy_pool: 32,
            enemy_shot_pool: 100,
            player_shot_pool: 64,
            neutral_shot_pool: 32,
            effect_pool: 64,
            powerup_pool: 4,

            stage_lead_in: STAGE_LEAD_IN,
            exit_beats: EXIT_BEATS,

            fire_cutoff_height: -1.5,
            strict_programs: true,
            max_emitters: 8,
            max_repeat_depth: 8,
            revenge_from_loop: 2,

            melee_damage: 0.25,
            effect_ttl: 0.5,

            extend_every: 50_000,

            seed: 0x5eed,

            player: PlayerSettings::default(),
        }
    }
}

impl Settings {
    /// Parse settings from JSON, filling gaps with defaults
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Total slots across every pool
    pub fn total_pool_slots(&self) -> usize {
        self.enemy_pool
            + self.enemy_shot_pool
            + self.player_shot_pool
            + self.neutral_shot_pool
            + self.effect_pool
            + self.powerup_pool
    }
}
