//! Archetypes and the validated game catalog
//!
//! Configuration is written with names; loading resolves every name to a
//! typed index so the simulation never does string lookups.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Circle;
use super::curve::Curve;
use super::emitter::{EmitterDef, EmitterSpec, Program};
use super::powerup::PowerupSettings;
use super::stage::{Stage, StageDef};
use crate::error::{ConfigError, Result};
use crate::settings::Settings;

/// Index into `Catalog::shots`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ShotId(pub usize);

/// Index into `Catalog::enemies`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EnemyId(pub usize);

/// Who a shot can hurt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Player,
    Enemy,
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotArchetype {
    pub name: String,
    pub target: TargetType,
    /// Units per second
    #[serde(default = "default_shot_speed")]
    pub speed: f32,
    #[serde(default = "default_shot_radius")]
    pub radius: f32,
}

fn default_shot_speed() -> f32 {
    5.0
}

fn default_shot_radius() -> f32 {
    0.08
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyArchetypeDef {
    pub name: String,
    #[serde(default = "default_health")]
    pub health: f32,
    #[serde(default)]
    pub score: u64,
    /// Take damage from player shots and melee
    #[serde(default)]
    pub hurt_boxes: Vec<Circle>,
    /// Absorb player shots without damage
    #[serde(default)]
    pub shield_boxes: Vec<Circle>,
    /// Hurt the player on contact
    #[serde(default)]
    pub hit_boxes: Vec<Circle>,
    #[serde(default = "default_x_curve")]
    pub x_curve: Curve,
    #[serde(default)]
    pub y_curve: Curve,
    #[serde(default)]
    pub emitters: Vec<EmitterDef>,
}

fn default_health() -> f32 {
    1.0
}

fn default_x_curve() -> Curve {
    Curve::EaseInOut
}

#[derive(Debug, Clone)]
pub struct EnemyArchetype {
    pub name: String,
    pub health: f32,
    pub score: u64,
    pub hurt_boxes: Vec<Circle>,
    pub shield_boxes: Vec<Circle>,
    pub hit_boxes: Vec<Circle>,
    pub x_curve: Curve,
    pub y_curve: Curve,
    pub emitters: Vec<EmitterSpec>,
}

/// Player emitters, one list per power level
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerDef {
    pub power_levels: Vec<Vec<EmitterDef>>,
}

/// Whole game configuration as written on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default)]
    pub settings: Settings,
    pub shots: Vec<ShotArchetype>,
    #[serde(default)]
    pub enemies: Vec<EnemyArchetypeDef>,
    #[serde(default)]
    pub powerup: PowerupSettings,
    pub player: PlayerDef,
    pub stages: Vec<StageDef>,
}

/// Validated, name-resolved configuration. Read-only during play.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub settings: Settings,
    pub shots: Vec<ShotArchetype>,
    pub enemies: Vec<EnemyArchetype>,
    pub powerup: PowerupSettings,
    pub power_levels: Vec<Vec<EmitterSpec>>,
    pub stages: Vec<Stage>,
    /// Stages that failed to compile and are never scheduled
    pub refused: Vec<String>,
    shot_ids: HashMap<String, ShotId>,
    enemy_ids: HashMap<String, EnemyId>,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: GameConfig = serde_json::from_str(json)?;
        Self::from_config(config)
    }

    pub fn load(path: &std::path::Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn from_config(config: GameConfig) -> Result<Self> {
        let GameConfig {
            settings,
            shots,
            enemies,
            powerup,
            player,
            stages,
        } = config;

        let mut shot_ids = HashMap::with_capacity(shots.len());
        for (i, shot) in shots.iter().enumerate() {
            if shot_ids.insert(shot.name.clone(), ShotId(i)).is_some() {
                return Err(ConfigError::DuplicateArchetype(shot.name.clone()));
            }
        }

        let mut enemy_ids = HashMap::with_capacity(enemies.len());
        let mut compiled = Vec::with_capacity(enemies.len());
        for (i, def) in enemies.into_iter().enumerate() {
            if def.name == powerup.name || enemy_ids.contains_key(&def.name) {
                return Err(ConfigError::DuplicateArchetype(def.name));
            }
            let emitters = compile_emitters(&def.name, &def.emitters, &shot_ids, &settings)?;
            enemy_ids.insert(def.name.clone(), EnemyId(i));
            compiled.push(EnemyArchetype {
                name: def.name,
                health: def.health,
                score: def.score,
                hurt_boxes: def.hurt_boxes,
                shield_boxes: def.shield_boxes,
                hit_boxes: def.hit_boxes,
                x_curve: def.x_curve,
                y_curve: def.y_curve,
                emitters,
            });
        }

        if player.power_levels.is_empty() {
            return Err(ConfigError::NoPowerLevels);
        }
        let power_levels = player
            .power_levels
            .iter()
            .map(|level| compile_emitters("player", level, &shot_ids, &settings))
            .collect::<Result<Vec<_>>>()?;

        if stages.is_empty() {
            return Err(ConfigError::NoStages);
        }
        let mut compiled_stages = Vec::with_capacity(stages.len());
        let mut refused = Vec::new();
        for def in &stages {
            match Stage::compile(def, &enemy_ids, &powerup.name) {
                Ok(stage) => compiled_stages.push(stage),
                Err(e) => {
                    log::error!("Refusing stage `{}`: {}", def.name, e);
                    refused.push(def.name.clone());
                }
            }
        }
        if compiled_stages.is_empty() {
            return Err(ConfigError::NoPlayableStages {
                refused: refused.len(),
            });
        }
        let stages = compiled_stages;

        log::info!(
            "Loaded {} stages, {} enemy and {} shot archetypes",
            stages.len(),
            compiled.len(),
            shots.len()
        );

        Ok(Self {
            settings,
            shots,
            enemies: compiled,
            powerup,
            power_levels,
            stages,
            refused,
            shot_ids,
            enemy_ids,
        })
    }

    pub fn shot_id(&self, name: &str) -> Option<ShotId> {
        self.shot_ids.get(name).copied()
    }

    pub fn enemy_id(&self, name: &str) -> Option<EnemyId> {
        self.enemy_ids.get(name).copied()
    }

    #[inline]
    pub fn shot(&self, id: ShotId) -> &ShotArchetype {
        &self.shots[id.0]
    }

    #[inline]
    pub fn enemy(&self, id: EnemyId) -> &EnemyArchetype {
        &self.enemies[id.0]
    }

    /// Emitters for a power level, clamped to the highest configured level
    pub fn power_level(&self, power: u32) -> &[EmitterSpec] {
        let idx = (power as usize).min(self.power_levels.len().saturating_sub(1));
        self.power_levels.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn compile_emitters(
    owner: &str,
    defs: &[EmitterDef],
    shot_ids: &HashMap<String, ShotId>,
    settings: &Settings,
) -> Result<Vec<EmitterSpec>> {
    if defs.len() > settings.max_emitters {
        return Err(ConfigError::TooManyEmitters {
            owner: owner.to_string(),
            count: defs.len(),
            limit: settings.max_emitters,
        });
    }

    defs.iter()
        .enumerate()
        .map(|(emitter, def)| {
            let shot = shot_ids
                .get(&def.shot)
                .copied()
                .ok_or_else(|| ConfigError::UnknownShot {
                    owner: owner.to_string(),
                    name: def.shot.clone(),
                })?;
            let program = Program::compile(
                &def.program,
                |name| shot_ids.get(name).copied(),
                settings.strict_programs,
                settings.max_repeat_depth,
            )
            .map_err(|source| ConfigError::Program {
                owner: owner.to_string(),
                emitter,
                source,
            })?;
            Ok(EmitterSpec {
                offset: Vec2::new(def.offset.0, def.offset.1),
                shot,
                damage: def.damage,
                program,
            })
        })
        .collect()
}
