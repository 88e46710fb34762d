//! Stage data: spawn tables and routes

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::archetype::EnemyId;
use crate::error::{ConfigError, Result};

/// One waypoint of an enemy route
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    /// Destination in playfield units (x is negated for mirrored spawns)
    pub target: Vec2,
    /// Beats the leg takes; 0 teleports
    pub beats: u32,
    /// Bursts fired during this leg before holding fire (0 = keep firing)
    #[serde(default)]
    pub fire_bursts: u32,
    /// Hold the route on beats while a burst is still running
    #[serde(default)]
    pub wait_to_fire: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDef {
    pub name: String,
    pub steps: Vec<RouteStep>,
}

/// Gate evaluated when a spawn event comes due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnCondition {
    #[default]
    None,
    /// Only when no counted enemy is alive
    NoEnemiesPresent,
    /// Same decision as the previous event in the table
    CarryOver,
}

impl SpawnCondition {
    pub fn permits(self, counted_enemies: usize, previous: bool) -> bool {
        match self {
            SpawnCondition::None => true,
            SpawnCondition::NoEnemiesPresent => counted_enemies == 0,
            SpawnCondition::CarryOver => previous,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnEventDef {
    /// Absolute beat since stage start
    pub beat: i64,
    /// Spawn x position
    pub lane: f32,
    /// Enemy archetype name, or the powerup name
    pub prefab: String,
    #[serde(default)]
    pub condition: SpawnCondition,
    /// Not counted by `NoEnemiesPresent`
    #[serde(default)]
    pub exempt: bool,
    #[serde(default)]
    pub route: Option<String>,
    /// First route step to take
    #[serde(default)]
    pub step: usize,
    #[serde(default)]
    pub mirrored: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDef {
    pub name: String,
    pub track: String,
    pub bpm: f64,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub scroll_speed: f32,
    #[serde(default)]
    pub routes: Vec<RouteDef>,
    pub spawns: Vec<SpawnEventDef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnTarget {
    Enemy(EnemyId),
    Powerup,
}

/// A route shared by every spawn that uses it, plus where to join it
#[derive(Debug, Clone)]
pub struct RouteRef {
    pub steps: Arc<[RouteStep]>,
    pub start: usize,
}

#[derive(Debug, Clone)]
pub struct SpawnEvent {
    pub beat: i64,
    pub lane: f32,
    pub target: SpawnTarget,
    pub condition: SpawnCondition,
    pub exempt: bool,
    pub route: Option<RouteRef>,
    pub mirrored: bool,
}

/// A validated stage. The spawn table is sorted by beat.
#[derive(Debug, Clone)]
pub struct Stage {
    pub name: String,
    pub track: String,
    pub bpm: f64,
    pub background: String,
    pub scroll_speed: f32,
    pub spawns: Vec<SpawnEvent>,
}

impl Stage {
    pub fn compile(
        def: &StageDef,
        enemies: &HashMap<String, EnemyId>,
        powerup_name: &str,
    ) -> Result<Self> {
        if !(def.bpm.is_finite() && def.bpm > 0.0) {
            return Err(ConfigError::InvalidBpm {
                stage: def.name.clone(),
                bpm: def.bpm,
            });
        }

        let routes: HashMap<&str, Arc<[RouteStep]>> = def
            .routes
            .iter()
            .map(|r| (r.name.as_str(), Arc::from(r.steps.as_slice())))
            .collect();

        let mut spawns = Vec::with_capacity(def.spawns.len());
        let mut previous = 0;
        for (index, spawn) in def.spawns.iter().enumerate() {
            if spawn.beat < 0 {
                return Err(ConfigError::NegativeBeat {
                    stage: def.name.clone(),
                    index,
                    beat: spawn.beat,
                });
            }
            if spawn.beat < previous {
                return Err(ConfigError::SpawnOrder {
                    stage: def.name.clone(),
                    index,
                    beat: spawn.beat,
                    previous,
                });
            }
            previous = spawn.beat;

            let target = if spawn.prefab == powerup_name {
                SpawnTarget::Powerup
            } else {
                let id = enemies.get(&spawn.prefab).copied().ok_or_else(|| {
                    ConfigError::UnknownArchetype {
                        stage: def.name.clone(),
                        name: spawn.prefab.clone(),
                    }
                })?;
                SpawnTarget::Enemy(id)
            };

            let route = match &spawn.route {
                None => None,
                Some(name) => {
                    let steps = routes.get(name.as_str()).cloned().ok_or_else(|| {
                        ConfigError::UnknownRoute {
                            stage: def.name.clone(),
                            name: name.clone(),
                        }
                    })?;
                    if spawn.step >= steps.len() {
                        return Err(ConfigError::RouteStepOutOfRange {
                            stage: def.name.clone(),
                            route: name.clone(),
                            step: spawn.step,
                        });
                    }
                    Some(RouteRef {
                        steps,
                        start: spawn.step,
                    })
                }
            };

            spawns.push(SpawnEvent {
                beat: spawn.beat,
                lane: spawn.lane,
                target,
                condition: spawn.condition,
                exempt: spawn.exempt,
                route,
                mirrored: spawn.mirrored,
            });
        }

        Ok(Self {
            name: def.name.clone(),
            track: def.track.clone(),
            bpm: def.bpm,
            background: def.background.clone(),
            scroll_speed: def.scroll_speed,
            spawns,
        })
    }

    /// Seconds per beat
    #[inline]
    pub fn beat_length(&self) -> f64 {
        60.0 / self.bpm
    }
}
