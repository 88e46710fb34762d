//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep for motion, audio clock for stage timing
//! - Seeded RNG only
//! - Stable iteration order (pool activation order)
//! - No rendering or platform dependencies

pub mod archetype;
pub mod collision;
pub mod curve;
pub mod effect;
pub mod emitter;
pub mod enemy;
pub mod player;
pub mod pool;
pub mod powerup;
pub mod shot;
pub mod stage;
pub mod state;
pub mod tick;
pub mod timeline;

pub use archetype::{Catalog, EnemyId, GameConfig, ShotId, TargetType};
pub use collision::Circle;
pub use curve::Curve;
pub use emitter::{FireContext, FireMode, Instruction, InstructionDef, Program, ShotRequest};
pub use pool::Pool;
pub use stage::{SpawnCondition, Stage};
pub use state::{GameEvent, GamePhase, World};
pub use tick::{TickInput, tick};
pub use timeline::{BeatInfo, Timeline, TimelineEvent, TimelineState};
