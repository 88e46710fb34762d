//! Load-time configuration errors
//!
//! Runtime conditions (pool exhaustion, stalled emitters, timeline overrun)
//! are not errors and never show up here.

use thiserror::Error;

/// Structural problems in an emitter program
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    #[error("repeat end at {index} has no open repeat start")]
    UnmatchedRepeatEnd { index: usize },
    #[error("repeat start at {index} has a zero count")]
    ZeroRepeat { index: usize },
    #[error("repeat start at {index} directly follows another repeat start")]
    AdjacentRepeatStart { index: usize },
    #[error("repeat start at {index} is never closed (only one may run to the end of the program)")]
    UnclosedRepeat { index: usize },
    #[error("repeat start at {index} nests {depth} deep, limit is {limit}")]
    RepeatTooDeep { index: usize, depth: usize, limit: usize },
    #[error("unknown shot archetype `{name}` at {index}")]
    UnknownShot { index: usize, name: String },
}

/// Errors raised while loading and validating game configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("no stages configured")]
    NoStages,
    #[error("all {refused} configured stages were refused")]
    NoPlayableStages { refused: usize },
    #[error("stage `{stage}`: bpm must be positive, got {bpm}")]
    InvalidBpm { stage: String, bpm: f64 },
    #[error("stage `{stage}`: spawn {index} at beat {beat} comes before beat {previous}")]
    SpawnOrder {
        stage: String,
        index: usize,
        beat: i64,
        previous: i64,
    },
    #[error("stage `{stage}`: spawn {index} has negative beat {beat}")]
    NegativeBeat { stage: String, index: usize, beat: i64 },
    #[error("stage `{stage}`: unknown archetype `{name}`")]
    UnknownArchetype { stage: String, name: String },
    #[error("stage `{stage}`: unknown route `{name}`")]
    UnknownRoute { stage: String, name: String },
    #[error("stage `{stage}`: route `{route}` has no step {step}")]
    RouteStepOutOfRange {
        stage: String,
        route: String,
        step: usize,
    },
    #[error("duplicate archetype name `{0}`")]
    DuplicateArchetype(String),
    #[error("unknown shot archetype `{name}` referenced by `{owner}`")]
    UnknownShot { owner: String, name: String },
    #[error("`{owner}` has {count} emitters, limit is {limit}")]
    TooManyEmitters {
        owner: String,
        count: usize,
        limit: usize,
    },
    #[error("player needs at least one power level")]
    NoPowerLevels,
    #[error("emitter {emitter} of `{owner}`: {source}")]
    Program {
        owner: String,
        emitter: usize,
        #[source]
        source: ProgramError,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
