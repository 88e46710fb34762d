//! Emitter instruction interpreter
//!
//! An emitter runs a small attack-pattern program, one tick per fixed step.
//! Programs are immutable and shared between every entity of an archetype;
//! each live emitter owns its own program counter, angle state and repeat
//! stack.
//!
//! Execution model per tick:
//! - A pending wait (frames or beats) consumes the tick.
//! - Otherwise instructions run in order until one yields (`Fire`, waits).
//! - Reaching the end consults the repeat stack (implicit repeat end);
//!   an exhausted stack ends the program and `tick` returns false.

use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::archetype::ShotId;
use crate::error::ProgramError;
use crate::wrap_angle;

/// Instructions run per tick before an emitter is considered stalled
pub const MAX_STEPS_PER_TICK: usize = 1024;

/// How `Fire` picks its direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireMode {
    /// Fire at the current offset, ignoring the target
    #[default]
    Static,
    /// Fire at the target, rotated by the current offset
    Aimed,
    /// Fire at the target, rotated by a random amount within the offset
    Random,
}

/// Program instruction as written in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum InstructionDef {
    Fire,
    WaitFrames { frames: u32 },
    WaitBeats { beats: u32 },
    OffsetAngle { degrees: i32 },
    ResetAngle,
    SetMode { mode: FireMode },
    SetShot { shot: String },
    Mirror,
    Damage { amount: f32 },
    RepeatStart { times: u32 },
    RepeatEnd,
}

/// Resolved program instruction
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instruction {
    Fire,
    WaitFrames(u32),
    WaitBeats(u32),
    OffsetAngle(i32),
    ResetAngle,
    SetMode(FireMode),
    SetShot(ShotId),
    Mirror,
    Damage(f32),
    RepeatStart(u32),
    RepeatEnd,
}

/// A validated, shareable instruction sequence
#[derive(Debug, Clone)]
pub struct Program {
    ops: Arc<[Instruction]>,
}

impl Program {
    /// Build a program, validating repeat structure when `strict`
    pub fn new(
        ops: Vec<Instruction>,
        strict: bool,
        max_depth: usize,
    ) -> Result<Self, ProgramError> {
        if strict {
            validate(&ops, max_depth)?;
        }
        Ok(Self { ops: ops.into() })
    }

    /// Resolve shot names and build the program
    pub fn compile(
        defs: &[InstructionDef],
        resolve_shot: impl Fn(&str) -> Option<ShotId>,
        strict: bool,
        max_depth: usize,
    ) -> Result<Self, ProgramError> {
        let ops = defs
            .iter()
            .enumerate()
            .map(|(index, def)| {
                Ok(match def {
                    InstructionDef::Fire => Instruction::Fire,
                    InstructionDef::WaitFrames { frames } => Instruction::WaitFrames(*frames),
                    InstructionDef::WaitBeats { beats } => Instruction::WaitBeats(*beats),
                    InstructionDef::OffsetAngle { degrees } => Instruction::OffsetAngle(*degrees),
                    InstructionDef::ResetAngle => Instruction::ResetAngle,
                    InstructionDef::SetMode { mode } => Instruction::SetMode(*mode),
                    InstructionDef::SetShot { shot } => {
                        let id = resolve_shot(shot).ok_or_else(|| ProgramError::UnknownShot {
                            index,
                            name: shot.clone(),
                        })?;
                        Instruction::SetShot(id)
                    }
                    InstructionDef::Mirror => Instruction::Mirror,
                    InstructionDef::Damage { amount } => Instruction::Damage(*amount),
                    InstructionDef::RepeatStart { times } => Instruction::RepeatStart(*times),
                    InstructionDef::RepeatEnd => Instruction::RepeatEnd,
                })
            })
            .collect::<Result<Vec<_>, ProgramError>>()?;
        Self::new(ops, strict, max_depth)
    }

    /// A program that does nothing (ends on its first tick)
    pub fn empty() -> Self {
        Self {
            ops: Arc::from(Vec::new()),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.ops
    }
}

/// Reject repeat structures whose runtime behavior would be ambiguous
fn validate(ops: &[Instruction], max_depth: usize) -> Result<(), ProgramError> {
    let mut open: Vec<usize> = Vec::new();
    for (index, op) in ops.iter().enumerate() {
        match *op {
            Instruction::RepeatStart(times) => {
                if times == 0 {
                    return Err(ProgramError::ZeroRepeat { index });
                }
                if index > 0 && matches!(ops[index - 1], Instruction::RepeatStart(_)) {
                    return Err(ProgramError::AdjacentRepeatStart { index });
                }
                open.push(index);
                if open.len() > max_depth {
                    return Err(ProgramError::RepeatTooDeep {
                        index,
                        depth: open.len(),
                        limit: max_depth,
                    });
                }
            }
            Instruction::RepeatEnd => {
                if open.pop().is_none() {
                    return Err(ProgramError::UnmatchedRepeatEnd { index });
                }
            }
            _ => {}
        }
    }
    // The program end closes one loop implicitly; anything beyond that is lost
    if open.len() > 1 {
        return Err(ProgramError::UnclosedRepeat { index: open[0] });
    }
    Ok(())
}

/// Configured emitter attached to an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmitterDef {
    /// Position relative to the owner
    #[serde(default)]
    pub offset: (f32, f32),
    /// Shot archetype fired until the program changes it
    pub shot: String,
    #[serde(default = "default_damage")]
    pub damage: f32,
    pub program: Vec<InstructionDef>,
}

fn default_damage() -> f32 {
    1.0
}

/// Resolved emitter configuration
#[derive(Debug, Clone)]
pub struct EmitterSpec {
    pub offset: Vec2,
    pub shot: ShotId,
    pub damage: f32,
    pub program: Program,
}

/// A shot the interpreter wants spawned
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotRequest {
    pub origin: Vec2,
    pub angle: i32,
    pub shot: ShotId,
    pub damage: f32,
}

/// What an emitter needs from the world while it runs
pub trait FireContext {
    /// Signed angle from straight down toward this emitter's target
    fn angle_to_target(&self, origin: Vec2) -> i32;
    /// Uniform integer in [-|spread|, |spread|]
    fn random_spread(&mut self, spread: i32) -> i32;
    /// Ask the owning pool for a shot. False when the pool is exhausted.
    fn spawn_shot(&mut self, request: ShotRequest) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RepeatFrame {
    start: usize,
    /// Filled in by the first matching `RepeatEnd`
    end: Option<usize>,
    remaining: u32,
}

enum Flow {
    Continue,
    Yield,
}

/// Per-entity interpreter state
#[derive(Debug, Clone)]
pub struct Emitter {
    program: Program,
    offset: Vec2,
    pc: usize,
    angle_offset: i32,
    mode: FireMode,
    mirrored: bool,
    last_angle: i32,
    wait_frames: u32,
    wait_beats: u32,
    repeats: Vec<RepeatFrame>,
    max_depth: usize,
    shot: ShotId,
    damage: f32,
}

impl Emitter {
    /// An idle emitter slot; `max_depth` bounds the repeat stack
    pub fn new(max_depth: usize) -> Self {
        Self {
            program: Program::empty(),
            offset: Vec2::ZERO,
            pc: 0,
            angle_offset: 0,
            mode: FireMode::Static,
            mirrored: false,
            last_angle: 0,
            wait_frames: 0,
            wait_beats: 0,
            repeats: Vec::with_capacity(max_depth),
            max_depth,
            shot: ShotId::default(),
            damage: 1.0,
        }
    }

    /// Load a program into this slot and reset all interpreter state
    pub fn load(&mut self, spec: &EmitterSpec, mirrored: bool) {
        self.program = spec.program.clone();
        self.offset = spec.offset;
        self.shot = spec.shot;
        self.damage = spec.damage;
        self.mode = FireMode::Static;
        self.mirrored = mirrored;
        self.reset();
    }

    fn reset(&mut self) {
        self.pc = 0;
        self.angle_offset = 0;
        self.last_angle = 0;
        self.wait_frames = 0;
        self.wait_beats = 0;
        self.repeats.clear();
    }

    /// Rewind to the first instruction and run it in the same tick
    pub fn restart(&mut self, owner_pos: Vec2, ctx: &mut impl FireContext) -> bool {
        self.reset();
        self.tick(owner_pos, ctx)
    }

    /// Beat broadcast: counts down beat waits
    pub fn on_beat(&mut self) {
        self.wait_beats = self.wait_beats.saturating_sub(1);
    }

    /// World position shots leave from
    #[inline]
    pub fn origin(&self, owner_pos: Vec2) -> Vec2 {
        owner_pos + self.offset
    }

    pub fn angle_offset(&self) -> i32 {
        self.angle_offset
    }

    pub fn mode(&self) -> FireMode {
        self.mode
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirrored
    }

    pub fn last_angle(&self) -> i32 {
        self.last_angle
    }

    pub fn shot(&self) -> ShotId {
        self.shot
    }

    pub fn damage(&self) -> f32 {
        self.damage
    }

    pub fn program_counter(&self) -> usize {
        self.pc
    }

    /// Run one fixed step. Returns false once the program has ended.
    pub fn tick(&mut self, owner_pos: Vec2, ctx: &mut impl FireContext) -> bool {
        if self.wait_beats > 0 {
            return true;
        }
        self.wait_frames = self.wait_frames.saturating_sub(1);
        if self.wait_frames > 0 {
            return true;
        }

        let origin = self.origin(owner_pos);
        for _ in 0..MAX_STEPS_PER_TICK {
            if self.pc >= self.program.len() {
                if !self.end_of_program() {
                    return false;
                }
                continue;
            }
            if let Flow::Yield = self.step(origin, ctx) {
                return true;
            }
        }

        log::warn!(
            "Emitter stalled at instruction {} after {} steps without yielding",
            self.pc,
            MAX_STEPS_PER_TICK
        );
        true
    }

    fn step(&mut self, origin: Vec2, ctx: &mut impl FireContext) -> Flow {
        let op = self.program.ops[self.pc];
        match op {
            Instruction::Fire => {
                self.fire(origin, ctx);
                self.pc += 1;
                Flow::Yield
            }
            Instruction::WaitFrames(frames) => {
                self.wait_frames = frames;
                self.pc += 1;
                Flow::Yield
            }
            Instruction::WaitBeats(beats) => {
                self.wait_beats = beats;
                self.pc += 1;
                Flow::Yield
            }
            Instruction::OffsetAngle(degrees) => {
                let delta = if self.mirrored { degrees.saturating_neg() } else { degrees };
                self.angle_offset = wrap_angle(self.angle_offset.saturating_add(delta));
                self.pc += 1;
                Flow::Continue
            }
            Instruction::ResetAngle => {
                self.angle_offset = 0;
                self.pc += 1;
                Flow::Continue
            }
            Instruction::SetMode(mode) => {
                self.set_mode(mode);
                self.pc += 1;
                Flow::Continue
            }
            Instruction::SetShot(shot) => {
                self.shot = shot;
                self.pc += 1;
                Flow::Continue
            }
            Instruction::Mirror => {
                self.mirrored = !self.mirrored;
                self.pc += 1;
                Flow::Continue
            }
            Instruction::Damage(amount) => {
                self.damage = amount;
                self.pc += 1;
                Flow::Continue
            }
            Instruction::RepeatStart(times) => {
                self.repeat_start(times);
                Flow::Continue
            }
            Instruction::RepeatEnd => {
                self.repeat_end();
                Flow::Continue
            }
        }
    }

    fn fire(&mut self, origin: Vec2, ctx: &mut impl FireContext) {
        let angle = match self.mode {
            FireMode::Static => self.angle_offset,
            FireMode::Aimed => wrap_angle(self.angle_offset + ctx.angle_to_target(origin)),
            FireMode::Random => {
                let spread = ctx.random_spread(self.angle_offset);
                wrap_angle(spread + ctx.angle_to_target(origin))
            }
        };
        self.last_angle = angle;

        let request = ShotRequest {
            origin,
            angle,
            shot: self.shot,
            damage: self.damage,
        };
        if !ctx.spawn_shot(request) {
            log::debug!("Emitter stalled: no free shot for {:?}", self.shot);
        }
    }

    /// Leaving a moving mode for Static freezes the last fired direction
    fn set_mode(&mut self, mode: FireMode) {
        if mode == self.mode {
            return;
        }
        self.angle_offset = if self.mode != FireMode::Static && mode == FireMode::Static {
            self.last_angle
        } else {
            0
        };
        self.mode = mode;
    }

    fn repeat_start(&mut self, times: u32) {
        let ops = &self.program.ops;
        let mut start = self.pc + 1;
        while matches!(ops.get(start), Some(Instruction::RepeatStart(_))) {
            start += 1;
        }

        if self.repeats.len() < self.max_depth {
            self.repeats.push(RepeatFrame {
                start,
                end: None,
                remaining: times,
            });
        } else {
            log::warn!(
                "Repeat at {} exceeds nesting limit {}, running body once",
                self.pc,
                self.max_depth
            );
        }
        self.pc += 1;
    }

    fn repeat_end(&mut self) {
        let Some(frame) = self.repeats.pop() else {
            self.pc += 1;
            return;
        };

        let end = frame.end.unwrap_or(self.pc);
        if end != self.pc {
            log::warn!(
                "Repeat end at {} does not match loop ending at {}, skipping",
                self.pc,
                end
            );
            self.repeats.push(frame);
            self.pc += 1;
            return;
        }

        let remaining = frame.remaining.saturating_sub(1);
        if remaining > 0 {
            self.repeats.push(RepeatFrame {
                start: frame.start,
                end: Some(end),
                remaining,
            });
            self.pc = frame.start;
        } else {
            self.pc += 1;
        }
    }

    /// Implicit repeat end. Returns true if execution jumps back.
    fn end_of_program(&mut self) -> bool {
        match self.repeats.last_mut() {
            Some(frame) if frame.remaining > 1 => {
                frame.remaining -= 1;
                self.pc = frame.start;
                true
            }
            Some(_) => {
                self.repeats.pop();
                false
            }
            None => false,
        }
    }
}

/// Tick a group of emitters. True while any of them is still running.
pub fn tick_all(emitters: &mut [Emitter], owner_pos: Vec2, ctx: &mut impl FireContext) -> bool {
    let mut running = false;
    for emitter in emitters.iter_mut() {
        running |= emitter.tick(owner_pos, ctx);
    }
    running
}

/// Restart a group of emitters in the same tick
pub fn restart_all(emitters: &mut [Emitter], owner_pos: Vec2, ctx: &mut impl FireContext) -> bool {
    let mut running = false;
    for emitter in emitters.iter_mut() {
        running |= emitter.restart(owner_pos, ctx);
    }
    running
}

/// Burst gate for held-fire emitters.
///
/// While a burst is running it is ticked to completion. A new burst only
/// starts when `fire_frames` has not run out.
pub fn tick_burst(
    emitters: &mut [Emitter],
    owner_pos: Vec2,
    ctx: &mut impl FireContext,
    firing: &mut bool,
    fire_frames: &mut i32,
) {
    *fire_frames -= 1;
    if *firing {
        *firing = tick_all(emitters, owner_pos, ctx);
        if *firing {
            return;
        }
    }
    if *fire_frames < 0 {
        return;
    }
    *firing = true;
    restart_all(emitters, owner_pos, ctx);
}
