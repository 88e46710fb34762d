//! Beat timeline scheduler
//!
//! Owns "what beat is it". Deadlines are absolute audio-clock times; each call
//! to `advance` crosses at most one boundary, checked in stage, bar, beat
//! order. A late tick catches up on the following ticks.

use std::ops::Range;

use super::stage::Stage;
use crate::audio::AudioPlayer;
use crate::consts::BEATS_PER_BAR;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimelineState {
    Idle,
    Active,
    Paused { since: f64 },
}

/// A beat boundary that was crossed
#[derive(Debug, Clone, PartialEq)]
pub struct BeatInfo {
    pub bar: i32,
    /// Beat within the bar, 0 on the downbeat
    pub beat: i32,
    /// Beats since stage start
    pub total: i64,
    /// Indices into the stage's spawn table that came due
    pub spawns: Range<usize>,
}

impl BeatInfo {
    #[inline]
    pub fn is_downbeat(&self) -> bool {
        self.beat == 0
    }
}

/// What a call to `advance` produced
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEvent {
    StageStarted {
        stage: usize,
        loop_count: u32,
        /// Clock time the music (and first beat) starts
        start: f64,
    },
    Beat(BeatInfo),
}

#[derive(Debug, Clone)]
pub struct Timeline {
    state: TimelineState,
    stage: Option<usize>,
    loop_count: u32,
    bar: i32,
    beat: i32,
    total_beats: i64,
    beat_len: f64,
    bar_len: f64,
    stage_start: f64,
    next_stage: f64,
    next_bar: f64,
    next_beat: f64,
    cursor: usize,
    lead_in: f64,
}

impl Timeline {
    /// `lead_in` is the gap between rolling a stage and its music starting
    pub fn new(lead_in: f64) -> Self {
        Self {
            state: TimelineState::Idle,
            stage: None,
            loop_count: 1,
            bar: -1,
            beat: -1,
            total_beats: -1,
            beat_len: 0.0,
            bar_len: 0.0,
            stage_start: 0.0,
            next_stage: 0.0,
            next_bar: 0.0,
            next_beat: 0.0,
            cursor: 0,
            lead_in,
        }
    }

    pub fn state(&self) -> TimelineState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state, TimelineState::Paused { .. })
    }

    pub fn stage_index(&self) -> Option<usize> {
        self.stage
    }

    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    pub fn bar(&self) -> i32 {
        self.bar
    }

    pub fn beat(&self) -> i32 {
        self.beat
    }

    pub fn total_beats(&self) -> i64 {
        self.total_beats
    }

    /// Seconds per beat of the current stage
    pub fn beat_length(&self) -> f64 {
        self.beat_len
    }

    pub fn stage_start(&self) -> f64 {
        self.stage_start
    }

    /// (stage, bar, beat) deadlines
    pub fn deadlines(&self) -> (f64, f64, f64) {
        (self.next_stage, self.next_bar, self.next_beat)
    }

    pub fn spawn_cursor(&self) -> usize {
        self.cursor
    }

    /// Leave `Idle` and roll the first stage immediately
    pub fn start_game(
        &mut self,
        now: f64,
        stages: &[Stage],
        audio: &mut impl AudioPlayer,
    ) -> Option<TimelineEvent> {
        *self = Self::new(self.lead_in);
        if stages.is_empty() {
            log::error!("Refusing to start: no stages");
            return None;
        }
        self.state = TimelineState::Active;
        Some(self.roll_stage(now, stages, audio))
    }

    /// Back to `Idle`, stopping the music
    pub fn stop(&mut self, audio: &mut impl AudioPlayer) {
        audio.stop();
        *self = Self::new(self.lead_in);
    }

    /// Cross at most one boundary at clock time `now`
    pub fn advance(
        &mut self,
        now: f64,
        stages: &[Stage],
        audio: &mut impl AudioPlayer,
    ) -> Option<TimelineEvent> {
        if self.state != TimelineState::Active || stages.is_empty() {
            return None;
        }
        let stage_idx = self.stage?;

        if now >= self.next_stage {
            return Some(self.roll_stage(now, stages, audio));
        }

        // Overdue beats of the current bar drain before the next downbeat.
        // The last beat of a bar belongs to the next bar boundary.
        if self.bar >= 0 && self.beat + 1 < BEATS_PER_BAR as i32 && now >= self.next_beat {
            let info = self.on_beat(&stages[stage_idx]);
            self.next_beat = self.bar_start() + (self.beat + 1) as f64 * self.beat_len;
            return Some(TimelineEvent::Beat(info));
        }

        if now >= self.next_bar {
            self.bar += 1;
            self.beat = -1;
            self.next_bar += self.bar_len;
            log::debug!("Bar {} of stage {}", self.bar, stage_idx);
            let info = self.on_beat(&stages[stage_idx]);
            self.next_beat = self.bar_start() + self.beat_len;
            return Some(TimelineEvent::Beat(info));
        }

        None
    }

    /// Downbeat time of the current bar
    fn bar_start(&self) -> f64 {
        self.next_bar - self.bar_len
    }

    fn roll_stage(
        &mut self,
        now: f64,
        stages: &[Stage],
        audio: &mut impl AudioPlayer,
    ) -> TimelineEvent {
        let next = match self.stage {
            Some(i) if i + 1 < stages.len() => i + 1,
            Some(_) => {
                self.loop_count += 1;
                0
            }
            None => 0,
        };
        self.stage = Some(next);
        let stage = &stages[next];

        self.beat_len = stage.beat_length();
        self.bar_len = BEATS_PER_BAR as f64 * self.beat_len;
        self.bar = -1;
        self.beat = -1;
        self.total_beats = -1;
        self.cursor = 0;

        let start = now + self.lead_in;
        self.stage_start = start;
        audio.play_scheduled(&stage.track, start);
        self.next_stage = start + audio.track_duration(&stage.track);
        self.next_bar = start;
        self.next_beat = start;

        log::info!(
            "Stage {} `{}` (loop {}) starts at {:.3}, {} bpm",
            next,
            stage.name,
            self.loop_count,
            start,
            stage.bpm
        );

        TimelineEvent::StageStarted {
            stage: next,
            loop_count: self.loop_count,
            start,
        }
    }

    fn on_beat(&mut self, stage: &Stage) -> BeatInfo {
        self.total_beats += 1;
        self.beat += 1;

        let first = self.cursor;
        while self
            .spawns_at(stage, self.cursor)
            .is_some_and(|beat| beat == self.total_beats)
        {
            self.cursor += 1;
        }

        BeatInfo {
            bar: self.bar,
            beat: self.beat,
            total: self.total_beats,
            spawns: first..self.cursor,
        }
    }

    fn spawns_at(&self, stage: &Stage, index: usize) -> Option<i64> {
        stage.spawns.get(index).map(|s| s.beat)
    }

    /// Enter the paused state. False if not running.
    pub fn pause(&mut self, now: f64, audio: &mut impl AudioPlayer) -> bool {
        if self.state != TimelineState::Active {
            return false;
        }
        self.state = TimelineState::Paused { since: now };
        audio.set_paused(true);
        true
    }

    /// Leave the paused state, shifting every deadline by the time lost.
    /// Returns the lost time, or None if not paused.
    pub fn resume(&mut self, now: f64, audio: &mut impl AudioPlayer) -> Option<f64> {
        let TimelineState::Paused { since } = self.state else {
            return None;
        };
        let lost = (now - since).max(0.0);
        self.next_stage += lost;
        self.next_bar += lost;
        self.next_beat += lost;
        self.stage_start += lost;
        self.state = TimelineState::Active;
        audio.set_paused(false);
        log::debug!("Resumed after {:.3}s", lost);
        Some(lost)
    }
}
