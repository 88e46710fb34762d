//! Music playback seam
//!
//! The timeline only ever schedules whole tracks against the audio clock and
//! asks how long they run. Mixing, ducking and sound effects live elsewhere.

use std::collections::HashMap;

/// Audio device as seen by the timeline
pub trait AudioPlayer {
    /// Start `track` exactly at clock time `at`
    fn play_scheduled(&mut self, track: &str, at: f64);
    /// Stop whatever is playing
    fn stop(&mut self);
    fn is_playing(&self) -> bool;
    /// Track length in seconds
    fn track_duration(&self, track: &str) -> f64;
    /// Pause/resume the music alongside the simulation
    fn set_paused(&mut self, _paused: bool) {}
}

/// A scheduled playback request
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTrack {
    pub track: String,
    pub at: f64,
}

/// Audio player that produces no sound and records what it was asked to do
#[derive(Debug, Default)]
pub struct HeadlessAudio {
    durations: HashMap<String, f64>,
    default_duration: f64,
    current: Option<ScheduledTrack>,
    paused: bool,
    /// Every playback request, oldest first
    pub history: Vec<ScheduledTrack>,
}

impl HeadlessAudio {
    /// Create a player whose unknown tracks last `default_duration` seconds
    pub fn new(default_duration: f64) -> Self {
        Self {
            default_duration,
            ..Default::default()
        }
    }

    /// Register a track length
    pub fn with_track(mut self, track: &str, seconds: f64) -> Self {
        self.durations.insert(track.to_string(), seconds);
        self
    }

    pub fn current(&self) -> Option<&ScheduledTrack> {
        self.current.as_ref()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

impl AudioPlayer for HeadlessAudio {
    fn play_scheduled(&mut self, track: &str, at: f64) {
        let scheduled = ScheduledTrack {
            track: track.to_string(),
            at,
        };
        log::debug!("Scheduling track `{}` at {:.3}", track, at);
        self.history.push(scheduled.clone());
        self.current = Some(scheduled);
        self.paused = false;
    }

    fn stop(&mut self) {
        self.current = None;
        self.paused = false;
    }

    fn is_playing(&self) -> bool {
        self.current.is_some() && !self.paused
    }

    fn track_duration(&self, track: &str) -> f64 {
        self.durations
            .get(track)
            .copied()
            .unwrap_or(self.default_duration)
    }

    fn set_paused(&mut self, paused: bool) {
        if self.current.is_some() {
            self.paused = paused;
        }
    }
}
