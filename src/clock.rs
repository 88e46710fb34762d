//! Audio-derived time source
//!
//! The timeline schedules against this clock only. It keeps running while the
//! game is paused; the timeline compensates by shifting its deadlines.

use std::cell::Cell;

/// Monotonic high-resolution time in seconds, independent of frame rate
pub trait ClockSource {
    fn now(&self) -> f64;
}

/// Clock driven by hand (headless runs and tests)
#[derive(Debug, Default)]
pub struct ManualClock {
    time: Cell<f64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            time: Cell::new(start),
        }
    }

    /// Move time forward; negative steps are ignored to stay monotonic
    pub fn advance(&self, seconds: f64) {
        if seconds > 0.0 {
            self.time.set(self.time.get() + seconds);
        }
    }

    /// Jump to an absolute time (never backwards)
    pub fn set(&self, time: f64) {
        if time > self.time.get() {
            self.time.set(time);
        }
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> f64 {
        self.time.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_is_monotonic() {
        let clock = ManualClock::new(2.0);
        clock.advance(0.5);
        assert_eq!(clock.now(), 2.5);
        clock.advance(-1.0);
        assert_eq!(clock.now(), 2.5);
        clock.set(1.0);
        assert_eq!(clock.now(), 2.5);
        clock.set(3.0);
        assert_eq!(clock.now(), 3.0);
    }
}
