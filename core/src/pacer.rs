//! Frame rate limiter and FPS counter.
//!
//! Each produced frame moves a "wanted tick" forward by the frame's ideal
//! duration. The wanted tick is always recomputed as
//! `baseline + round(frame_index * ideal_ms)` rather than accumulated, so
//! rounding never drifts. When the loop falls behind, pacing restarts from
//! the current tick instead of compressing later frames to catch up.

use std::fmt;
use std::time::Duration;

use crate::clock::Clock;

/// Scanlines in a full-length frame.
pub const NOMINAL_SCANLINES: u32 = 263;

/// Duration of a full-length frame in milliseconds (60 Hz).
pub const NOMINAL_FRAME_MS: f64 = 1000.0 / 60.0;

/// Frames between FPS measurements.
pub const FPS_SAMPLE_FRAMES: u32 = 30;

/// Target FPS reported when a frame lasts under a millisecond.
pub const UNBOUNDED_TARGET_FPS: u32 = 999;

/// Ideal wall-clock duration of a frame that lasted `scanlines` lines.
pub fn frame_duration_ms(scanlines: u32) -> f64 {
    if scanlines == NOMINAL_SCANLINES {
        NOMINAL_FRAME_MS
    } else {
        NOMINAL_FRAME_MS * scanlines as f64 / NOMINAL_SCANLINES as f64
    }
}

/// One FPS measurement, for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FpsSample {
    pub measured: u32,
    pub target: u32,
}

impl fmt::Display for FpsSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} FPS", self.measured, self.target)
    }
}

pub struct FramePacer {
    clock: Box<dyn Clock>,
    limit: bool,
    ideal_ms: f64,
    frame_index: u64,
    baseline_tick: u64,
    wanted_tick: u64,
    frames_since_measure: u32,
    last_measure_tick: u64,
}

impl FramePacer {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        let now = clock.ticks_ms();
        Self {
            clock,
            limit: true,
            ideal_ms: NOMINAL_FRAME_MS,
            frame_index: 0,
            baseline_tick: now,
            wanted_tick: now,
            frames_since_measure: 0,
            last_measure_tick: now,
        }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Enable or disable frame rate limiting. Unlimited mode never sleeps.
    pub fn set_limit(&mut self, limit: bool) {
        self.limit = limit;
    }

    pub fn limit(&self) -> bool {
        self.limit
    }

    /// Drop all counters and re-anchor pacing at the current tick.
    pub fn reset(&mut self) {
        let now = self.clock.ticks_ms();
        self.frame_index = 0;
        self.baseline_tick = now;
        self.wanted_tick = now;
        self.frames_since_measure = 0;
        self.last_measure_tick = now;
    }

    /// Account for a frame that lasted `scanlines` lines and return how long
    /// to sleep before starting the next one.
    pub fn on_frame_produced(&mut self, scanlines: u32) -> Duration {
        let ideal_ms = frame_duration_ms(scanlines);
        if ideal_ms != self.ideal_ms {
            // New frame length: continue from where the old segment ended.
            self.baseline_tick = self.wanted_tick;
            self.frame_index = 0;
            self.ideal_ms = ideal_ms;
        }

        self.frame_index += 1;
        let now = self.clock.ticks_ms();
        let wanted = self.baseline_tick + (self.frame_index as f64 * self.ideal_ms).round() as u64;

        if self.limit && now < wanted {
            self.wanted_tick = wanted;
            Duration::from_millis(wanted - now)
        } else {
            self.frame_index = 0;
            self.baseline_tick = now;
            self.wanted_tick = now;
            Duration::ZERO
        }
    }

    /// Count a completed frame. Every [`FPS_SAMPLE_FRAMES`] frames, returns
    /// the rate measured since the previous sample.
    pub fn record_frame(&mut self) -> Option<FpsSample> {
        self.frames_since_measure += 1;
        if self.frames_since_measure < FPS_SAMPLE_FRAMES {
            return None;
        }

        let now = self.clock.ticks_ms();
        let elapsed = now.saturating_sub(self.last_measure_tick).max(1);
        self.last_measure_tick = now;

        let measured = (self.frames_since_measure as u64 * 1000 / elapsed) as u32;
        self.frames_since_measure = 0;

        Some(FpsSample {
            measured,
            target: self.target_fps(),
        })
    }

    /// Display target. Frames shorter than a millisecond report
    /// [`UNBOUNDED_TARGET_FPS`].
    pub fn target_fps(&self) -> u32 {
        if self.ideal_ms < 1.0 {
            UNBOUNDED_TARGET_FPS
        } else {
            (1000.0 / self.ideal_ms).round() as u32
        }
    }

    pub fn ideal_ms(&self) -> f64 {
        self.ideal_ms
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn baseline_tick(&self) -> u64 {
        self.baseline_tick
    }

    pub fn wanted_tick(&self) -> u64 {
        self.wanted_tick
    }
}
