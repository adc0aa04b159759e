//! Countdown clock.
//!
//! The clock is a wall-clock-based state machine. It does not use internal
//! threads; the caller passes `now` into every command and is responsible
//! for calling `tick()` periodically while running.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!            |
//!            v
//!         Finished          (reset: any state -> Idle)
//! ```
//!
//! Elapsed time is kept in whole microseconds so that pause/resume cycles
//! round-trip exactly.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    /// Elapsed reached the target. Terminal until reset.
    Finished,
}

/// Clock state. `anchor` is `Some` exactly when the status is `Running`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerState {
    status: TimerStatus,
    elapsed_us: i64,
    /// Wall-clock instant elapsed time is measured from while running.
    anchor: Option<DateTime<Utc>>,
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            status: TimerStatus::Idle,
            elapsed_us: 0,
            anchor: None,
        }
    }
}

impl TimerState {
    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn elapsed(&self) -> Duration {
        Duration::microseconds(self.elapsed_us)
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_us as f64 / 1_000_000.0
    }

    pub fn anchor(&self) -> Option<DateTime<Utc>> {
        self.anchor
    }

    /// Time left until `target`; negative once the target has been passed
    /// without the clock noticing (e.g. paused past the deadline).
    pub fn remaining(&self, target: Duration) -> Duration {
        target - self.elapsed()
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }
}

/// Owns the [`TimerState`]; the only way to mutate it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimerClock {
    state: TimerState,
}

impl TimerClock {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn status(&self) -> TimerStatus {
        self.state.status
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.state.elapsed_secs()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start from idle or resume from pause. The anchor is set so that the
    /// already accumulated elapsed time carries over.
    pub fn start(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let resumed = match self.state.status {
            TimerStatus::Idle => false,
            TimerStatus::Paused => true,
            TimerStatus::Running | TimerStatus::Finished => return None,
        };
        self.state.anchor = Some(now - self.state.elapsed());
        self.state.status = TimerStatus::Running;
        let elapsed_secs = self.state.elapsed_secs();
        Some(if resumed {
            Event::TimerResumed { elapsed_secs, at: now }
        } else {
            Event::TimerStarted { at: now }
        })
    }

    /// Pause a running clock. A pause that lands past `target` finishes the
    /// run instead, so elapsed never overshoots the target.
    pub fn pause(&mut self, now: DateTime<Utc>, target: Duration) -> Option<Event> {
        if self.state.status != TimerStatus::Running {
            return None;
        }
        // Flush elapsed time first.
        self.flush_elapsed(now);
        if let Some(finished) = self.finish_if_due(now, target) {
            return Some(finished);
        }
        self.state.status = TimerStatus::Paused;
        self.state.anchor = None;
        Some(Event::TimerPaused {
            elapsed_secs: self.state.elapsed_secs(),
            at: now,
        })
    }

    pub fn reset(&mut self, now: DateTime<Utc>) -> Option<Event> {
        self.state = TimerState::default();
        Some(Event::TimerReset { at: now })
    }

    /// Call periodically. Returns `Some(Event::TimerFinished)` on the one
    /// tick where elapsed reaches `target`.
    pub fn tick(&mut self, now: DateTime<Utc>, target: Duration) -> Option<Event> {
        if self.state.status != TimerStatus::Running {
            return None;
        }
        self.flush_elapsed(now);
        self.finish_if_due(now, target)
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Elapsed never decreases: a wall clock stepping backwards is ignored.
    fn flush_elapsed(&mut self, now: DateTime<Utc>) {
        if let Some(anchor) = self.state.anchor {
            let candidate = (now - anchor).num_microseconds().unwrap_or(i64::MAX);
            self.state.elapsed_us = self.state.elapsed_us.max(candidate);
        }
    }

    /// Clamp to `target` and enter Finished once elapsed reaches it.
    fn finish_if_due(&mut self, now: DateTime<Utc>, target: Duration) -> Option<Event> {
        if self.state.elapsed() < target {
            return None;
        }
        self.state.elapsed_us = target.num_microseconds().unwrap_or(i64::MAX);
        self.state.status = TimerStatus::Finished;
        self.state.anchor = None;
        Some(Event::TimerFinished {
            elapsed_secs: self.state.elapsed_secs(),
            at: now,
        })
    }
}

/// Seconds to a microsecond-resolution duration.
pub fn duration_from_secs(secs: f64) -> Duration {
    Duration::microseconds((secs * 1_000_000.0).round() as i64)
}

pub fn duration_secs(duration: Duration) -> f64 {
    duration.num_microseconds().unwrap_or(i64::MAX) as f64 / 1_000_000.0
}
