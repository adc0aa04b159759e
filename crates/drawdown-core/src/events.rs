use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alert::AlertZone;
use crate::session::Snapshot;

/// Every state change in a session produces an Event.
/// Hosts print or forward them; the core never acts on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        at: DateTime<Utc>,
    },
    TimerResumed {
        elapsed_secs: f64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        elapsed_secs: f64,
        at: DateTime<Utc>,
    },
    /// Elapsed reached the target; emitted once per run.
    TimerFinished {
        elapsed_secs: f64,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    /// The countdown moved into a different zone.
    ZoneChanged {
        from: AlertZone,
        to: AlertZone,
        at: DateTime<Utc>,
    },
    /// Inputs changed the target. `None` means the inputs no longer yield one.
    TargetChanged {
        target_duration_secs: Option<f64>,
        at: DateTime<Utc>,
    },
    StateSnapshot(Snapshot),
}

impl Event {
    /// Short machine name, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::TimerStarted { .. } => "timer_started",
            Event::TimerResumed { .. } => "timer_resumed",
            Event::TimerPaused { .. } => "timer_paused",
            Event::TimerFinished { .. } => "timer_finished",
            Event::TimerReset { .. } => "timer_reset",
            Event::ZoneChanged { .. } => "zone_changed",
            Event::TargetChanged { .. } => "target_changed",
            Event::StateSnapshot(_) => "state_snapshot",
        }
    }
}
