use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::timer::{duration_secs, TimerState, TimerStatus};

/// Countdown phase driving color, banner and cue policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertZone {
    /// More than the warning threshold left
    Safe,
    /// Within the warning threshold, target not yet reached
    Warning,
    /// Target reached or passed but the clock has not finished
    Critical,
    /// Clock finished
    Complete,
}

impl AlertZone {
    /// Zone for the given state. Total: every (state, target) pair maps to a
    /// zone, including a zero target or a paused clock past its deadline.
    pub fn classify(state: &TimerState, target: Duration, warning_threshold: Duration) -> Self {
        if state.status() == TimerStatus::Finished {
            return AlertZone::Complete;
        }
        let remaining = state.remaining(target);
        if remaining <= Duration::zero() {
            AlertZone::Critical
        } else if remaining <= warning_threshold {
            AlertZone::Warning
        } else {
            AlertZone::Safe
        }
    }

    /// Numeric severity (0-3)
    pub fn severity(self) -> u8 {
        match self {
            AlertZone::Safe => 0,
            AlertZone::Warning => 1,
            AlertZone::Critical => 2,
            AlertZone::Complete => 3,
        }
    }

    /// Display color as a hex string.
    pub fn color(self) -> &'static str {
        match self {
            AlertZone::Safe => "#2e7d32",
            AlertZone::Warning => "#ef6c00",
            AlertZone::Critical => "#c62828",
            AlertZone::Complete => "#1565c0",
        }
    }

    /// Banner shown while in this zone, if any.
    pub fn banner(self, remaining: Duration) -> Option<String> {
        match self {
            AlertZone::Safe => None,
            AlertZone::Warning => Some(format!(
                "Approaching target: {:.1} s remaining",
                duration_secs(remaining).max(0.0)
            )),
            AlertZone::Critical => Some("Target reached: stop removal now".to_string()),
            AlertZone::Complete => Some("Target mass removed".to_string()),
        }
    }

    /// Number of terminal bells for this zone's cue.
    pub fn cue_repeats(self) -> u8 {
        self.severity()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertZone::Safe => "safe",
            AlertZone::Warning => "warning",
            AlertZone::Critical => "critical",
            AlertZone::Complete => "complete",
        }
    }
}

impl std::fmt::Display for AlertZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{duration_from_secs, TimerClock};
    use chrono::{TimeZone, Utc};

    fn state_at(elapsed: f64, target: f64) -> TimerState {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let mut clock = TimerClock::new();
        clock.start(t0);
        clock.tick(t0 + duration_from_secs(elapsed), duration_from_secs(target));
        clock.state().clone()
    }

    #[test]
    fn boundaries() {
        let target = duration_from_secs(100.0);
        let warn = duration_from_secs(5.0);
        let classify = |elapsed| AlertZone::classify(&state_at(elapsed, 100.0), target, warn);

        assert_eq!(classify(50.0), AlertZone::Safe);
        assert_eq!(classify(94.9), AlertZone::Safe);
        assert_eq!(classify(95.0), AlertZone::Warning);
        assert_eq!(classify(96.0), AlertZone::Warning);
        assert_eq!(classify(99.99), AlertZone::Warning);
        assert_eq!(classify(100.0), AlertZone::Complete);
    }

    #[test]
    fn critical_when_past_target_but_not_finished() {
        // Ticked against a longer target, then classified against a shorter one.
        let state = state_at(12.0, 100.0);
        let zone = AlertZone::classify(&state, duration_from_secs(10.0), duration_from_secs(5.0));
        assert_eq!(zone, AlertZone::Critical);
    }

    #[test]
    fn idle_with_short_target_is_warning() {
        let zone = AlertZone::classify(
            &TimerState::default(),
            duration_from_secs(3.0),
            duration_from_secs(5.0),
        );
        assert_eq!(zone, AlertZone::Warning);
    }

    #[test]
    fn zero_target_is_critical_not_panic() {
        let zone = AlertZone::classify(&TimerState::default(), Duration::zero(), duration_from_secs(5.0));
        assert_eq!(zone, AlertZone::Critical);
    }

    #[test]
    fn banners() {
        assert_eq!(AlertZone::Safe.banner(duration_from_secs(50.0)), None);
        assert_eq!(
            AlertZone::Warning.banner(duration_from_secs(3.24)).as_deref(),
            Some("Approaching target: 3.2 s remaining")
        );
        assert!(AlertZone::Complete.banner(Duration::zero()).is_some());
    }
}
