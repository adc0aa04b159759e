//! Alert engine: decides which side effects fire on each poll.
//!
//! ## Firing rules
//!
//! - **Warning**: one cue on entry, then at most one per warning interval
//!   (default 1.0 s) while running.
//! - **Critical**: same, with the shorter critical interval (default 0.5 s).
//! - **Complete**: one cue plus one completion notice on the edge into the
//!   finished state, never again until the record is cleared.
//! - **Lead time**: one outbound notice per run once remaining time drops to
//!   the configured lead time. Latched by its own flag, so a coarse poll that
//!   skips past the exact instant still fires, and a repeated poll does not.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::zone::AlertZone;
use crate::timer::{duration_from_secs, duration_secs, TimerState};

/// Thresholds and rate limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPolicy {
    /// Remaining time at or below which the countdown is in Warning.
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold_secs: f64,
    #[serde(default = "default_warning_interval")]
    pub warning_cue_interval_secs: f64,
    #[serde(default = "default_critical_interval")]
    pub critical_cue_interval_secs: f64,
    /// Remaining time at which the one-shot outbound notice fires.
    #[serde(default)]
    pub lead_time_secs: Option<f64>,
    /// Slack above the lead time so a poll landing just early still counts.
    #[serde(default = "default_lead_epsilon")]
    pub lead_time_epsilon_secs: f64,
}

fn default_warning_threshold() -> f64 {
    5.0
}
fn default_warning_interval() -> f64 {
    1.0
}
fn default_critical_interval() -> f64 {
    0.5
}
fn default_lead_epsilon() -> f64 {
    0.5
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            warning_threshold_secs: default_warning_threshold(),
            warning_cue_interval_secs: default_warning_interval(),
            critical_cue_interval_secs: default_critical_interval(),
            lead_time_secs: None,
            lead_time_epsilon_secs: default_lead_epsilon(),
        }
    }
}

/// A side effect requested by the engine, dispatched by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SideEffect {
    PlayCue { zone: AlertZone },
    NotifyComplete,
    NotifyLeadTime { lead_time_secs: f64 },
}

impl SideEffect {
    /// Text for outbound effects; `None` for cues.
    pub fn message(&self) -> Option<String> {
        match self {
            SideEffect::PlayCue { .. } => None,
            SideEffect::NotifyComplete => {
                Some("Drawdown complete: target mass reached.".to_string())
            }
            SideEffect::NotifyLeadTime { lead_time_secs } => Some(format!(
                "{lead_time_secs:.0} seconds remaining until target mass."
            )),
        }
    }
}

/// Last emission bookkeeping. Cleared together with the clock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FireRecord {
    pub last_fired_at: Option<DateTime<Utc>>,
    pub fired_for_zone: Option<AlertZone>,
    /// Outbound lead-time notice already sent this run.
    pub lead_notified: bool,
}

impl FireRecord {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn mark(&mut self, zone: AlertZone, now: DateTime<Utc>) {
        self.fired_for_zone = Some(zone);
        self.last_fired_at = Some(now);
    }

    /// Whether a cue for `zone` may fire at `now` given `interval`.
    fn cue_due(&self, zone: AlertZone, now: DateTime<Utc>, interval: Duration) -> bool {
        if self.fired_for_zone != Some(zone) {
            return true;
        }
        self.last_fired_at
            .map_or(true, |last| now - last >= interval)
    }
}

/// Zone and effects for one poll.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub zone: AlertZone,
    pub effects: Vec<SideEffect>,
}

#[derive(Debug, Clone, Default)]
pub struct AlertEngine {
    policy: AlertPolicy,
}

impl AlertEngine {
    pub fn new(policy: AlertPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AlertPolicy {
        &self.policy
    }

    pub fn warning_threshold(&self) -> Duration {
        duration_from_secs(self.policy.warning_threshold_secs)
    }

    /// Classify `state` against `target` and decide what fires now.
    ///
    /// Must see the post-tick state: the Running -> Finished edge is detected
    /// from `record`, not from the clock.
    pub fn evaluate(
        &self,
        state: &TimerState,
        target: Duration,
        record: &mut FireRecord,
        now: DateTime<Utc>,
    ) -> Evaluation {
        let zone = AlertZone::classify(state, target, self.warning_threshold());
        let mut effects = Vec::new();

        match zone {
            AlertZone::Complete => {
                if record.fired_for_zone != Some(AlertZone::Complete) {
                    effects.push(SideEffect::PlayCue { zone });
                    effects.push(SideEffect::NotifyComplete);
                    record.mark(zone, now);
                }
            }
            AlertZone::Warning | AlertZone::Critical if state.is_running() => {
                let interval = if zone == AlertZone::Critical {
                    self.policy.critical_cue_interval_secs
                } else {
                    self.policy.warning_cue_interval_secs
                };
                if record.cue_due(zone, now, duration_from_secs(interval)) {
                    effects.push(SideEffect::PlayCue { zone });
                    record.mark(zone, now);
                }
            }
            _ => {}
        }

        if let Some(lead_time_secs) = self.policy.lead_time_secs {
            if state.is_running() && !record.lead_notified {
                let remaining = state.remaining(target);
                let window = duration_from_secs(lead_time_secs + self.policy.lead_time_epsilon_secs);
                if remaining > Duration::zero() && remaining <= window {
                    effects.push(SideEffect::NotifyLeadTime { lead_time_secs });
                    record.lead_notified = true;
                }
            }
        }

        if !effects.is_empty() {
            debug!(
                zone = %zone,
                remaining_secs = duration_secs(state.remaining(target)),
                ?effects,
                "alert effects"
            );
        }

        Evaluation { zone, effects }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{TimerClock, TimerStatus};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    fn at(secs: f64) -> DateTime<Utc> {
        t0() + duration_from_secs(secs)
    }

    struct Rig {
        clock: TimerClock,
        record: FireRecord,
        engine: AlertEngine,
        target: Duration,
    }

    impl Rig {
        fn new(target_secs: f64, policy: AlertPolicy) -> Self {
            let mut clock = TimerClock::new();
            clock.start(t0());
            Self {
                clock,
                record: FireRecord::default(),
                engine: AlertEngine::new(policy),
                target: duration_from_secs(target_secs),
            }
        }

        fn poll(&mut self, secs: f64) -> Evaluation {
            let now = at(secs);
            self.clock.tick(now, self.target);
            self.engine
                .evaluate(self.clock.state(), self.target, &mut self.record, now)
        }
    }

    fn cues(effects: &[SideEffect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, SideEffect::PlayCue { .. }))
            .count()
    }

    #[test]
    fn safe_zone_is_quiet() {
        let mut rig = Rig::new(100.0, AlertPolicy::default());
        let eval = rig.poll(10.0);
        assert_eq!(eval.zone, AlertZone::Safe);
        assert!(eval.effects.is_empty());
    }

    #[test]
    fn warning_cue_rate_limited_to_one_second() {
        let mut rig = Rig::new(100.0, AlertPolicy::default());
        let first = rig.poll(96.0);
        assert_eq!(first.zone, AlertZone::Warning);
        assert_eq!(first.effects, vec![SideEffect::PlayCue { zone: AlertZone::Warning }]);

        assert!(rig.poll(96.1).effects.is_empty());
        assert!(rig.poll(96.9).effects.is_empty());
        assert_eq!(cues(&rig.poll(97.0).effects), 1);
        assert!(rig.poll(97.5).effects.is_empty());
    }

    #[test]
    fn critical_cue_uses_shorter_interval() {
        let engine = AlertEngine::new(AlertPolicy::default());
        let mut record = FireRecord::default();

        // Running and past a 4 s target without a finishing tick.
        let mut clock = TimerClock::new();
        clock.start(t0());
        clock.tick(at(5.0), duration_from_secs(100.0));
        let state = clock.state().clone();
        let target = duration_from_secs(4.0);

        let first = engine.evaluate(&state, target, &mut record, at(5.0));
        assert_eq!(first.zone, AlertZone::Critical);
        assert_eq!(cues(&first.effects), 1);
        assert!(engine.evaluate(&state, target, &mut record, at(5.3)).effects.is_empty());
        assert_eq!(cues(&engine.evaluate(&state, target, &mut record, at(5.5)).effects), 1);
    }

    #[test]
    fn finished_edge_fires_exactly_once() {
        let mut rig = Rig::new(100.0, AlertPolicy::default());
        rig.poll(96.0);
        let done = rig.poll(100.0);
        assert_eq!(done.zone, AlertZone::Complete);
        assert_eq!(
            done.effects,
            vec![
                SideEffect::PlayCue { zone: AlertZone::Complete },
                SideEffect::NotifyComplete
            ]
        );
        for i in 0..50 {
            let later = rig.poll(100.0 + i as f64 * 0.1);
            assert_eq!(later.zone, AlertZone::Complete);
            assert!(later.effects.is_empty());
        }
        assert!(rig.poll(104.0).effects.is_empty());
    }

    #[test]
    fn finished_edge_fires_even_when_warning_skipped() {
        let mut rig = Rig::new(10.0, AlertPolicy::default());
        rig.poll(1.0);
        let done = rig.poll(30.0);
        assert_eq!(rig.clock.status(), TimerStatus::Finished);
        assert!(done.effects.contains(&SideEffect::NotifyComplete));
    }

    #[test]
    fn paused_in_warning_is_silent() {
        let mut rig = Rig::new(100.0, AlertPolicy::default());
        rig.poll(96.0);
        rig.clock.pause(at(96.5), rig.target);
        let eval = rig
            .engine
            .evaluate(rig.clock.state(), rig.target, &mut rig.record, at(99.0));
        assert_eq!(eval.zone, AlertZone::Warning);
        assert!(eval.effects.is_empty());
    }

    #[test]
    fn lead_time_fires_once_inside_window() {
        let policy = AlertPolicy {
            lead_time_secs: Some(10.0),
            ..AlertPolicy::default()
        };
        let mut rig = Rig::new(100.0, policy);
        assert!(rig.poll(85.0).effects.is_empty());
        let eval = rig.poll(89.7);
        assert_eq!(
            eval.effects,
            vec![SideEffect::NotifyLeadTime { lead_time_secs: 10.0 }]
        );
        assert!(rig.poll(89.8).effects.is_empty());
        assert!(rig.poll(90.0).effects.is_empty());
        assert!(rig.record.lead_notified);
    }

    #[test]
    fn lead_time_survives_skipped_tick() {
        let policy = AlertPolicy {
            lead_time_secs: Some(10.0),
            ..AlertPolicy::default()
        };
        let mut rig = Rig::new(100.0, policy);
        rig.poll(80.0);
        // Poll lands well past the exact lead instant.
        let eval = rig.poll(92.0);
        assert!(eval
            .effects
            .contains(&SideEffect::NotifyLeadTime { lead_time_secs: 10.0 }));
    }

    #[test]
    fn lead_time_not_sent_after_finish() {
        let policy = AlertPolicy {
            lead_time_secs: Some(10.0),
            ..AlertPolicy::default()
        };
        let mut rig = Rig::new(20.0, policy);
        rig.poll(1.0);
        let done = rig.poll(25.0);
        assert!(!done
            .effects
            .iter()
            .any(|e| matches!(e, SideEffect::NotifyLeadTime { .. })));
    }

    #[test]
    fn cleared_record_fires_again() {
        let mut rig = Rig::new(10.0, AlertPolicy::default());
        rig.poll(11.0);
        rig.clock.reset(at(12.0));
        rig.record.clear();
        rig.clock.start(at(20.0));
        let done = rig.poll(31.0);
        assert!(done.effects.contains(&SideEffect::NotifyComplete));
    }

    #[test]
    fn messages() {
        assert_eq!(SideEffect::PlayCue { zone: AlertZone::Warning }.message(), None);
        assert_eq!(
            SideEffect::NotifyLeadTime { lead_time_secs: 10.0 }.message().as_deref(),
            Some("10 seconds remaining until target mass.")
        );
    }
}
