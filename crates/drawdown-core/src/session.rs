//! One countdown session.
//!
//! A [`Session`] is the explicit owner of everything that changes while a
//! countdown runs: the current inputs and target, the [`TimerClock`], and the
//! [`FireRecord`]. Hosts hold one and call into it by reference; there is no
//! global state.
//!
//! ## Usage
//!
//! ```ignore
//! let mut session = Session::new(AlertPolicy::default());
//! session.set_inputs(RateInputs::new(80.0, 2.0, 22_500.0, 11_000.0))?;
//! session.start(Utc::now())?;
//! // In a loop:
//! let outcome = session.poll(Utc::now());
//! dispatch(&outcome.effects, &notifier, destination);
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::alert::{AlertEngine, AlertPolicy, AlertZone, FireRecord, SideEffect};
use crate::error::{CoreError, NotifyError, RateError, Result};
use crate::events::Event;
use crate::notify::Notifier;
use crate::rate::{RateInputs, RateResult};
use crate::timer::{duration_from_secs, duration_secs, TimerClock, TimerState, TimerStatus};

/// Read-only view handed to presentation each cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub status: TimerStatus,
    pub elapsed_secs: f64,
    pub target_duration_secs: Option<f64>,
    pub remaining_secs: Option<f64>,
    /// `None` until the inputs yield a target.
    pub zone: Option<AlertZone>,
    pub color: Option<String>,
    pub banner_text: Option<String>,
    pub at: DateTime<Utc>,
}

/// Result of one poll cycle or applied command.
#[derive(Debug)]
pub struct PollOutcome {
    pub snapshot: Snapshot,
    pub effects: Vec<SideEffect>,
    pub events: Vec<Event>,
    /// Deliveries that failed while dispatching `effects`.
    pub failures: Vec<NotifyError>,
    /// Why the last inputs were rejected, when they were.
    pub input_error: Option<RateError>,
}

impl PollOutcome {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            effects: Vec::new(),
            events: Vec::new(),
            failures: Vec::new(),
            input_error: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    inputs: Option<RateInputs>,
    rate: Option<RateResult>,
    target: Option<Duration>,
    clock: TimerClock,
    record: FireRecord,
    engine: AlertEngine,
    last_zone: Option<AlertZone>,
}

impl Session {
    pub fn new(policy: AlertPolicy) -> Self {
        Self {
            engine: AlertEngine::new(policy),
            ..Self::default()
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn inputs(&self) -> Option<&RateInputs> {
        self.inputs.as_ref()
    }

    /// Last computed rate result, valid or not.
    pub fn rate(&self) -> Option<&RateResult> {
        self.rate.as_ref()
    }

    pub fn target(&self) -> Option<Duration> {
        self.target
    }

    pub fn timer_state(&self) -> &TimerState {
        self.clock.state()
    }

    pub fn fire_record(&self) -> &FireRecord {
        &self.record
    }

    pub fn status(&self) -> TimerStatus {
        self.clock.status()
    }

    pub fn is_running(&self) -> bool {
        self.clock.status() == TimerStatus::Running
    }

    pub fn policy(&self) -> &AlertPolicy {
        self.engine.policy()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_at(Utc::now())
    }

    pub fn snapshot_at(&self, at: DateTime<Utc>) -> Snapshot {
        let state = self.clock.state();
        let (zone, remaining) = match self.target {
            Some(target) => (
                Some(AlertZone::classify(state, target, self.engine.warning_threshold())),
                Some(state.remaining(target)),
            ),
            None => (None, None),
        };
        Snapshot {
            status: state.status(),
            elapsed_secs: state.elapsed_secs(),
            target_duration_secs: self.target.map(duration_secs),
            remaining_secs: remaining.map(|r| duration_secs(r).max(0.0)),
            zone,
            color: zone.map(|z| z.color().to_string()),
            banner_text: zone.zip(remaining).and_then(|(z, r)| z.banner(r)),
            at,
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot_event(&self) -> Event {
        Event::StateSnapshot(self.snapshot())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Recompute the plan from new inputs.
    ///
    /// A changed target (including losing it) resets the clock and the fire
    /// record together; unchanged inputs leave a running countdown alone.
    pub fn set_inputs(&mut self, inputs: RateInputs) -> std::result::Result<RateResult, RateError> {
        let result = RateResult::from_inputs(&inputs);
        let outcome = inputs.validate().and_then(|_| result.target_duration());
        let new_target = outcome.as_ref().ok().map(|secs| duration_from_secs(*secs));

        self.inputs = Some(inputs);
        self.rate = Some(result);

        if new_target != self.target {
            info!(
                from = ?self.target.map(duration_secs),
                to = ?new_target.map(duration_secs),
                "target duration changed"
            );
            self.target = new_target;
            self.clear_run();
        }

        outcome.map(|_| result)
    }

    /// Start or resume. Refuses without a valid target.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<Option<Event>> {
        if self.target.is_none() {
            return Err(CoreError::NoTarget);
        }
        let event = self.clock.start(now);
        if let Some(ref e) = event {
            info!(elapsed_secs = self.clock.elapsed_secs(), "{}", e.kind());
        }
        Ok(event)
    }

    /// Pause; a pause past the deadline finishes the run instead.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let target = self.target?;
        let event = self.clock.pause(now, target);
        if let Some(ref e) = event {
            info!(elapsed_secs = self.clock.elapsed_secs(), "{}", e.kind());
        }
        event
    }

    /// Back to idle; clears the fire record in the same step.
    pub fn reset(&mut self, now: DateTime<Utc>) -> Option<Event> {
        info!("timer reset");
        self.record.clear();
        self.last_zone = None;
        self.clock.reset(now)
    }

    /// One poll cycle: advance the clock, then evaluate alerts against the
    /// post-tick state.
    pub fn poll(&mut self, now: DateTime<Utc>) -> PollOutcome {
        let Some(target) = self.target else {
            return PollOutcome::new(self.snapshot_at(now));
        };

        let mut events = Vec::new();
        if let Some(event) = self.clock.tick(now, target) {
            info!(elapsed_secs = self.clock.elapsed_secs(), "timer finished");
            events.push(event);
        }

        let evaluation = self
            .engine
            .evaluate(self.clock.state(), target, &mut self.record, now);

        if let Some(from) = self.last_zone.filter(|z| *z != evaluation.zone) {
            debug!(%from, to = %evaluation.zone, "zone changed");
            events.push(Event::ZoneChanged {
                from,
                to: evaluation.zone,
                at: now,
            });
        }
        self.last_zone = Some(evaluation.zone);

        PollOutcome {
            effects: evaluation.effects,
            events,
            ..PollOutcome::new(self.snapshot_at(now))
        }
    }

    fn clear_run(&mut self) {
        self.clock = TimerClock::new();
        self.record.clear();
        self.last_zone = None;
    }
}

/// Hand `effects` to `notifier`.
///
/// Outbound messages need a `destination`; without one they are skipped.
/// Delivery failures are logged and returned, never raised.
pub fn dispatch<N: Notifier + ?Sized>(
    effects: &[SideEffect],
    notifier: &N,
    destination: Option<&str>,
) -> Vec<NotifyError> {
    let mut failures = Vec::new();
    for effect in effects {
        match effect {
            SideEffect::PlayCue { zone } => notifier.play_cue(*zone),
            SideEffect::NotifyComplete | SideEffect::NotifyLeadTime { .. } => {
                let Some(message) = effect.message() else {
                    continue;
                };
                let Some(destination) = destination else {
                    debug!("no destination configured, skipping: {message}");
                    continue;
                };
                if let Err(e) = notifier.notify(&message, destination) {
                    warn!("notification failed: {e}");
                    failures.push(e);
                }
            }
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::cell::RefCell;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    fn at(secs: f64) -> DateTime<Utc> {
        t0() + duration_from_secs(secs)
    }

    /// 11 500 lb at 6 720 lb/min.
    fn reference_inputs() -> RateInputs {
        RateInputs::new(80.0, 2.0, 22_500.0, 11_000.0)
    }

    /// Inputs giving exactly 100 s: 1 120 lb at 672 lb/min.
    fn hundred_second_inputs() -> RateInputs {
        RateInputs::new(8.0, 2.0, 2_120.0, 1_000.0)
    }

    #[derive(Default)]
    struct Recorder {
        cues: RefCell<Vec<AlertZone>>,
        sent: RefCell<Vec<(String, String)>>,
        fail: bool,
    }

    impl Notifier for Recorder {
        fn play_cue(&self, zone: AlertZone) {
            self.cues.borrow_mut().push(zone);
        }

        fn notify(&self, message: &str, destination: &str) -> std::result::Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError::NotConfigured("offline".into()));
            }
            self.sent
                .borrow_mut()
                .push((message.to_string(), destination.to_string()));
            Ok(())
        }
    }

    #[test]
    fn start_requires_target() {
        let mut session = Session::new(AlertPolicy::default());
        assert!(matches!(session.start(t0()), Err(CoreError::NoTarget)));

        let err = session
            .set_inputs(RateInputs::new(80.0, 2.0, 10_000.0, 15_000.0))
            .unwrap_err();
        assert!(matches!(err, RateError::InvalidRange { .. }));
        assert!(matches!(session.start(t0()), Err(CoreError::NoTarget)));
        assert_eq!(session.rate().unwrap().mass_to_remove, -5_000.0);
    }

    #[test]
    fn hundred_second_scenario() {
        let mut session = Session::new(AlertPolicy::default());
        let result = session.set_inputs(hundred_second_inputs()).unwrap();
        assert!((result.target_duration_secs.unwrap() - 100.0).abs() < 1e-9);
        assert_eq!(session.target(), Some(Duration::seconds(100)));
        session.start(t0()).unwrap();

        let warn = session.poll(at(96.0));
        assert_eq!(warn.snapshot.zone, Some(AlertZone::Warning));
        assert_eq!(warn.effects, vec![SideEffect::PlayCue { zone: AlertZone::Warning }]);
        assert!(warn.snapshot.banner_text.is_some());

        let done = session.poll(at(100.0));
        assert_eq!(done.snapshot.zone, Some(AlertZone::Complete));
        assert_eq!(done.snapshot.status, TimerStatus::Finished);
        assert!(done.events.iter().any(|e| matches!(e, Event::TimerFinished { .. })));
        assert!(done.effects.contains(&SideEffect::NotifyComplete));

        let after = session.poll(at(104.0));
        assert_eq!(after.snapshot.zone, Some(AlertZone::Complete));
        assert_eq!(after.snapshot.elapsed_secs, 100.0);
        assert!(after.effects.is_empty());
        assert!(after.events.is_empty());
    }

    #[test]
    fn zone_change_events() {
        let mut session = Session::new(AlertPolicy::default());
        session.set_inputs(hundred_second_inputs()).unwrap();
        session.start(t0()).unwrap();
        assert!(session.poll(at(50.0)).events.is_empty());
        let outcome = session.poll(at(97.0));
        assert_eq!(
            outcome.events,
            vec![Event::ZoneChanged {
                from: AlertZone::Safe,
                to: AlertZone::Warning,
                at: at(97.0)
            }]
        );
    }

    #[test]
    fn reset_clears_clock_and_record_together() {
        let policy = AlertPolicy {
            lead_time_secs: Some(10.0),
            ..AlertPolicy::default()
        };
        let mut session = Session::new(policy);
        session.set_inputs(hundred_second_inputs()).unwrap();
        session.start(t0()).unwrap();
        session.poll(at(91.0));
        assert!(session.fire_record().lead_notified);

        assert!(matches!(session.reset(at(95.0)), Some(Event::TimerReset { .. })));
        assert_eq!(session.status(), TimerStatus::Idle);
        assert_eq!(session.fire_record(), &FireRecord::default());

        session.start(at(200.0)).unwrap();
        let again = session.poll(at(291.0));
        assert!(again
            .effects
            .contains(&SideEffect::NotifyLeadTime { lead_time_secs: 10.0 }));
    }

    #[test]
    fn changing_target_resets_run() {
        let mut session = Session::new(AlertPolicy::default());
        session.set_inputs(reference_inputs()).unwrap();
        session.start(t0()).unwrap();
        session.poll(at(30.0));
        assert_eq!(session.timer_state().elapsed_secs(), 30.0);

        // Same inputs: nothing changes.
        session.set_inputs(reference_inputs()).unwrap();
        assert_eq!(session.status(), TimerStatus::Running);

        session.set_inputs(hundred_second_inputs()).unwrap();
        assert_eq!(session.status(), TimerStatus::Idle);
        assert_eq!(session.timer_state().elapsed_secs(), 0.0);
        assert_eq!(session.fire_record(), &FireRecord::default());
    }

    #[test]
    fn invalid_inputs_drop_target() {
        let mut session = Session::new(AlertPolicy::default());
        session.set_inputs(reference_inputs()).unwrap();
        session.start(t0()).unwrap();
        let err = session
            .set_inputs(RateInputs::new(0.0, 2.0, 22_500.0, 11_000.0))
            .unwrap_err();
        assert!(matches!(err, RateError::Incomplete { .. }));
        assert_eq!(session.target(), None);
        assert_eq!(session.status(), TimerStatus::Idle);

        let outcome = session.poll(at(5.0));
        assert_eq!(outcome.snapshot.zone, None);
        assert!(outcome.effects.is_empty());
    }

    #[test]
    fn pause_then_resume_keeps_elapsed() {
        let mut session = Session::new(AlertPolicy::default());
        session.set_inputs(reference_inputs()).unwrap();
        session.start(t0()).unwrap();
        session.poll(at(40.0));
        assert!(session.pause(at(41.0)).is_some());
        assert!(session.pause(at(42.0)).is_none());
        assert_eq!(session.timer_state().elapsed_secs(), 41.0);

        session.start(at(500.0)).unwrap();
        let outcome = session.poll(at(501.0));
        assert_eq!(outcome.snapshot.elapsed_secs, 42.0);
    }

    #[test]
    fn pause_after_deadline_completes_on_next_poll() {
        let mut session = Session::new(AlertPolicy::default());
        session.set_inputs(hundred_second_inputs()).unwrap();
        session.start(t0()).unwrap();
        session.poll(at(99.95));

        let event = session.pause(at(102.0));
        assert!(matches!(event, Some(Event::TimerFinished { .. })));
        assert_eq!(session.status(), TimerStatus::Finished);
        assert_eq!(session.snapshot_at(at(102.0)).elapsed_secs, 100.0);

        let done = session.poll(at(102.1));
        assert_eq!(done.snapshot.zone, Some(AlertZone::Complete));
        assert!(done.effects.contains(&SideEffect::NotifyComplete));
        assert_eq!(done.snapshot.elapsed_secs, 100.0);
    }

    #[test]
    fn pause_without_target_is_noop() {
        let mut session = Session::new(AlertPolicy::default());
        assert!(session.pause(t0()).is_none());
    }

    #[test]
    fn dispatch_routes_effects() {
        let recorder = Recorder::default();
        let effects = vec![
            SideEffect::PlayCue { zone: AlertZone::Complete },
            SideEffect::NotifyComplete,
        ];
        let failures = dispatch(&effects, &recorder, Some("5551234567@vtext.com"));
        assert!(failures.is_empty());
        assert_eq!(*recorder.cues.borrow(), vec![AlertZone::Complete]);
        assert_eq!(
            *recorder.sent.borrow(),
            vec![(
                "Drawdown complete: target mass reached.".to_string(),
                "5551234567@vtext.com".to_string()
            )]
        );
    }

    #[test]
    fn dispatch_without_destination_only_plays_cues() {
        let recorder = Recorder::default();
        let effects = vec![
            SideEffect::PlayCue { zone: AlertZone::Complete },
            SideEffect::NotifyComplete,
        ];
        assert!(dispatch(&effects, &recorder, None).is_empty());
        assert_eq!(recorder.cues.borrow().len(), 1);
        assert!(recorder.sent.borrow().is_empty());
    }

    #[test]
    fn dispatch_failure_does_not_stop_timer() {
        let recorder = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let mut session = Session::new(AlertPolicy::default());
        session.set_inputs(hundred_second_inputs()).unwrap();
        session.start(t0()).unwrap();
        session.poll(at(99.0));
        let done = session.poll(at(100.0));
        let failures = dispatch(&done.effects, &recorder, Some("x@y"));
        assert_eq!(failures.len(), 1);
        assert_eq!(session.status(), TimerStatus::Finished);
    }
}
