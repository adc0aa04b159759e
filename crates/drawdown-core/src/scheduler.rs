//! Host-side driving loop.
//!
//! The core never runs its own thread. [`PollLoop`] is the scheduler a host
//! uses instead: it applies queued commands, polls the session at a bounded
//! cadence while running, dispatches side effects, and blocks on the command
//! channel while idle or paused so nothing is polled then.

use std::cell::Cell;
use std::sync::mpsc::{Receiver, TryRecvError};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::events::Event;
use crate::notify::Notifier;
use crate::rate::RateInputs;
use crate::session::{dispatch, PollOutcome, Session};
use crate::timer::{duration_secs, TimerStatus};

/// Source of wall-clock time, and the way the loop waits between polls.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    fn sleep(&self, duration: std::time::Duration);
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: std::time::Duration) {
        std::thread::sleep(duration);
    }
}

/// Test clock: `sleep` advances time instantly.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn sleep(&self, duration: std::time::Duration) {
        let step = chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());
        self.advance(step);
    }
}

/// Operator commands, applied between poll cycles.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Start or resume.
    Start,
    Pause,
    Reset,
    SetInputs(RateInputs),
    Quit,
}

/// Why [`PollLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Finished,
    Quit,
    /// Command channel closed while nothing was running.
    Disconnected,
}

pub struct PollLoop<C, N> {
    clock: C,
    notifier: N,
    destination: Option<String>,
    interval: std::time::Duration,
}

impl<C: Clock, N: Notifier> PollLoop<C, N> {
    pub fn new(clock: C, notifier: N, interval: std::time::Duration) -> Self {
        Self {
            clock,
            notifier,
            destination: None,
            interval,
        }
    }

    /// Where outbound messages go; without one they are skipped.
    pub fn with_destination(mut self, destination: Option<String>) -> Self {
        self.destination = destination;
        self
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Drive `session` until it finishes, a `Quit` arrives, or the channel
    /// closes while idle or paused. `observe` sees every cycle and every
    /// command outcome.
    pub fn run<F>(&self, session: &mut Session, commands: &Receiver<Command>, mut observe: F) -> LoopExit
    where
        F: FnMut(&PollOutcome),
    {
        loop {
            // Apply everything queued since the last cycle.
            loop {
                let command = match commands.try_recv() {
                    Ok(command) => command,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) if needs_poll(session) => break,
                    Err(TryRecvError::Disconnected) => return LoopExit::Disconnected,
                };
                if self.apply(session, command, &mut observe) {
                    return LoopExit::Quit;
                }
            }

            if needs_poll(session) {
                let mut outcome = session.poll(self.clock.now());
                outcome.failures =
                    dispatch(&outcome.effects, &self.notifier, self.destination.as_deref());
                observe(&outcome);
                if outcome.snapshot.status == TimerStatus::Finished {
                    return LoopExit::Finished;
                }
                self.clock.sleep(self.interval);
            } else {
                // Idle or paused: wait for the next command instead of polling.
                match commands.recv() {
                    Ok(command) => {
                        if self.apply(session, command, &mut observe) {
                            return LoopExit::Quit;
                        }
                    }
                    Err(_) => return LoopExit::Disconnected,
                }
            }
        }
    }

    /// Returns `true` on `Quit`.
    fn apply<F>(&self, session: &mut Session, command: Command, observe: &mut F) -> bool
    where
        F: FnMut(&PollOutcome),
    {
        debug!(?command, "applying command");
        let now = self.clock.now();
        let mut input_error = None;
        let event: Option<Event> = match command {
            Command::Start => match session.start(now) {
                Ok(event) => event,
                Err(e) => {
                    warn!("cannot start: {e}");
                    None
                }
            },
            Command::Pause => session.pause(now),
            Command::Reset => session.reset(now),
            Command::SetInputs(inputs) => {
                let before = session.target();
                if let Err(e) = session.set_inputs(inputs) {
                    warn!("inputs rejected: {e}");
                    input_error = Some(e);
                }
                let after = session.target();
                (before != after).then(|| Event::TargetChanged {
                    target_duration_secs: after.map(duration_secs),
                    at: now,
                })
            }
            Command::Quit => return true,
        };
        observe(&PollOutcome {
            events: event.into_iter().collect(),
            input_error,
            ..PollOutcome::new(session.snapshot_at(now))
        });
        false
    }
}

/// Running, or finished by a command and still owed its completion poll.
fn needs_poll(session: &Session) -> bool {
    matches!(session.status(), TimerStatus::Running | TimerStatus::Finished)
}
