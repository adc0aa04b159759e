//! # Drawdown Core Library
//!
//! This library provides the core logic for Drawdown, a countdown that tells
//! an operator how long to keep removing material at a fixed delivery rate,
//! and alerts them as the deadline approaches and passes.
//!
//! ## Architecture
//!
//! - **Rate Model**: Pure conversion of flow rate, concentration and masses
//!   into a target duration
//! - **Timer Clock**: A wall-clock-based state machine that requires the
//!   caller to periodically invoke `tick()` for progress updates
//! - **Alert Engine**: Zone classification and rate-limited, at-most-once
//!   side-effect decisions
//! - **Notifiers**: Terminal bell and HTTP relay implementations of the
//!   delivery interface
//!
//! ## Key Components
//!
//! - [`Session`]: Explicit owner of the clock, fire record and target
//! - [`PollLoop`]: Host-side scheduler driving a session
//! - [`Config`]: Application configuration management
//! - [`Notifier`]: Trait for cue and message delivery

pub mod alert;
pub mod error;
pub mod events;
pub mod notify;
pub mod rate;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod timer;

pub use alert::{AlertEngine, AlertPolicy, AlertZone, Evaluation, FireRecord, SideEffect};
pub use error::{ConfigError, CoreError, NotifyError, RateError, ValidationError};
pub use events::Event;
pub use notify::{sms_gateway_address, Carrier, Notifier, SplitNotifier, TerminalNotifier, WebhookNotifier};
pub use rate::{compute, RateInputs, RateResult, VOLUME_TO_MASS_FACTOR};
pub use scheduler::{Clock, Command, LoopExit, ManualClock, PollLoop, SystemClock};
pub use session::{dispatch, PollOutcome, Session, Snapshot};
pub use storage::Config;
pub use timer::{TimerClock, TimerState, TimerStatus};
