//! Countdown zones and the side-effect policy.
//!
//! The engine only reads a [`TimerState`](crate::timer::TimerState) and
//! returns the effects the host should dispatch; it never touches the clock.

mod engine;
mod zone;

pub use engine::{AlertEngine, AlertPolicy, Evaluation, FireRecord, SideEffect};
pub use zone::AlertZone;
