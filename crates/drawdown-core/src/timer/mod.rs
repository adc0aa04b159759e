mod clock;

pub use clock::{duration_from_secs, duration_secs, TimerClock, TimerState, TimerStatus};
