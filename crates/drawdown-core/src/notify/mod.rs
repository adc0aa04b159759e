//! Outbound side effects: audio cues and messages.
//!
//! The core only ever calls through [`Notifier`]; how a cue sounds or how a
//! message reaches a phone is up to the implementation.

mod sms;
mod terminal;
mod webhook;

pub use sms::{sms_gateway_address, Carrier};
pub use terminal::TerminalNotifier;
pub use webhook::WebhookNotifier;

use crate::alert::AlertZone;
use crate::error::NotifyError;

/// Delivery capability the session dispatches side effects to.
pub trait Notifier {
    /// Fire-and-forget audio cue for `zone`.
    fn play_cue(&self, zone: AlertZone);

    /// Send `message` to `destination`. Failures are reported, never fatal.
    fn notify(&self, message: &str, destination: &str) -> Result<(), NotifyError>;
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn play_cue(&self, zone: AlertZone) {
        (**self).play_cue(zone)
    }

    fn notify(&self, message: &str, destination: &str) -> Result<(), NotifyError> {
        (**self).notify(message, destination)
    }
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn play_cue(&self, zone: AlertZone) {
        (**self).play_cue(zone)
    }

    fn notify(&self, message: &str, destination: &str) -> Result<(), NotifyError> {
        (**self).notify(message, destination)
    }
}

/// Plays cues through one notifier and sends messages through another.
pub struct SplitNotifier<C, M> {
    cues: C,
    messages: M,
}

impl<C: Notifier, M: Notifier> SplitNotifier<C, M> {
    pub fn new(cues: C, messages: M) -> Self {
        Self { cues, messages }
    }
}

impl<C: Notifier, M: Notifier> Notifier for SplitNotifier<C, M> {
    fn play_cue(&self, zone: AlertZone) {
        self.cues.play_cue(zone);
    }

    fn notify(&self, message: &str, destination: &str) -> Result<(), NotifyError> {
        self.messages.notify(message, destination)
    }
}
