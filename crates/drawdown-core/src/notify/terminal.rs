//! Terminal notifier: bell characters for cues, stderr for messages.

use std::io::Write;

use tracing::{info, warn};

use super::Notifier;
use crate::alert::AlertZone;
use crate::error::NotifyError;

/// Rings the terminal bell; prints messages instead of sending them.
#[derive(Debug, Clone)]
pub struct TerminalNotifier {
    audible: bool,
}

impl Default for TerminalNotifier {
    fn default() -> Self {
        Self { audible: true }
    }
}

impl TerminalNotifier {
    pub fn new(audible: bool) -> Self {
        Self { audible }
    }

    /// Bell sequence for `zone`; one bell per severity step.
    pub fn bells(zone: AlertZone) -> String {
        "\x07".repeat(zone.cue_repeats() as usize)
    }
}

impl Notifier for TerminalNotifier {
    fn play_cue(&self, zone: AlertZone) {
        if !self.audible {
            return;
        }
        let mut err = std::io::stderr().lock();
        if let Err(e) = err.write_all(Self::bells(zone).as_bytes()).and_then(|_| err.flush()) {
            warn!("failed to ring terminal bell: {e}");
        }
    }

    fn notify(&self, message: &str, destination: &str) -> Result<(), NotifyError> {
        info!(destination, "notification: {message}");
        eprintln!("[notify -> {destination}] {message}");
        Ok(())
    }
}
