//! Core error types for drawdown-core.
//!
//! Rate-model errors are user-correctable and block the timer from starting.
//! Notifier errors are reported to the caller but never stop a running
//! countdown. Nothing here is fatal to the process.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for drawdown-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Removal-rate inputs cannot produce a target duration
    #[error("Rate error: {0}")]
    Rate(#[from] RateError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Outbound notification failed
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A command needs a valid target duration and there is none
    #[error("No target duration: enter flow rate, concentration and masses first")]
    NoTarget,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reasons the rate model refuses to produce a target duration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RateError {
    /// Target mass is above the current mass.
    #[error("target mass exceeds start mass by {excess}")]
    InvalidRange { excess: f64 },

    /// Removal rate or mass to remove is zero.
    #[error("insufficient input: removal rate {mass_removal_rate}/min, mass to remove {mass_to_remove}")]
    Incomplete {
        mass_removal_rate: f64,
        mass_to_remove: f64,
    },

    /// A field is negative, NaN or infinite.
    #[error("invalid value for '{field}': {value}")]
    InvalidInput { field: &'static str, value: f64 },
}

/// Delivery failures reported by a [`Notifier`](crate::notify::Notifier).
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The relay answered with a non-success status
    #[error("delivery to {destination} failed (HTTP {status}): {body}")]
    Rejected {
        destination: String,
        status: u16,
        body: String,
    },

    /// Transport-level failure
    #[error("delivery to {destination} failed: {source}")]
    Transport {
        destination: String,
        #[source]
        source: reqwest::Error,
    },

    /// Notifier has no endpoint configured
    #[error("notifier not configured: {0}")]
    NotConfigured(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Home or config directory could not be resolved
    #[error("Configuration directory unavailable: {0}")]
    NoDataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Unknown carrier name
    #[error("Unknown carrier '{0}' (see `drawdown carriers`)")]
    UnknownCarrier(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
