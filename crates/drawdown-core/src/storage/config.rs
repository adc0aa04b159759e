//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Alert thresholds and cue rate limits
//! - Poll cadence of the countdown loop
//! - Notification contact (phone + carrier, or a relay webhook)
//! - Default removal inputs
//!
//! Configuration is stored at `~/.config/drawdown/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use super::data_dir;
use crate::alert::AlertPolicy;
use crate::error::ConfigError;
use crate::notify::{sms_gateway_address, Carrier};
use crate::rate::RateInputs;

/// Countdown loop configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Delay between polls while running.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// How often the CLI prints a status line.
    #[serde(default = "default_status_interval")]
    pub status_interval_secs: f64,
}

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Ring the terminal bell on cues.
    #[serde(default = "default_true")]
    pub audible_cue: bool,
    /// Phone number for SMS-gateway messages.
    #[serde(default)]
    pub phone: Option<String>,
    /// Carrier name, see [`Carrier`].
    #[serde(default)]
    pub carrier: Option<String>,
    /// Relay endpoint that delivers outbound messages.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/drawdown/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub alerts: AlertPolicy,
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    /// Defaults for `drawdown run` / `drawdown plan` when flags are omitted.
    #[serde(default = "default_inputs")]
    pub inputs: RateInputs,
}

// Default functions
fn default_poll_interval_ms() -> u64 {
    100
}
fn default_status_interval() -> f64 {
    1.0
}
fn default_true() -> bool {
    true
}
fn default_inputs() -> RateInputs {
    RateInputs::new(80.0, 2.0, 22_500.0, 11_000.0)
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            status_interval_secs: default_status_interval(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            audible_cue: true,
            phone: None,
            carrier: None,
            webhook_url: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alerts: AlertPolicy::default(),
            timer: TimerConfig::default(),
            notifications: NotificationsConfig::default(),
            inputs: default_inputs(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Candidate JSON values for `value`, given the value currently at the
    /// key. Optional fields serialize as null, so their type is unknown and
    /// several candidates are tried in order.
    fn candidate_values(
        existing: &serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<Vec<serde_json::Value>, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        if value.eq_ignore_ascii_case("none") {
            return Ok(vec![serde_json::Value::Null]);
        }
        let candidates = match existing {
            serde_json::Value::Bool(_) => vec![serde_json::Value::Bool(
                value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
            )],
            serde_json::Value::Number(_) => vec![parse_number(value)
                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?],
            serde_json::Value::Null => parse_number(value)
                .into_iter()
                .chain(std::iter::once(serde_json::Value::String(value.into())))
                .collect(),
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                vec![serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?]
            }
            serde_json::Value::String(_) => vec![serde_json::Value::String(value.into())],
        };
        Ok(candidates)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        new_value: serde_json::Value,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        if key.is_empty() {
            return Err(unknown());
        }

        let mut parts = key.split('.').peekable();
        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                if !obj.contains_key(part) {
                    return Err(unknown());
                }
                obj.insert(part.to_string(), new_value);
                return Ok(());
            }
            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default location, `<data_dir>/config.toml`.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key, in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the resulting config fails validation. `self` is left untouched
    /// on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        let existing = Self::get_json_value_by_path(&json, key)
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

        let mut last_error = None;
        for candidate in Self::candidate_values(existing, key, value)? {
            let mut attempt = json.clone();
            Self::set_json_value_by_path(&mut attempt, key, candidate)?;
            match serde_json::from_value::<Config>(attempt) {
                Ok(updated) => {
                    updated.validate()?;
                    *self = updated;
                    return Ok(());
                }
                Err(e) => last_error = Some(e),
            }
        }
        Err(invalid(
            last_error.map(|e| e.to_string()).unwrap_or_default(),
        ))
    }

    /// Check ranges, URLs and the phone/carrier pair.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let alerts = &self.alerts;
        let seconds = [
            ("alerts.warning_threshold_secs", alerts.warning_threshold_secs),
            ("alerts.warning_cue_interval_secs", alerts.warning_cue_interval_secs),
            ("alerts.critical_cue_interval_secs", alerts.critical_cue_interval_secs),
            ("alerts.lead_time_epsilon_secs", alerts.lead_time_epsilon_secs),
            ("timer.status_interval_secs", self.timer.status_interval_secs),
        ];
        for (key, value) in seconds {
            check_seconds(key, value)?;
        }
        if let Some(lead) = alerts.lead_time_secs {
            check_seconds("alerts.lead_time_secs", lead)?;
        }
        if self.timer.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timer.poll_interval_ms".into(),
                message: "must be greater than zero".into(),
            });
        }
        if let Some(ref raw) = self.notifications.webhook_url {
            url::Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
                key: "notifications.webhook_url".into(),
                message: e.to_string(),
            })?;
        }
        if let Some(ref name) = self.notifications.carrier {
            name.parse::<Carrier>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "notifications.carrier".into(),
                    message: e.to_string(),
                })?;
        }
        self.inputs
            .validate()
            .map_err(|e| ConfigError::InvalidValue {
                key: "inputs".into(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    /// SMS-gateway address from `phone` + `carrier`, if both are set.
    pub fn sms_destination(&self) -> Result<Option<String>, ConfigError> {
        let (Some(phone), Some(carrier)) = (
            self.notifications.phone.as_deref(),
            self.notifications.carrier.as_deref(),
        ) else {
            return Ok(None);
        };
        let invalid = |message: String| ConfigError::InvalidValue {
            key: "notifications.phone".into(),
            message,
        };
        let carrier = carrier.parse::<Carrier>().map_err(|e| invalid(e.to_string()))?;
        sms_gateway_address(phone, carrier)
            .map(Some)
            .map_err(|e| invalid(e.to_string()))
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            warn!("config unavailable, using defaults: {e}");
            Self::default()
        })
    }
}

fn parse_number(value: &str) -> Option<serde_json::Value> {
    if let Ok(n) = value.parse::<u64>() {
        Some(serde_json::Value::Number(n.into()))
    } else {
        value
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
    }
}

fn check_seconds(key: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a non-negative number of seconds, got {value}"),
        })
    }
}
