//! Engine configuration

use std::time::Duration;
use thiserror::Error;

/// Timing and retry parameters shared by every session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// How long to wait for a keypress before the timeout fires
    pub input_timeout: Duration,
    /// Consecutive failures (invalid key or silence) before escalation
    pub max_retries: u32,
    /// Initial training-mode flag for new sessions
    pub training_mode: bool,
    /// Added to `input_timeout` while training mode is on
    pub training_delay: Duration,
    /// Upper bound on a single text-to-speech request
    pub speech_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            input_timeout: Duration::from_secs(8),
            max_retries: 3,
            training_mode: false,
            training_delay: Duration::from_secs(4),
            speech_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl EngineConfig {
    /// Read overrides from `IVR_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source; unset variables keep defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(ms) = parse_var(&lookup, "IVR_INPUT_TIMEOUT_MS", "milliseconds")? {
            config.input_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, "IVR_TRAINING_DELAY_MS", "milliseconds")? {
            config.training_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, "IVR_SPEECH_TIMEOUT_MS", "milliseconds")? {
            config.speech_timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = parse_var(&lookup, "IVR_MAX_RETRIES", "a retry count")? {
            config.max_retries = retries;
        }
        if let Some(value) = lookup("IVR_TRAINING_MODE") {
            config.training_mode = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "IVR_TRAINING_MODE",
                        value,
                        expected: "a boolean",
                    })
                }
            };
        }

        Ok(config)
    }

    /// Wait applied to the next armed input timer
    pub fn effective_timeout(&self, training_mode: bool) -> Duration {
        if training_mode {
            self.input_timeout + self.training_delay
        } else {
            self.input_timeout
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(var)
        .map(|value| {
            value.trim().parse().map_err(|_| ConfigError::Invalid {
                var,
                value,
                expected,
            })
        })
        .transpose()
}
