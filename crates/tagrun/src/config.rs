//! Peer configuration.

use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

const ENV_TIMEOUT_MS: &str = "TAGRUN_DEFAULT_TIMEOUT_MS";
const ENV_MAX_MESSAGE_SIZE: &str = "TAGRUN_MAX_MESSAGE_SIZE";

#[derive(Debug, thiserror::Error)]
#[error("invalid value {value:?} for {key}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// Used in logs and handed to handlers through their call context.
    pub name: String,
    /// Deadline for calls made with a zero timeout.
    pub default_timeout: Duration,
    /// Largest encoded message this peer will send.
    pub max_message_size: usize,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            name: "peer".into(),
            default_timeout: DEFAULT_TIMEOUT,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl PeerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }

    /// Starts from the defaults and applies `TAGRUN_DEFAULT_TIMEOUT_MS` and
    /// `TAGRUN_MAX_MESSAGE_SIZE` when they are set.
    pub fn from_env(name: impl Into<String>) -> Result<Self, ConfigError> {
        Self::new(name).apply(|key| std::env::var(key).ok())
    }

    fn apply(mut self, lookup: impl Fn(&'static str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(ENV_TIMEOUT_MS) {
            let ms = parse(ENV_TIMEOUT_MS, value)?;
            self.default_timeout = Duration::from_millis(ms);
        }
        if let Some(value) = lookup(ENV_MAX_MESSAGE_SIZE) {
            self.max_message_size = parse(ENV_MAX_MESSAGE_SIZE, value)?;
        }
        Ok(self)
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError { key, value })
}
