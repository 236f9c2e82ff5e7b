use ike_eap_proto::ProtocolLogger;
use ike_eap_proto::eap::ttls::OutboundFragmenter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::dispatcher::DEFAULT_DISPATCH_TIMEOUT;
use crate::reauth::{DEFAULT_REAUTH_CAPACITY, DEFAULT_REAUTH_TTL, MAX_REAUTH_TTL};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Deadline for processing one EAP message, in milliseconds (default: 7000)
    #[serde(default = "default_dispatch_timeout_ms")]
    pub dispatch_timeout_ms: u64,

    /// Maximum EAP-TTLS payload bytes per outbound frame (default: 1024)
    #[serde(default = "default_ttls_fragment_size")]
    pub ttls_fragment_size: usize,

    /// Maximum number of cached re-authentication contexts (default: 10)
    #[serde(default = "default_reauth_cache_capacity")]
    pub reauth_cache_capacity: usize,

    /// Re-authentication context lifetime in seconds (default: 12 hours)
    #[serde(default = "default_reauth_ttl_secs")]
    pub reauth_ttl_secs: u64,

    /// Log level: "trace", "debug", "info", "warn", "error" (default: "info")
    #[serde(default)]
    pub log_level: Option<String>,

    /// Enable verbose protocol diagnostics
    #[serde(default)]
    pub verbose: bool,

    /// Log identities and key material in clear. Only honoured with `verbose`.
    #[serde(default)]
    pub log_sensitive: bool,
}

fn default_dispatch_timeout_ms() -> u64 {
    DEFAULT_DISPATCH_TIMEOUT.as_millis() as u64
}

fn default_ttls_fragment_size() -> usize {
    ike_eap_proto::eap::ttls::DEFAULT_FRAGMENT_SIZE
}

fn default_reauth_cache_capacity() -> usize {
    DEFAULT_REAUTH_CAPACITY
}

fn default_reauth_ttl_secs() -> u64 {
    DEFAULT_REAUTH_TTL.as_secs()
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            dispatch_timeout_ms: default_dispatch_timeout_ms(),
            ttls_fragment_size: default_ttls_fragment_size(),
            reauth_cache_capacity: default_reauth_cache_capacity(),
            reauth_ttl_secs: default_reauth_ttl_secs(),
            log_level: None,
            verbose: false,
            log_sensitive: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatch_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "Dispatch timeout cannot be 0".to_string(),
            ));
        }

        if self.ttls_fragment_size == 0 {
            return Err(ConfigError::Invalid(
                "TTLS fragment size cannot be 0".to_string(),
            ));
        }

        if self.reauth_cache_capacity == 0 {
            return Err(ConfigError::Invalid(
                "Re-authentication cache capacity cannot be 0".to_string(),
            ));
        }

        if self.reauth_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "Re-authentication TTL cannot be 0".to_string(),
            ));
        }

        if self.reauth_ttl_secs > MAX_REAUTH_TTL.as_secs() {
            return Err(ConfigError::Invalid(format!(
                "Re-authentication TTL cannot exceed {} seconds",
                MAX_REAUTH_TTL.as_secs()
            )));
        }

        if let Some(ref level) = self.log_level
            && !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str())
        {
            return Err(ConfigError::Invalid(format!("Unknown log level: {}", level)));
        }

        Ok(())
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }

    pub fn reauth_ttl(&self) -> Duration {
        Duration::from_secs(self.reauth_ttl_secs)
    }

    /// Effective tracing filter directive
    pub fn log_level(&self) -> &str {
        match self.log_level {
            Some(ref level) => level.as_str(),
            None if self.verbose => "debug",
            None => "info",
        }
    }

    pub fn logger(&self) -> ProtocolLogger {
        ProtocolLogger::new(self.verbose, self.log_sensitive)
    }

    pub fn fragmenter(&self) -> Result<OutboundFragmenter, ConfigError> {
        OutboundFragmenter::new(self.ttls_fragment_size)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Create an example configuration
    pub fn example() -> Self {
        EngineConfig {
            log_level: Some("info".to_string()),
            ..Self::default()
        }
    }
}
