//! Protocol log sink
//!
//! Thin layer over `tracing` that tags every event with a component prefix and
//! keeps identities and key material out of the logs. Sensitive bytes are
//! rendered as a SHA-256 digest unless both verbose and sensitive logging are
//! enabled.

use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

/// Log sink shared by the EAP method and IKE components
#[derive(Debug, Clone, Default)]
pub struct ProtocolLogger {
    verbose: bool,
    log_sensitive: bool,
}

impl ProtocolLogger {
    pub fn new(verbose: bool, log_sensitive: bool) -> Self {
        ProtocolLogger {
            verbose,
            log_sensitive,
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Whether raw sensitive bytes may appear in the output
    pub fn reveals_sensitive(&self) -> bool {
        self.verbose && self.log_sensitive
    }

    /// Render bytes that may identify a subscriber or carry key material
    pub fn pii(&self, bytes: &[u8]) -> String {
        if self.reveals_sensitive() {
            hex::encode(bytes)
        } else {
            format!("sha256:{}", hex::encode(Sha256::digest(bytes)))
        }
    }

    pub fn pii_str(&self, value: &str) -> String {
        self.pii(value.as_bytes())
    }

    /// Verbose-only diagnostics
    pub fn debug(&self, prefix: &str, message: &str) {
        if self.verbose {
            debug!(prefix = prefix, "{}", message);
        }
    }

    pub fn info(&self, prefix: &str, message: &str) {
        info!(prefix = prefix, "{}", message);
    }

    pub fn warn(&self, prefix: &str, message: &str) {
        warn!(prefix = prefix, "{}", message);
    }

    pub fn error(&self, prefix: &str, message: &str, cause: Option<&dyn std::error::Error>) {
        match cause {
            Some(cause) => error!(prefix = prefix, cause = %cause, "{}", message),
            None => error!(prefix = prefix, "{}", message),
        }
    }
}
