//! IKEv2 / EAP session engine
//!
//! Runtime pieces built on top of `ike-eap-proto`.
//!
//! # Features
//!
//! - Single-flight, timeout-guarded dispatch of EAP messages on Tokio
//! - LRU + TTL cache for EAP-SIM/AKA fast re-authentication contexts
//! - JSON configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use ike_eap_engine::{EapCallback, EapDispatcher, EngineConfig, MessageProcessor};
//! use ike_eap_proto::{EapMethodInfo, EapResult, ErrorCause};
//! use std::sync::Arc;
//!
//! struct Method;
//!
//! impl MessageProcessor for Method {
//!     fn process(&self, _message: &[u8]) -> EapResult {
//!         EapResult::Failure
//!     }
//! }
//!
//! struct Session;
//!
//! impl EapCallback for Session {
//!     fn on_success(&self, _msk: &[u8], _emsk: &[u8], _info: Option<EapMethodInfo>) {}
//!     fn on_fail(&self) {}
//!     fn on_response(&self, _packet: Vec<u8>, _flags: u32) {}
//!     fn on_error(&self, _cause: ErrorCause) {}
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::default();
//!     let dispatcher = EapDispatcher::new(Arc::new(Method), Arc::new(Session))?
//!         .with_timeout(config.dispatch_timeout())
//!         .with_logger(config.logger());
//!
//!     dispatcher.process_message(vec![1, 1, 0, 5, 1])?.await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatcher;
pub mod reauth;

pub use config::{ConfigError, EngineConfig};
pub use dispatcher::{
    DEFAULT_DISPATCH_TIMEOUT, DispatchError, DispatchOutcome, EapCallback, EapDispatcher,
    MessageProcessor,
};
pub use reauth::{ReauthCache, ReauthInfo, ReauthKey, ReauthStore};
