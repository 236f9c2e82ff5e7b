//! Outcome of processing one EAP message
//!
//! Every inbound message produces exactly one [`EapResult`]. Codec, crypto
//! and runtime failures are carried as values in [`EapResult::Error`] so that
//! nothing unwinds past the worker that computed the result.

use crate::crypto::CryptoError;
use crate::eap::{EapError, EapPacket, EapType};
use std::time::Duration;
use thiserror::Error;
use zeroize::Zeroizing;

/// Set on a Response when EAP-AKA has authenticated the server
pub const RESPONSE_FLAG_EAP_AKA_SERVER_AUTHENTICATED: u32 = 1 << 0;

/// Method-specific data reported alongside a successful authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EapMethodInfo {
    pub eap_type: EapType,
    /// Re-authentication identity to present on the next fast re-auth
    pub reauth_id: Option<Vec<u8>>,
}

impl EapMethodInfo {
    pub fn new(eap_type: EapType) -> Self {
        EapMethodInfo {
            eap_type,
            reauth_id: None,
        }
    }

    pub fn with_reauth_id(mut self, reauth_id: impl Into<Vec<u8>>) -> Self {
        self.reauth_id = Some(reauth_id.into());
        self
    }
}

/// Why a message produced no usable result
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ErrorCause {
    #[error("Decode error: {0}")]
    Decode(#[from] EapError),

    /// An outbound packet that could not be serialised
    #[error("Encode error: {0}")]
    Encode(EapError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A panic caught while computing the result
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ErrorCause {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ErrorCause::Timeout(_))
    }
}

/// Terminal outcome for one processed message
#[derive(Clone, PartialEq, Eq)]
pub enum EapResult {
    /// Authentication completed
    Success {
        msk: Zeroizing<Vec<u8>>,
        emsk: Zeroizing<Vec<u8>>,
        info: Option<EapMethodInfo>,
    },
    /// Authentication rejected
    Failure,
    /// An encoded EAP packet to send to the peer
    Response { packet: Vec<u8>, flags: u32 },
    Error(ErrorCause),
}

impl EapResult {
    pub fn success(msk: Vec<u8>, emsk: Vec<u8>, info: Option<EapMethodInfo>) -> Self {
        EapResult::Success {
            msk: Zeroizing::new(msk),
            emsk: Zeroizing::new(emsk),
            info,
        }
    }

    pub fn response(packet: Vec<u8>, flags: u32) -> Self {
        EapResult::Response { packet, flags }
    }

    /// Encode `packet` into a Response, or an Error if it cannot be encoded
    pub fn from_packet(packet: &EapPacket, flags: u32) -> Self {
        match packet.to_bytes() {
            Ok(bytes) => EapResult::response(bytes, flags),
            Err(e) => EapResult::Error(ErrorCause::Encode(e)),
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            EapResult::Success { .. } => "success",
            EapResult::Failure => "failure",
            EapResult::Response { .. } => "response",
            EapResult::Error(_) => "error",
        }
    }
}

impl std::fmt::Debug for EapResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EapResult::Success { msk, emsk, info } => f
                .debug_struct("Success")
                .field("msk_len", &msk.len())
                .field("emsk_len", &emsk.len())
                .field("info", info)
                .finish(),
            EapResult::Failure => f.write_str("Failure"),
            EapResult::Response { packet, flags } => f
                .debug_struct("Response")
                .field("packet_len", &packet.len())
                .field("flags", flags)
                .finish(),
            EapResult::Error(cause) => f.debug_tuple("Error").field(cause).finish(),
        }
    }
}

impl From<ErrorCause> for EapResult {
    fn from(cause: ErrorCause) -> Self {
        EapResult::Error(cause)
    }
}

impl From<EapError> for EapResult {
    fn from(err: EapError) -> Self {
        EapResult::Error(err.into())
    }
}

impl From<CryptoError> for EapResult {
    fn from(err: CryptoError) -> Self {
        EapResult::Error(err.into())
    }
}
