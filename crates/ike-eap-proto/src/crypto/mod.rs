//! IKEv2 cryptographic core
//!
//! - [`algorithm`]: transform identifiers and descriptors
//! - [`mac`]: keyed MAC strategies (HMAC, AES-CMAC, AES-XCBC)
//! - [`prf`]: SKEYSEED generation and PRF+ expansion
//! - [`integrity`]: truncated integrity checksums
//! - [`keymat`]: IKE SA / Child SA key schedules and PSK auth data

pub mod algorithm;
pub mod integrity;
pub mod keymat;
pub mod mac;
pub mod prf;

pub use algorithm::{AlgorithmDescriptor, IntegrityAlgorithm, MacAlgorithm, PrfAlgorithm, Primitive};
pub use integrity::Integrity;
pub use keymat::{ChildSaKeys, IkeSaKeys};
pub use mac::{KeyedMac, KeyedMacPrimitive};
pub use prf::Prf;

use thiserror::Error;

/// Cryptographic errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Unsupported {kind} algorithm: {id}")]
    UnsupportedAlgorithm { kind: &'static str, id: u16 },

    #[error("Invalid key length for {algorithm}: {length} bytes")]
    InvalidKeyLength {
        algorithm: &'static str,
        length: usize,
    },

    #[error("Nonce too short: need at least {required} bytes, got {actual}")]
    NonceTooShort { required: usize, actual: usize },

    #[error("Invalid output length: {0}")]
    InvalidOutputLength(usize),

    #[error("Requested {requested} bytes of keying material, maximum is {max}")]
    OutputTooLong { requested: usize, max: usize },

    #[error("Crypto provider error: {0}")]
    Provider(String),
}
