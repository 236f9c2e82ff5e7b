//! IKEv2 / EAP protocol core
//!
//! Building blocks for an IKEv2 initiator that authenticates over EAP.
//!
//! # Features
//!
//! - Keyed MACs for every negotiable PRF and integrity transform
//!   (HMAC-MD5/SHA1/SHA2, AES-XCBC, AES-CMAC)
//! - SKEYSEED generation, PRF+ expansion and IKE/Child SA key schedules
//! - EAP envelope codec and EAP-TTLS framing with fragmentation
//! - A value-typed result for every processed EAP message
//!
//! # Example
//!
//! ```rust
//! use ike_eap_proto::crypto::{Prf, PrfAlgorithm};
//! use ike_eap_proto::eap::ttls::TtlsTypeData;
//!
//! let prf = Prf::new(PrfAlgorithm::HmacSha256);
//! let skeyseed = prf.generate_seed(&[1u8; 16], &[2u8; 16], &[3u8; 32]).unwrap();
//! let keymat = prf.expand(&skeyseed, b"seed", 96).unwrap();
//! assert_eq!(keymat.len(), 96);
//!
//! let ack = TtlsTypeData::acknowledgment();
//! assert!(TtlsTypeData::decode(&ack.encode()).unwrap().is_acknowledgment());
//! ```

pub mod crypto;
pub mod eap;
pub mod logging;
pub mod result;

pub use crypto::{CryptoError, Integrity, IntegrityAlgorithm, KeyedMacPrimitive, Prf, PrfAlgorithm};
pub use eap::ttls::{FragmentStatus, InboundReassembler, OutboundFragmenter, TtlsTypeData};
pub use eap::{EapCode, EapError, EapPacket, EapType};
pub use logging::ProtocolLogger;
pub use result::{EapMethodInfo, EapResult, ErrorCause, RESPONSE_FLAG_EAP_AKA_SERVER_AUTHENTICATED};
