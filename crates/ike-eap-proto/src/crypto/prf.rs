//! IKEv2 pseudorandom function (RFC 7296 Section 2.13, 2.14, 2.18)
//!
//! ```text
//! SKEYSEED          = prf(Ni | Nr, g^ir)
//! SKEYSEED (rekey)  = prf(SK_d (old), g^ir (new) | Ni | Nr)
//! prf+ (K,S)        = T1 | T2 | T3 | ...
//!   T1 = prf (K, S | 0x01)
//!   T2 = prf (K, T1 | S | 0x02)
//! ```
//!
//! For AES-XCBC-PRF-128 and AES-CMAC-PRF-128 only the first 64 bits of each
//! nonce are used as the SKEYSEED key.

use super::CryptoError;
use super::algorithm::{AlgorithmDescriptor, PrfAlgorithm};
use super::mac::KeyedMacPrimitive;

/// Number of nonce bytes used by the block-cipher PRFs when computing SKEYSEED
pub const TRUNCATED_NONCE_LEN: usize = 8;

/// The PRF+ counter is a single octet
pub const MAX_PRF_PLUS_ITERATIONS: usize = 255;

/// A negotiated PRF
///
/// Holds no key material; every derived value is returned to the caller.
#[derive(Debug)]
pub struct Prf {
    algorithm: PrfAlgorithm,
    mac: KeyedMacPrimitive,
}

impl Prf {
    /// Create a PRF for `algorithm`
    pub fn new(algorithm: PrfAlgorithm) -> Self {
        Prf {
            algorithm,
            mac: KeyedMacPrimitive::new(algorithm.mac_algorithm()),
        }
    }

    /// Create a PRF from a negotiated transform identifier
    pub fn from_transform_id(id: u16) -> Result<Self, CryptoError> {
        Ok(Self::new(PrfAlgorithm::from_transform_id(id)?))
    }

    pub fn algorithm(&self) -> PrfAlgorithm {
        self.algorithm
    }

    pub fn descriptor(&self) -> AlgorithmDescriptor {
        self.algorithm.descriptor()
    }

    /// Preferred key length; also the length of SK_d, SK_pi and SK_pr
    pub fn key_length(&self) -> usize {
        self.algorithm.descriptor().key_length
    }

    /// Length of a single PRF output block
    pub fn output_length(&self) -> usize {
        self.mac.output_length()
    }

    /// prf(key, data)
    pub fn sign(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.mac.sign(key, data)
    }

    /// Compute SKEYSEED for a new IKE SA
    pub fn generate_seed(
        &self,
        nonce_init: &[u8],
        nonce_resp: &[u8],
        shared_secret: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let key = if self.algorithm.is_key_normalized() {
            let mut key = Vec::with_capacity(2 * TRUNCATED_NONCE_LEN);
            key.extend_from_slice(truncated_nonce(nonce_init)?);
            key.extend_from_slice(truncated_nonce(nonce_resp)?);
            key
        } else {
            let mut key = Vec::with_capacity(nonce_init.len() + nonce_resp.len());
            key.extend_from_slice(nonce_init);
            key.extend_from_slice(nonce_resp);
            key
        };

        self.sign(&key, shared_secret)
    }

    /// Compute SKEYSEED when rekeying an IKE SA
    ///
    /// `previous_sk_d` is SK_d of the SA being rekeyed; `self` must be the PRF
    /// negotiated for that old SA.
    pub fn generate_rekeyed_seed(
        &self,
        previous_sk_d: &[u8],
        nonce_init: &[u8],
        nonce_resp: &[u8],
        shared_secret: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let mut data =
            Vec::with_capacity(shared_secret.len() + nonce_init.len() + nonce_resp.len());
        data.extend_from_slice(shared_secret);
        data.extend_from_slice(nonce_init);
        data.extend_from_slice(nonce_resp);

        self.sign(previous_sk_d, &data)
    }

    /// prf+ (K, S), truncated to exactly `output_length` bytes
    pub fn expand(
        &self,
        key: &[u8],
        seed: &[u8],
        output_length: usize,
    ) -> Result<Vec<u8>, CryptoError> {
        if output_length == 0 {
            return Err(CryptoError::InvalidOutputLength(0));
        }
        let max = MAX_PRF_PLUS_ITERATIONS * self.output_length();
        if output_length > max {
            return Err(CryptoError::OutputTooLong {
                requested: output_length,
                max,
            });
        }

        let mut output = Vec::with_capacity(output_length + self.output_length());
        let mut previous: Vec<u8> = Vec::new();
        let mut counter: u8 = 1;

        while output.len() < output_length {
            let mut data = Vec::with_capacity(previous.len() + seed.len() + 1);
            data.extend_from_slice(&previous);
            data.extend_from_slice(seed);
            data.push(counter);

            previous = self.sign(key, &data)?;
            output.extend_from_slice(&previous);
            counter = counter.wrapping_add(1);
        }

        output.truncate(output_length);
        Ok(output)
    }
}

fn truncated_nonce(nonce: &[u8]) -> Result<&[u8], CryptoError> {
    nonce
        .get(..TRUNCATED_NONCE_LEN)
        .ok_or(CryptoError::NonceTooShort {
            required: TRUNCATED_NONCE_LEN,
            actual: nonce.len(),
        })
}
