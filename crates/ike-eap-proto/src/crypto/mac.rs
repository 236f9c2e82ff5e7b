//! Keyed MAC primitives
//!
//! One `sign(key, data)` contract over every negotiated MAC. HMAC and AES-CMAC
//! delegate to the RustCrypto implementations; AES-XCBC has no library
//! implementation and is built here on the AES block cipher (RFC 3566).
//!
//! Key normalization for the PRF-128 forms:
//!
//! - AES-XCBC-PRF-128 (RFC 4434): keys shorter than 16 bytes are right-padded
//!   with zeros, longer keys are replaced by `AES-XCBC-MAC(0^16, key)`.
//! - AES-CMAC-PRF-128 (RFC 4615): any key that is not 16 bytes is replaced by
//!   `AES-CMAC(0^16, key)`.

use super::CryptoError;
use super::algorithm::{MacAlgorithm, Primitive};
use aes::Aes128;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use cmac::Cmac;
use hmac::{Hmac, Mac};
use md5_digest::Md5;
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use std::marker::PhantomData;
use subtle::ConstantTimeEq;

/// AES block and key size
pub const AES_BLOCK_SIZE: usize = 16;

/// A keyed MAC strategy
pub trait KeyedMac: Send + Sync {
    /// Compute the MAC of `data` under `key`
    fn sign(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// HMAC and CMAC through the RustCrypto `Mac` trait
struct LibraryMac<M> {
    algorithm: &'static str,
    _mac: PhantomData<fn() -> M>,
}

impl<M> LibraryMac<M> {
    fn new(algorithm: &'static str) -> Self {
        LibraryMac {
            algorithm,
            _mac: PhantomData,
        }
    }
}

impl<M> KeyedMac for LibraryMac<M>
where
    M: Mac + KeyInit,
{
    fn sign(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut mac = <M as Mac>::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
            algorithm: self.algorithm,
            length: key.len(),
        })?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// AES-CMAC-PRF-128
struct CmacPrf;

impl KeyedMac for CmacPrf {
    fn sign(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let key = normalize_cmac_key(key)?;
        aes_cmac(&key, data)
    }
}

/// AES-XCBC-MAC, optionally with PRF-128 key normalization
struct Xcbc {
    normalize: bool,
}

impl KeyedMac for Xcbc {
    fn sign(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if self.normalize {
            let key = normalize_xcbc_key(key)?;
            aes_xcbc_mac(&key, data)
        } else {
            aes_xcbc_mac(key, data)
        }
    }
}

/// A keyed MAC bound to one negotiated algorithm
///
/// Built once from a [`MacAlgorithm`]; stateless afterwards.
pub struct KeyedMacPrimitive {
    algorithm: MacAlgorithm,
    inner: Box<dyn KeyedMac>,
}

impl std::fmt::Debug for KeyedMacPrimitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedMacPrimitive")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl KeyedMacPrimitive {
    /// Build the strategy for `algorithm`
    pub fn new(algorithm: MacAlgorithm) -> Self {
        let inner: Box<dyn KeyedMac> = match algorithm {
            MacAlgorithm::HmacMd5 => Box::new(LibraryMac::<Hmac<Md5>>::new("HMAC-MD5")),
            MacAlgorithm::HmacSha1 => Box::new(LibraryMac::<Hmac<Sha1>>::new("HMAC-SHA1")),
            MacAlgorithm::HmacSha256 => Box::new(LibraryMac::<Hmac<Sha256>>::new("HMAC-SHA256")),
            MacAlgorithm::HmacSha384 => Box::new(LibraryMac::<Hmac<Sha384>>::new("HMAC-SHA384")),
            MacAlgorithm::HmacSha512 => Box::new(LibraryMac::<Hmac<Sha512>>::new("HMAC-SHA512")),
            MacAlgorithm::AesCmac => Box::new(LibraryMac::<Cmac<Aes128>>::new("AES-CMAC")),
            MacAlgorithm::AesCmacPrf128 => Box::new(CmacPrf),
            MacAlgorithm::AesXcbcMac => Box::new(Xcbc { normalize: false }),
            MacAlgorithm::AesXcbcPrf128 => Box::new(Xcbc { normalize: true }),
        };

        KeyedMacPrimitive { algorithm, inner }
    }

    pub fn algorithm(&self) -> MacAlgorithm {
        self.algorithm
    }

    /// Output length of [`sign`](Self::sign)
    pub fn output_length(&self) -> usize {
        self.algorithm.output_length()
    }

    pub fn primitive(&self) -> Primitive {
        self.algorithm.primitive()
    }

    /// Compute the MAC of `data` under `key`
    pub fn sign(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.inner.sign(key, data)
    }

    /// Recompute the MAC and compare against `expected` in constant time
    pub fn verify(&self, key: &[u8], data: &[u8], expected: &[u8]) -> Result<bool, CryptoError> {
        let computed = self.sign(key, data)?;
        Ok(computed.ct_eq(expected).into())
    }

    /// Apply the algorithm's key normalization; other algorithms return the
    /// key unchanged.
    pub fn normalize_key(&self, key: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match self.algorithm {
            MacAlgorithm::AesXcbcPrf128 => Ok(normalize_xcbc_key(key)?.to_vec()),
            MacAlgorithm::AesCmacPrf128 => Ok(normalize_cmac_key(key)?.to_vec()),
            _ => Ok(key.to_vec()),
        }
    }
}

fn normalize_xcbc_key(key: &[u8]) -> Result<[u8; AES_BLOCK_SIZE], CryptoError> {
    let mut normalized = [0u8; AES_BLOCK_SIZE];
    if key.len() <= AES_BLOCK_SIZE {
        normalized[..key.len()].copy_from_slice(key);
    } else {
        let digest = aes_xcbc_mac(&[0u8; AES_BLOCK_SIZE], key)?;
        normalized.copy_from_slice(&digest);
    }
    Ok(normalized)
}

fn normalize_cmac_key(key: &[u8]) -> Result<[u8; AES_BLOCK_SIZE], CryptoError> {
    let mut normalized = [0u8; AES_BLOCK_SIZE];
    if key.len() == AES_BLOCK_SIZE {
        normalized.copy_from_slice(key);
    } else {
        let digest = aes_cmac(&[0u8; AES_BLOCK_SIZE], key)?;
        normalized.copy_from_slice(&digest);
    }
    Ok(normalized)
}

fn aes_cmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    LibraryMac::<Cmac<Aes128>>::new("AES-CMAC").sign(key, data)
}

fn new_aes(key: &[u8]) -> Result<Aes128, CryptoError> {
    Aes128::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
        algorithm: "AES-128",
        length: key.len(),
    })
}

fn encrypt(cipher: &Aes128, input: &[u8; AES_BLOCK_SIZE]) -> [u8; AES_BLOCK_SIZE] {
    let mut block = GenericArray::clone_from_slice(&input[..]);
    cipher.encrypt_block(&mut block);
    let mut out = [0u8; AES_BLOCK_SIZE];
    out.copy_from_slice(&block);
    out
}

fn xor_into(target: &mut [u8; AES_BLOCK_SIZE], other: &[u8]) {
    for (t, o) in target.iter_mut().zip(other) {
        *t ^= o;
    }
}

/// AES-XCBC-MAC (RFC 3566 Section 4), full 16-byte output
fn aes_xcbc_mac(key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = new_aes(key)?;

    // K1, K2, K3 derived from constant blocks
    let k1 = encrypt(&cipher, &[0x01; AES_BLOCK_SIZE]);
    let k2 = encrypt(&cipher, &[0x02; AES_BLOCK_SIZE]);
    let k3 = encrypt(&cipher, &[0x03; AES_BLOCK_SIZE]);
    let k1_cipher = new_aes(&k1)?;

    // The final block is the last full-or-partial block; an empty message is
    // one empty partial block.
    let final_start = if data.is_empty() {
        0
    } else {
        (data.len() - 1) / AES_BLOCK_SIZE * AES_BLOCK_SIZE
    };

    let mut e = [0u8; AES_BLOCK_SIZE];
    for block in data[..final_start].chunks(AES_BLOCK_SIZE) {
        xor_into(&mut e, block);
        e = encrypt(&k1_cipher, &e);
    }

    let last = &data[final_start..];
    let mut m = [0u8; AES_BLOCK_SIZE];
    m[..last.len()].copy_from_slice(last);
    if last.len() == AES_BLOCK_SIZE {
        xor_into(&mut m, &k2);
    } else {
        m[last.len()] = 0x80;
        xor_into(&mut m, &k3);
    }
    xor_into(&mut e, &m);

    Ok(encrypt(&k1_cipher, &e).to_vec())
}
