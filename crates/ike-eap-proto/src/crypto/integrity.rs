//! Integrity checksums
//!
//! Integrity transforms are the same MAC constructions as the PRFs, keyed with
//! a fixed-length key and truncated to the negotiated checksum length.

use super::CryptoError;
use super::algorithm::IntegrityAlgorithm;
use super::mac::KeyedMacPrimitive;
use subtle::ConstantTimeEq;

/// A negotiated integrity algorithm
#[derive(Debug)]
pub struct Integrity {
    algorithm: IntegrityAlgorithm,
    mac: KeyedMacPrimitive,
}

impl Integrity {
    pub fn new(algorithm: IntegrityAlgorithm) -> Self {
        Integrity {
            algorithm,
            mac: KeyedMacPrimitive::new(algorithm.mac_algorithm()),
        }
    }

    pub fn from_transform_id(id: u16) -> Result<Self, CryptoError> {
        Ok(Self::new(IntegrityAlgorithm::from_transform_id(id)?))
    }

    pub fn algorithm(&self) -> IntegrityAlgorithm {
        self.algorithm
    }

    /// Length of SK_ai / SK_ar for this algorithm
    pub fn key_length(&self) -> usize {
        self.algorithm.descriptor().key_length
    }

    pub fn checksum_length(&self) -> usize {
        self.algorithm.checksum_length()
    }

    /// Compute the truncated checksum over `data`
    pub fn generate_checksum(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if key.len() != self.key_length() {
            return Err(CryptoError::InvalidKeyLength {
                algorithm: self.algorithm.name(),
                length: key.len(),
            });
        }

        let mut checksum = self.mac.sign(key, data)?;
        checksum.truncate(self.checksum_length());
        Ok(checksum)
    }

    /// Check a received checksum in constant time
    pub fn verify_checksum(
        &self,
        key: &[u8],
        data: &[u8],
        checksum: &[u8],
    ) -> Result<bool, CryptoError> {
        let expected = self.generate_checksum(key, data)?;
        Ok(expected.ct_eq(checksum).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_truncation() {
        let cases = [
            (IntegrityAlgorithm::HmacMd5_96, 16, 12),
            (IntegrityAlgorithm::HmacSha1_96, 20, 12),
            (IntegrityAlgorithm::AesXcbc96, 16, 12),
            (IntegrityAlgorithm::AesCmac96, 16, 12),
            (IntegrityAlgorithm::HmacSha256_128, 32, 16),
            (IntegrityAlgorithm::HmacSha384_192, 48, 24),
            (IntegrityAlgorithm::HmacSha512_256, 64, 32),
        ];

        for (alg, key_len, checksum_len) in cases {
            let integrity = Integrity::new(alg);
            assert_eq!(integrity.key_length(), key_len);
            let checksum = integrity
                .generate_checksum(&vec![0x01; key_len], b"ike message")
                .unwrap();
            assert_eq!(checksum.len(), checksum_len, "{:?}", alg);
        }
    }

    #[test]
    fn test_checksum_is_prefix_of_mac() {
        let integrity = Integrity::new(IntegrityAlgorithm::HmacSha256_128);
        let mac = KeyedMacPrimitive::new(IntegrityAlgorithm::HmacSha256_128.mac_algorithm());
        let key = [0x33u8; 32];

        let checksum = integrity.generate_checksum(&key, b"payload").unwrap();
        let full = mac.sign(&key, b"payload").unwrap();
        assert_eq!(&full[..16], &checksum[..]);
    }

    #[test]
    fn test_verify_checksum() {
        let integrity = Integrity::new(IntegrityAlgorithm::AesXcbc96);
        let key = [0x07u8; 16];
        let checksum = integrity.generate_checksum(&key, b"payload").unwrap();

        assert!(integrity.verify_checksum(&key, b"payload", &checksum).unwrap());

        let mut tampered = checksum.clone();
        tampered[0] ^= 1;
        assert!(!integrity.verify_checksum(&key, b"payload", &tampered).unwrap());
    }

    #[test]
    fn test_wrong_key_length() {
        let integrity = Integrity::new(IntegrityAlgorithm::HmacSha1_96);
        let err = integrity.generate_checksum(&[0u8; 16], b"x").unwrap_err();
        assert_eq!(
            err,
            CryptoError::InvalidKeyLength {
                algorithm: "AUTH_HMAC_SHA1_96",
                length: 16
            }
        );
    }
}
