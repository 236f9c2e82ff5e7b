//! Negotiated transform catalogue
//!
//! Maps IKEv2 transform identifiers (RFC 7296 Section 3.3.2, IANA "IKEv2
//! Parameters" registry) to closed enums. Each variant carries an immutable
//! [`AlgorithmDescriptor`] describing key length, output length and the
//! primitive the MAC is built on.

use super::CryptoError;

/// The primitive a keyed MAC is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// HMAC over a hash function
    Hash,
    /// MAC built on a block cipher (AES-XCBC, AES-CMAC)
    BlockCipher,
}

/// Immutable description of a negotiated MAC-based algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmDescriptor {
    /// IANA transform identifier
    pub id: u16,
    /// Key length in bytes
    pub key_length: usize,
    /// Untruncated MAC output length in bytes
    pub output_length: usize,
    /// Underlying primitive
    pub primitive: Primitive,
    /// Name of the library construction backing this algorithm, if any.
    /// `None` means the MAC is implemented in this crate.
    pub library_name: Option<&'static str>,
}

/// Pseudorandom functions (Transform Type 2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum PrfAlgorithm {
    /// PRF_HMAC_MD5 (RFC 2104)
    HmacMd5 = 1,
    /// PRF_HMAC_SHA1 (RFC 2104)
    HmacSha1 = 2,
    /// PRF_AES128_XCBC (RFC 4434)
    Aes128Xcbc = 4,
    /// PRF_HMAC_SHA2_256 (RFC 4868)
    HmacSha256 = 5,
    /// PRF_HMAC_SHA2_384 (RFC 4868)
    HmacSha384 = 6,
    /// PRF_HMAC_SHA2_512 (RFC 4868)
    HmacSha512 = 7,
    /// PRF_AES128_CMAC (RFC 4615)
    Aes128Cmac = 8,
}

impl PrfAlgorithm {
    /// All supported PRFs in registry order
    pub const ALL: [PrfAlgorithm; 7] = [
        PrfAlgorithm::HmacMd5,
        PrfAlgorithm::HmacSha1,
        PrfAlgorithm::Aes128Xcbc,
        PrfAlgorithm::HmacSha256,
        PrfAlgorithm::HmacSha384,
        PrfAlgorithm::HmacSha512,
        PrfAlgorithm::Aes128Cmac,
    ];

    /// Look up a PRF by its transform identifier
    pub fn from_transform_id(id: u16) -> Result<Self, CryptoError> {
        match id {
            1 => Ok(PrfAlgorithm::HmacMd5),
            2 => Ok(PrfAlgorithm::HmacSha1),
            4 => Ok(PrfAlgorithm::Aes128Xcbc),
            5 => Ok(PrfAlgorithm::HmacSha256),
            6 => Ok(PrfAlgorithm::HmacSha384),
            7 => Ok(PrfAlgorithm::HmacSha512),
            8 => Ok(PrfAlgorithm::Aes128Cmac),
            _ => Err(CryptoError::UnsupportedAlgorithm { kind: "PRF", id }),
        }
    }

    /// Look up a PRF by its registry name, e.g. `PRF_HMAC_SHA2_256`
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.name().eq_ignore_ascii_case(name))
    }

    /// Transform identifier
    pub fn transform_id(self) -> u16 {
        self as u16
    }

    /// Registry name
    pub fn name(self) -> &'static str {
        match self {
            PrfAlgorithm::HmacMd5 => "PRF_HMAC_MD5",
            PrfAlgorithm::HmacSha1 => "PRF_HMAC_SHA1",
            PrfAlgorithm::Aes128Xcbc => "PRF_AES128_XCBC",
            PrfAlgorithm::HmacSha256 => "PRF_HMAC_SHA2_256",
            PrfAlgorithm::HmacSha384 => "PRF_HMAC_SHA2_384",
            PrfAlgorithm::HmacSha512 => "PRF_HMAC_SHA2_512",
            PrfAlgorithm::Aes128Cmac => "PRF_AES128_CMAC",
        }
    }

    /// The MAC construction backing this PRF
    pub fn mac_algorithm(self) -> MacAlgorithm {
        match self {
            PrfAlgorithm::HmacMd5 => MacAlgorithm::HmacMd5,
            PrfAlgorithm::HmacSha1 => MacAlgorithm::HmacSha1,
            PrfAlgorithm::Aes128Xcbc => MacAlgorithm::AesXcbcPrf128,
            PrfAlgorithm::HmacSha256 => MacAlgorithm::HmacSha256,
            PrfAlgorithm::HmacSha384 => MacAlgorithm::HmacSha384,
            PrfAlgorithm::HmacSha512 => MacAlgorithm::HmacSha512,
            PrfAlgorithm::Aes128Cmac => MacAlgorithm::AesCmacPrf128,
        }
    }

    /// Descriptor for this PRF
    pub fn descriptor(self) -> AlgorithmDescriptor {
        let mac = self.mac_algorithm();
        AlgorithmDescriptor {
            id: self.transform_id(),
            key_length: mac.key_length(),
            output_length: mac.output_length(),
            primitive: mac.primitive(),
            library_name: mac.library_name(),
        }
    }

    /// Whether the PRF is block-cipher based and takes a fixed 16-byte key.
    ///
    /// RFC 7296 Section 2.14: these PRFs use only the first 64 bits of each
    /// nonce when computing SKEYSEED.
    pub fn is_key_normalized(self) -> bool {
        matches!(self, PrfAlgorithm::Aes128Xcbc | PrfAlgorithm::Aes128Cmac)
    }
}

/// Integrity algorithms (Transform Type 3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum IntegrityAlgorithm {
    /// AUTH_HMAC_MD5_96 (RFC 2403)
    HmacMd5_96 = 1,
    /// AUTH_HMAC_SHA1_96 (RFC 2404)
    HmacSha1_96 = 2,
    /// AUTH_AES_XCBC_96 (RFC 3566)
    AesXcbc96 = 5,
    /// AUTH_AES_CMAC_96 (RFC 4494)
    AesCmac96 = 8,
    /// AUTH_HMAC_SHA2_256_128 (RFC 4868)
    HmacSha256_128 = 12,
    /// AUTH_HMAC_SHA2_384_192 (RFC 4868)
    HmacSha384_192 = 13,
    /// AUTH_HMAC_SHA2_512_256 (RFC 4868)
    HmacSha512_256 = 14,
}

impl IntegrityAlgorithm {
    /// Look up an integrity algorithm by its transform identifier
    pub fn from_transform_id(id: u16) -> Result<Self, CryptoError> {
        match id {
            1 => Ok(IntegrityAlgorithm::HmacMd5_96),
            2 => Ok(IntegrityAlgorithm::HmacSha1_96),
            5 => Ok(IntegrityAlgorithm::AesXcbc96),
            8 => Ok(IntegrityAlgorithm::AesCmac96),
            12 => Ok(IntegrityAlgorithm::HmacSha256_128),
            13 => Ok(IntegrityAlgorithm::HmacSha384_192),
            14 => Ok(IntegrityAlgorithm::HmacSha512_256),
            _ => Err(CryptoError::UnsupportedAlgorithm {
                kind: "integrity",
                id,
            }),
        }
    }

    /// Transform identifier
    pub fn transform_id(self) -> u16 {
        self as u16
    }

    /// Registry name
    pub fn name(self) -> &'static str {
        match self {
            IntegrityAlgorithm::HmacMd5_96 => "AUTH_HMAC_MD5_96",
            IntegrityAlgorithm::HmacSha1_96 => "AUTH_HMAC_SHA1_96",
            IntegrityAlgorithm::AesXcbc96 => "AUTH_AES_XCBC_96",
            IntegrityAlgorithm::AesCmac96 => "AUTH_AES_CMAC_96",
            IntegrityAlgorithm::HmacSha256_128 => "AUTH_HMAC_SHA2_256_128",
            IntegrityAlgorithm::HmacSha384_192 => "AUTH_HMAC_SHA2_384_192",
            IntegrityAlgorithm::HmacSha512_256 => "AUTH_HMAC_SHA2_512_256",
        }
    }

    /// The MAC construction backing this algorithm
    pub fn mac_algorithm(self) -> MacAlgorithm {
        match self {
            IntegrityAlgorithm::HmacMd5_96 => MacAlgorithm::HmacMd5,
            IntegrityAlgorithm::HmacSha1_96 => MacAlgorithm::HmacSha1,
            IntegrityAlgorithm::AesXcbc96 => MacAlgorithm::AesXcbcMac,
            IntegrityAlgorithm::AesCmac96 => MacAlgorithm::AesCmac,
            IntegrityAlgorithm::HmacSha256_128 => MacAlgorithm::HmacSha256,
            IntegrityAlgorithm::HmacSha384_192 => MacAlgorithm::HmacSha384,
            IntegrityAlgorithm::HmacSha512_256 => MacAlgorithm::HmacSha512,
        }
    }

    /// Length of the truncated checksum carried on the wire
    pub fn checksum_length(self) -> usize {
        match self {
            IntegrityAlgorithm::HmacMd5_96
            | IntegrityAlgorithm::HmacSha1_96
            | IntegrityAlgorithm::AesXcbc96
            | IntegrityAlgorithm::AesCmac96 => 12,
            IntegrityAlgorithm::HmacSha256_128 => 16,
            IntegrityAlgorithm::HmacSha384_192 => 24,
            IntegrityAlgorithm::HmacSha512_256 => 32,
        }
    }

    /// Descriptor for this algorithm
    pub fn descriptor(self) -> AlgorithmDescriptor {
        let mac = self.mac_algorithm();
        AlgorithmDescriptor {
            id: self.transform_id(),
            key_length: mac.key_length(),
            output_length: mac.output_length(),
            primitive: mac.primitive(),
            library_name: mac.library_name(),
        }
    }
}

/// Keyed MAC constructions
///
/// The XCBC and CMAC variants come in two flavours: the plain MAC, which
/// requires an exact 16-byte key, and the PRF-128 form which normalizes keys
/// of any length first (RFC 4434, RFC 4615).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacAlgorithm {
    HmacMd5,
    HmacSha1,
    HmacSha256,
    HmacSha384,
    HmacSha512,
    /// AES-XCBC-MAC (RFC 3566), 16-byte key only
    AesXcbcMac,
    /// AES-XCBC-PRF-128 (RFC 4434)
    AesXcbcPrf128,
    /// AES-CMAC (RFC 4493), 16-byte key only
    AesCmac,
    /// AES-CMAC-PRF-128 (RFC 4615)
    AesCmacPrf128,
}

impl MacAlgorithm {
    /// Nominal key length in bytes
    pub fn key_length(self) -> usize {
        match self {
            MacAlgorithm::HmacMd5 => 16,
            MacAlgorithm::HmacSha1 => 20,
            MacAlgorithm::HmacSha256 => 32,
            MacAlgorithm::HmacSha384 => 48,
            MacAlgorithm::HmacSha512 => 64,
            MacAlgorithm::AesXcbcMac
            | MacAlgorithm::AesXcbcPrf128
            | MacAlgorithm::AesCmac
            | MacAlgorithm::AesCmacPrf128 => 16,
        }
    }

    /// MAC output length in bytes
    pub fn output_length(self) -> usize {
        match self {
            MacAlgorithm::HmacMd5 => 16,
            MacAlgorithm::HmacSha1 => 20,
            MacAlgorithm::HmacSha256 => 32,
            MacAlgorithm::HmacSha384 => 48,
            MacAlgorithm::HmacSha512 => 64,
            MacAlgorithm::AesXcbcMac
            | MacAlgorithm::AesXcbcPrf128
            | MacAlgorithm::AesCmac
            | MacAlgorithm::AesCmacPrf128 => 16,
        }
    }

    pub fn primitive(self) -> Primitive {
        match self {
            MacAlgorithm::HmacMd5
            | MacAlgorithm::HmacSha1
            | MacAlgorithm::HmacSha256
            | MacAlgorithm::HmacSha384
            | MacAlgorithm::HmacSha512 => Primitive::Hash,
            _ => Primitive::BlockCipher,
        }
    }

    pub fn library_name(self) -> Option<&'static str> {
        match self {
            MacAlgorithm::HmacMd5 => Some("HmacMD5"),
            MacAlgorithm::HmacSha1 => Some("HmacSHA1"),
            MacAlgorithm::HmacSha256 => Some("HmacSHA256"),
            MacAlgorithm::HmacSha384 => Some("HmacSHA384"),
            MacAlgorithm::HmacSha512 => Some("HmacSHA512"),
            MacAlgorithm::AesCmac | MacAlgorithm::AesCmacPrf128 => Some("AESCMAC"),
            MacAlgorithm::AesXcbcMac | MacAlgorithm::AesXcbcPrf128 => None,
        }
    }
}
