//! EAP (Extensible Authentication Protocol) envelope
//!
//! RFC 3748 packet codec used as the outer envelope around method type-data.
//! Method state machines live outside this crate; they consume
//! [`EapPacket::from_bytes`] / [`EapPacket::to_bytes`] and the type-data codecs
//! in the submodules.
//!
//! # EAP Packet Format
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     Code      |  Identifier   |            Length             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     Type      |  Type-Data ...
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

pub mod ttls;

use thiserror::Error;

/// EAP header length (code, identifier, length)
pub const EAP_HEADER_LEN: usize = 4;

/// EAP packet code (first byte of EAP packet)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EapCode {
    Request = 1,
    Response = 2,
    Success = 3,
    Failure = 4,
}

impl EapCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(EapCode::Request),
            2 => Some(EapCode::Response),
            3 => Some(EapCode::Success),
            4 => Some(EapCode::Failure),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// EAP method types handled by the tunnel authenticator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EapType {
    /// Identity (Type 1) - RFC 3748
    Identity = 1,
    /// Notification (Type 2) - RFC 3748
    Notification = 2,
    /// Nak (Type 3) - RFC 3748
    Nak = 3,
    /// EAP-SIM (Type 18) - RFC 4186
    Sim = 18,
    /// EAP-TTLS (Type 21) - RFC 5281
    Ttls = 21,
    /// EAP-AKA (Type 23) - RFC 4187
    Aka = 23,
    /// EAP-MSCHAPv2 (Type 26)
    MsChapV2 = 26,
    /// EAP-AKA' (Type 50) - RFC 5448
    AkaPrime = 50,
}

impl EapType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(EapType::Identity),
            2 => Some(EapType::Notification),
            3 => Some(EapType::Nak),
            18 => Some(EapType::Sim),
            21 => Some(EapType::Ttls),
            23 => Some(EapType::Aka),
            26 => Some(EapType::MsChapV2),
            50 => Some(EapType::AkaPrime),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// EAP packet structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EapPacket {
    pub code: EapCode,
    /// Identifier for matching requests and responses
    pub identifier: u8,
    /// Raw method type (only present for Request/Response)
    pub eap_type: Option<u8>,
    /// Type-specific data
    pub type_data: Vec<u8>,
}

impl EapPacket {
    pub fn new(code: EapCode, identifier: u8, eap_type: Option<EapType>, type_data: Vec<u8>) -> Self {
        EapPacket {
            code,
            identifier,
            eap_type: eap_type.map(EapType::as_u8),
            type_data,
        }
    }

    /// Create an EAP-Response carrying method type-data
    pub fn response(identifier: u8, eap_type: EapType, type_data: Vec<u8>) -> Self {
        Self::new(EapCode::Response, identifier, Some(eap_type), type_data)
    }

    /// The method type, if known to this crate
    pub fn method(&self) -> Option<EapType> {
        self.eap_type.and_then(EapType::from_u8)
    }

    /// Parse EAP packet from bytes
    ///
    /// Trailing bytes beyond the Length field are ignored (RFC 3748 Section 4).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EapError> {
        if bytes.len() < EAP_HEADER_LEN {
            return Err(EapError::PacketTooShort {
                expected: EAP_HEADER_LEN,
                actual: bytes.len(),
            });
        }

        let code = EapCode::from_u8(bytes[0]).ok_or(EapError::InvalidCode(bytes[0]))?;
        let identifier = bytes[1];
        let length = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;

        if length < EAP_HEADER_LEN {
            return Err(EapError::InvalidLength(length));
        }
        if bytes.len() < length {
            return Err(EapError::PacketTooShort {
                expected: length,
                actual: bytes.len(),
            });
        }

        let (eap_type, type_data) = match code {
            EapCode::Request | EapCode::Response => {
                if length < EAP_HEADER_LEN + 1 {
                    return Err(EapError::InvalidLength(length));
                }
                (Some(bytes[4]), bytes[5..length].to_vec())
            }
            EapCode::Success | EapCode::Failure => {
                if length != EAP_HEADER_LEN {
                    return Err(EapError::InvalidLength(length));
                }
                (None, Vec::new())
            }
        };

        Ok(EapPacket {
            code,
            identifier,
            eap_type,
            type_data,
        })
    }

    /// Encode EAP packet to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, EapError> {
        let length = self.length();
        if length > u16::MAX as usize {
            return Err(EapError::EncodingError(format!(
                "EAP packet length {} exceeds 65535",
                length
            )));
        }

        let mut bytes = Vec::with_capacity(length);
        bytes.push(self.code.as_u8());
        bytes.push(self.identifier);
        bytes.extend_from_slice(&(length as u16).to_be_bytes());

        if let (EapCode::Request | EapCode::Response, Some(eap_type)) = (self.code, self.eap_type) {
            bytes.push(eap_type);
            bytes.extend_from_slice(&self.type_data);
        }

        Ok(bytes)
    }

    /// Total encoded length
    pub fn length(&self) -> usize {
        match (self.code, self.eap_type) {
            (EapCode::Request | EapCode::Response, Some(_)) => {
                EAP_HEADER_LEN + 1 + self.type_data.len()
            }
            _ => EAP_HEADER_LEN,
        }
    }
}

/// EAP decode and framing errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EapError {
    #[error("Packet too short: expected at least {expected} bytes, got {actual}")]
    PacketTooShort { expected: usize, actual: usize },

    #[error("Invalid EAP code: {0}")]
    InvalidCode(u8),

    #[error("Invalid packet length: {0}")]
    InvalidLength(usize),

    #[error("Unsupported EAP-TTLS version: {0}")]
    UnsupportedVersion(u8),

    #[error("Message length mismatch: declared {declared}, got {actual}")]
    LengthMismatch { declared: u32, actual: usize },

    #[error("Fragmentation failure: {0}")]
    Fragmentation(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_roundtrip() {
        let packet = EapPacket::response(7, EapType::Ttls, vec![0x00, 0xaa]);
        let bytes = packet.to_bytes().unwrap();
        assert_eq!(bytes, vec![2, 7, 0, 7, 21, 0x00, 0xaa]);
        assert_eq!(EapPacket::from_bytes(&bytes).unwrap(), packet);
    }

    #[test]
    fn test_success_packet() {
        let packet = EapPacket::from_bytes(&[3, 9, 0, 4]).unwrap();
        assert_eq!(packet.code, EapCode::Success);
        assert_eq!(packet.identifier, 9);
        assert!(packet.eap_type.is_none());
        assert_eq!(packet.to_bytes().unwrap(), vec![3, 9, 0, 4]);
    }

    #[test]
    fn test_unknown_type_preserved() {
        let packet = EapPacket::from_bytes(&[1, 1, 0, 6, 254, 0xff]).unwrap();
        assert_eq!(packet.eap_type, Some(254));
        assert_eq!(packet.method(), None);
        assert_eq!(packet.to_bytes().unwrap(), vec![1, 1, 0, 6, 254, 0xff]);
    }

    #[test]
    fn test_malformed_packets() {
        assert_eq!(
            EapPacket::from_bytes(&[1, 1]),
            Err(EapError::PacketTooShort {
                expected: 4,
                actual: 2
            })
        );
        assert_eq!(EapPacket::from_bytes(&[9, 1, 0, 4]), Err(EapError::InvalidCode(9)));
        assert_eq!(EapPacket::from_bytes(&[1, 1, 0, 4]), Err(EapError::InvalidLength(4)));
        assert_eq!(
            EapPacket::from_bytes(&[1, 1, 0, 10, 21]),
            Err(EapError::PacketTooShort {
                expected: 10,
                actual: 5
            })
        );
        assert_eq!(EapPacket::from_bytes(&[4, 1, 0, 5, 0]), Err(EapError::InvalidLength(5)));
    }
}
