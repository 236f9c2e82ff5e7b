//! EAP-TTLS type-data framing (RFC 5281 Section 9.1)
//!
//! ```text
//!  0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+
//! |L M S R R  V   |
//! +-+-+-+-+-+-+-+-+
//!
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     Flags     |        Message Length (only if L is set)
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!         Message Length          |             Data...
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! - L (Length included) = 0x80
//! - M (More fragments) = 0x40
//! - S (Start) = 0x20
//! - R (Reserved) = ignored on receipt, zero on send
//! - V (Version) = 3 bits, only version 0 is supported
//!
//! An acknowledgment frame has no flags set and no data; it asks the peer to
//! send the next fragment.

use super::{EapError, EapPacket, EapType};
use tracing::debug;

/// The only supported EAP-TTLS version
pub const TTLS_VERSION: u8 = 0;

/// Fragment payload size used when none is configured
pub const DEFAULT_FRAGMENT_SIZE: usize = 1024;

const FLAGS_LEN: usize = 1;
const MESSAGE_LENGTH_LEN: usize = 4;

/// Upper bound on buffer preallocation from a peer-declared message length
const MAX_PREALLOCATION: usize = 64 * 1024;

/// EAP-TTLS flag bits
pub struct TtlsFlags;

impl TtlsFlags {
    pub const LENGTH_INCLUDED: u8 = 0x80;
    pub const MORE_FRAGMENTS: u8 = 0x40;
    pub const START: u8 = 0x20;
    pub const VERSION_MASK: u8 = 0x07;
}

/// One EAP-TTLS frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlsTypeData {
    is_fragmented: bool,
    is_start: bool,
    version: u8,
    message_length: Option<u32>,
    data: Vec<u8>,
}

/// Result of decoding a frame; callers branch on it instead of propagating
pub type DecodeResult = Result<TtlsTypeData, EapError>;

impl TtlsTypeData {
    /// Build a frame
    ///
    /// `message_length` is the total message length and is only present when
    /// the L flag is set. Fails for any version other than [`TTLS_VERSION`],
    /// or for an unfragmented frame whose data does not match the declared
    /// length.
    pub fn new(
        is_fragmented: bool,
        is_start: bool,
        version: u8,
        message_length: Option<u32>,
        data: Vec<u8>,
    ) -> Result<Self, EapError> {
        if version != TTLS_VERSION {
            return Err(EapError::UnsupportedVersion(version));
        }

        if !is_fragmented
            && let Some(declared) = message_length
            && data.len() != declared as usize
        {
            return Err(EapError::LengthMismatch {
                declared,
                actual: data.len(),
            });
        }

        Ok(TtlsTypeData {
            is_fragmented,
            is_start,
            version,
            message_length,
            data,
        })
    }

    /// The acknowledgment frame
    pub fn acknowledgment() -> Self {
        TtlsTypeData {
            is_fragmented: false,
            is_start: false,
            version: TTLS_VERSION,
            message_length: None,
            data: Vec::new(),
        }
    }

    /// A Start frame, as sent by the server to open the exchange
    pub fn start() -> Self {
        TtlsTypeData {
            is_start: true,
            ..Self::acknowledgment()
        }
    }

    /// Decode type-data bytes (the EAP Type-Data field)
    pub fn decode(bytes: &[u8]) -> DecodeResult {
        let (&flags, rest) = bytes.split_first().ok_or(EapError::PacketTooShort {
            expected: FLAGS_LEN,
            actual: 0,
        })?;

        let is_length_included = flags & TtlsFlags::LENGTH_INCLUDED != 0;
        let is_fragmented = flags & TtlsFlags::MORE_FRAGMENTS != 0;
        let is_start = flags & TtlsFlags::START != 0;
        let version = flags & TtlsFlags::VERSION_MASK;

        let (message_length, data) = if is_length_included {
            if rest.len() < MESSAGE_LENGTH_LEN {
                return Err(EapError::PacketTooShort {
                    expected: FLAGS_LEN + MESSAGE_LENGTH_LEN,
                    actual: bytes.len(),
                });
            }
            let (length, data) = rest.split_at(MESSAGE_LENGTH_LEN);
            let length = u32::from_be_bytes([length[0], length[1], length[2], length[3]]);
            (Some(length), data)
        } else {
            (None, rest)
        };

        Self::new(is_fragmented, is_start, version, message_length, data.to_vec())
    }

    /// Encode to type-data bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_length());
        bytes.push(self.flags());
        if let Some(length) = self.message_length {
            bytes.extend_from_slice(&length.to_be_bytes());
        }
        bytes.extend_from_slice(&self.data);
        bytes
    }

    pub fn encoded_length(&self) -> usize {
        let length_field = if self.message_length.is_some() {
            MESSAGE_LENGTH_LEN
        } else {
            0
        };
        FLAGS_LEN + length_field + self.data.len()
    }

    /// Wrap this frame in an EAP-Response
    pub fn to_eap_response(&self, identifier: u8) -> EapPacket {
        EapPacket::response(identifier, EapType::Ttls, self.encode())
    }

    pub fn flags(&self) -> u8 {
        let mut flags = self.version & TtlsFlags::VERSION_MASK;
        if self.message_length.is_some() {
            flags |= TtlsFlags::LENGTH_INCLUDED;
        }
        if self.is_fragmented {
            flags |= TtlsFlags::MORE_FRAGMENTS;
        }
        if self.is_start {
            flags |= TtlsFlags::START;
        }
        flags
    }

    pub fn is_length_included(&self) -> bool {
        self.message_length.is_some()
    }

    pub fn is_fragmented(&self) -> bool {
        self.is_fragmented
    }

    pub fn is_start(&self) -> bool {
        self.is_start
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn message_length(&self) -> Option<u32> {
        self.message_length
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// True for the empty, flagless continuation request
    pub fn is_acknowledgment(&self) -> bool {
        self.data.is_empty() && !self.is_start && !self.is_length_included() && !self.is_fragmented
    }
}

/// Outcome of feeding a frame to the [`InboundReassembler`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentStatus {
    /// More fragments follow; reply with an acknowledgment
    Ack,
    /// The complete message
    Assembled(Vec<u8>),
}

/// Reassembles fragmented inbound messages
#[derive(Debug, Default)]
pub struct InboundReassembler {
    expected_length: Option<usize>,
    buffer: Vec<u8>,
}

impl InboundReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a fragmented message is partially received
    pub fn is_awaiting_fragments(&self) -> bool {
        self.expected_length.is_some()
    }

    /// Feed one frame
    ///
    /// Any error discards the partial message.
    pub fn assemble(&mut self, frame: &TtlsTypeData) -> Result<FragmentStatus, EapError> {
        let result = self.assemble_inner(frame);
        if result.is_err() {
            self.reset();
        }
        result
    }

    fn assemble_inner(&mut self, frame: &TtlsTypeData) -> Result<FragmentStatus, EapError> {
        let expected = match self.expected_length {
            Some(expected) => expected,
            None if !frame.is_fragmented() => {
                return Ok(FragmentStatus::Assembled(frame.data().to_vec()));
            }
            None => {
                let total = frame.message_length().ok_or_else(|| {
                    EapError::Fragmentation(
                        "first fragment does not include the message length".to_string(),
                    )
                })? as usize;
                self.expected_length = Some(total);
                self.buffer = Vec::with_capacity(total.min(MAX_PREALLOCATION));
                total
            }
        };

        if self.buffer.len() + frame.data().len() > expected {
            return Err(EapError::Fragmentation(format!(
                "fragment exceeds declared message length {}",
                expected
            )));
        }
        self.buffer.extend_from_slice(frame.data());

        if frame.is_fragmented() {
            debug!(
                received = self.buffer.len(),
                expected = expected,
                "EAP-TTLS fragment received, acknowledging"
            );
            return Ok(FragmentStatus::Ack);
        }

        if self.buffer.len() != expected {
            return Err(EapError::LengthMismatch {
                declared: expected as u32,
                actual: self.buffer.len(),
            });
        }

        self.expected_length = None;
        debug!(length = expected, "EAP-TTLS message reassembled");
        Ok(FragmentStatus::Assembled(std::mem::take(&mut self.buffer)))
    }

    /// Drop any partial message
    pub fn reset(&mut self) {
        self.expected_length = None;
        self.buffer.clear();
    }
}

/// Splits an outbound message into frames
#[derive(Debug)]
pub struct OutboundFragmenter {
    max_fragment_size: usize,
    pending: Option<Vec<u8>>,
    offset: usize,
}

impl OutboundFragmenter {
    /// `max_fragment_size` bounds the data carried per frame
    pub fn new(max_fragment_size: usize) -> Result<Self, EapError> {
        if max_fragment_size == 0 {
            return Err(EapError::EncodingError(
                "fragment size must be positive".to_string(),
            ));
        }
        Ok(OutboundFragmenter {
            max_fragment_size,
            pending: None,
            offset: 0,
        })
    }

    pub fn max_fragment_size(&self) -> usize {
        self.max_fragment_size
    }

    /// Start sending `message`, discarding anything still pending
    pub fn setup(&mut self, message: Vec<u8>) -> Result<(), EapError> {
        if u32::try_from(message.len()).is_err() {
            return Err(EapError::EncodingError(format!(
                "message of {} bytes cannot be framed",
                message.len()
            )));
        }
        self.pending = Some(message);
        self.offset = 0;
        Ok(())
    }

    /// Whether frames remain for the current message
    pub fn has_remaining(&self) -> bool {
        match &self.pending {
            Some(message) => self.offset == 0 || self.offset < message.len(),
            None => false,
        }
    }

    /// Produce the next frame
    ///
    /// The first frame carries the total message length; later frames carry
    /// none. M is set while data remains.
    pub fn next_frame(&mut self) -> Result<TtlsTypeData, EapError> {
        if !self.has_remaining() {
            return Err(EapError::Fragmentation(
                "no outbound message is being fragmented".to_string(),
            ));
        }
        let Some(message) = self.pending.as_ref() else {
            return Err(EapError::Fragmentation(
                "no outbound message is being fragmented".to_string(),
            ));
        };

        let is_first = self.offset == 0;
        let end = (self.offset + self.max_fragment_size).min(message.len());
        let chunk = message[self.offset..end].to_vec();
        let more = end < message.len();
        let message_length = is_first.then_some(message.len() as u32);

        if more {
            self.offset = end;
        } else {
            self.pending = None;
            self.offset = 0;
        }

        TtlsTypeData::new(more, false, TTLS_VERSION, message_length, chunk)
    }
}

impl Default for OutboundFragmenter {
    fn default() -> Self {
        OutboundFragmenter {
            max_fragment_size: DEFAULT_FRAGMENT_SIZE,
            pending: None,
            offset: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_unfragmented_with_length() {
        let bytes = [0x80, 0, 0, 0, 3, 0xaa, 0xbb, 0xcc];
        let frame = TtlsTypeData::decode(&bytes).unwrap();
        assert!(frame.is_length_included());
        assert!(!frame.is_fragmented());
        assert!(!frame.is_start());
        assert_eq!(frame.message_length(), Some(3));
        assert_eq!(frame.data(), &[0xaa, 0xbb, 0xcc]);
        assert_eq!(frame.encode(), bytes);
    }

    #[test]
    fn test_decode_start() {
        let frame = TtlsTypeData::decode(&[0x20]).unwrap();
        assert!(frame.is_start());
        assert!(frame.data().is_empty());
        assert_eq!(frame, TtlsTypeData::start());
        assert!(!frame.is_acknowledgment());
    }

    #[test]
    fn test_decode_first_fragment() {
        let frame = TtlsTypeData::decode(&[0xc0, 0, 0, 0x10, 0, 1, 2]).unwrap();
        assert!(frame.is_fragmented());
        assert_eq!(frame.message_length(), Some(4096));
        assert_eq!(frame.data(), &[1, 2]);
    }

    #[test]
    fn test_decode_length_mismatch() {
        let err = TtlsTypeData::decode(&[0x80, 0, 0, 0, 5, 1, 2]).unwrap_err();
        assert_eq!(
            err,
            EapError::LengthMismatch {
                declared: 5,
                actual: 2
            }
        );
    }

    #[test]
    fn test_decode_truncated() {
        assert_eq!(
            TtlsTypeData::decode(&[]),
            Err(EapError::PacketTooShort {
                expected: 1,
                actual: 0
            })
        );
        assert_eq!(
            TtlsTypeData::decode(&[0x80, 0, 0]),
            Err(EapError::PacketTooShort {
                expected: 5,
                actual: 3
            })
        );
    }

    #[test]
    fn test_decode_unsupported_version() {
        assert_eq!(
            TtlsTypeData::decode(&[0x01, 0xaa]),
            Err(EapError::UnsupportedVersion(1))
        );
        assert_eq!(
            TtlsTypeData::new(false, false, 7, None, vec![]),
            Err(EapError::UnsupportedVersion(7))
        );
    }

    #[test]
    fn test_reserved_bits_ignored() {
        let frame = TtlsTypeData::decode(&[0x18, 0x01]).unwrap();
        assert_eq!(frame.flags(), 0x00);
        assert_eq!(frame.data(), &[0x01]);
    }

    #[test]
    fn test_acknowledgment() {
        let ack = TtlsTypeData::acknowledgment();
        assert!(ack.is_acknowledgment());
        assert_eq!(ack.encode(), vec![0x00]);
        assert!(TtlsTypeData::decode(&[0x00]).unwrap().is_acknowledgment());

        let with_data = TtlsTypeData::new(false, false, 0, None, vec![1]).unwrap();
        assert!(!with_data.is_acknowledgment());
        let with_length = TtlsTypeData::new(false, false, 0, Some(0), vec![]).unwrap();
        assert!(!with_length.is_acknowledgment());
        let fragmented = TtlsTypeData::new(true, false, 0, None, vec![]).unwrap();
        assert!(!fragmented.is_acknowledgment());
    }

    #[test]
    fn test_roundtrip_selected_frames() {
        let frames = [
            TtlsTypeData::acknowledgment(),
            TtlsTypeData::start(),
            TtlsTypeData::new(true, false, 0, Some(100), vec![7; 40]).unwrap(),
            TtlsTypeData::new(true, false, 0, None, vec![7; 40]).unwrap(),
            TtlsTypeData::new(false, false, 0, Some(0), vec![]).unwrap(),
            TtlsTypeData::new(false, true, 0, Some(2), vec![1, 2]).unwrap(),
        ];
        for frame in frames {
            assert_eq!(TtlsTypeData::decode(&frame.encode()).unwrap(), frame);
        }
    }

    #[test]
    fn test_to_eap_response() {
        let packet = TtlsTypeData::acknowledgment().to_eap_response(42);
        assert_eq!(packet.to_bytes().unwrap(), vec![2, 42, 0, 6, 21, 0x00]);
    }

    #[test]
    fn test_reassembly() {
        let mut reassembler = InboundReassembler::new();

        let first = TtlsTypeData::new(true, false, 0, Some(5), vec![1, 2]).unwrap();
        let second = TtlsTypeData::new(true, false, 0, None, vec![3, 4]).unwrap();
        let last = TtlsTypeData::new(false, false, 0, None, vec![5]).unwrap();

        assert_eq!(reassembler.assemble(&first).unwrap(), FragmentStatus::Ack);
        assert!(reassembler.is_awaiting_fragments());
        assert_eq!(reassembler.assemble(&second).unwrap(), FragmentStatus::Ack);
        assert_eq!(
            reassembler.assemble(&last).unwrap(),
            FragmentStatus::Assembled(vec![1, 2, 3, 4, 5])
        );
        assert!(!reassembler.is_awaiting_fragments());
    }

    #[test]
    fn test_reassembly_unfragmented_passthrough() {
        let mut reassembler = InboundReassembler::new();
        let frame = TtlsTypeData::new(false, false, 0, Some(3), vec![9, 9, 9]).unwrap();
        assert_eq!(
            reassembler.assemble(&frame).unwrap(),
            FragmentStatus::Assembled(vec![9, 9, 9])
        );
    }

    #[test]
    fn test_reassembly_requires_length_on_first_fragment() {
        let mut reassembler = InboundReassembler::new();
        let frame = TtlsTypeData::new(true, false, 0, None, vec![1]).unwrap();
        assert!(matches!(
            reassembler.assemble(&frame),
            Err(EapError::Fragmentation(_))
        ));
        assert!(!reassembler.is_awaiting_fragments());
    }

    #[test]
    fn test_reassembly_overflow_and_short_message() {
        let mut reassembler = InboundReassembler::new();
        let first = TtlsTypeData::new(true, false, 0, Some(3), vec![1, 2]).unwrap();
        let too_much = TtlsTypeData::new(false, false, 0, None, vec![3, 4]).unwrap();
        reassembler.assemble(&first).unwrap();
        assert!(matches!(
            reassembler.assemble(&too_much),
            Err(EapError::Fragmentation(_))
        ));
        assert!(!reassembler.is_awaiting_fragments());

        let first = TtlsTypeData::new(true, false, 0, Some(4), vec![1, 2]).unwrap();
        let short = TtlsTypeData::new(false, false, 0, None, vec![3]).unwrap();
        reassembler.assemble(&first).unwrap();
        assert_eq!(
            reassembler.assemble(&short),
            Err(EapError::LengthMismatch {
                declared: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_outbound_fragmentation() {
        let mut fragmenter = OutboundFragmenter::new(4).unwrap();
        fragmenter.setup((0..10).collect()).unwrap();

        let first = fragmenter.next_frame().unwrap();
        assert!(first.is_fragmented());
        assert_eq!(first.message_length(), Some(10));
        assert_eq!(first.data(), &[0, 1, 2, 3]);

        let second = fragmenter.next_frame().unwrap();
        assert!(second.is_fragmented());
        assert_eq!(second.message_length(), None);
        assert_eq!(second.data(), &[4, 5, 6, 7]);

        let last = fragmenter.next_frame().unwrap();
        assert!(!last.is_fragmented());
        assert_eq!(last.data(), &[8, 9]);

        assert!(!fragmenter.has_remaining());
        assert!(fragmenter.next_frame().is_err());
    }

    #[test]
    fn test_outbound_single_frame_carries_length() {
        let mut fragmenter = OutboundFragmenter::default();
        fragmenter.setup(vec![1, 2, 3]).unwrap();
        let frame = fragmenter.next_frame().unwrap();
        assert!(!frame.is_fragmented());
        assert_eq!(frame.message_length(), Some(3));
        assert!(!fragmenter.has_remaining());
    }

    #[test]
    fn test_outbound_zero_fragment_size() {
        assert!(OutboundFragmenter::new(0).is_err());
    }

    #[test]
    fn test_fragment_then_reassemble() {
        let message: Vec<u8> = (0..=255u8).cycle().take(3000).collect();
        let mut fragmenter = OutboundFragmenter::new(1000).unwrap();
        let mut reassembler = InboundReassembler::new();
        fragmenter.setup(message.clone()).unwrap();

        let mut assembled = None;
        while fragmenter.has_remaining() {
            let frame = TtlsTypeData::decode(&fragmenter.next_frame().unwrap().encode()).unwrap();
            if let FragmentStatus::Assembled(data) = reassembler.assemble(&frame).unwrap() {
                assembled = Some(data);
            }
        }
        assert_eq!(assembled, Some(message));
    }
}
