//! Key schedules
//!
//! IKE SA keys (RFC 7296 Section 2.14):
//!
//! ```text
//! {SK_d | SK_ai | SK_ar | SK_ei | SK_er | SK_pi | SK_pr}
//!     = prf+ (SKEYSEED, Ni | Nr | SPIi | SPIr)
//! ```
//!
//! Child SA keys (Section 2.17), encryption keys taken before integrity keys
//! and initiator-to-responder keys before the other direction:
//!
//! ```text
//! KEYMAT = prf+(SK_d, [g^ir (new) |] Ni | Nr)
//! ```
//!
//! Shared-key authentication data (Section 2.15):
//!
//! ```text
//! AUTH = prf( prf(Shared Secret, "Key Pad for IKEv2"), <*SignedOctets>)
//! ```

use super::CryptoError;
use super::prf::{MAX_PRF_PLUS_ITERATIONS, Prf};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Key pad used to derive the shared-key AUTH key
pub const KEY_PAD_IKEV2: &[u8] = b"Key Pad for IKEv2";

/// IKE SPI length in bytes
pub const SPI_LEN_IKE: usize = 8;

/// Keys for one IKE SA
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct IkeSaKeys {
    pub sk_d: Vec<u8>,
    pub sk_ai: Vec<u8>,
    pub sk_ar: Vec<u8>,
    pub sk_ei: Vec<u8>,
    pub sk_er: Vec<u8>,
    pub sk_pi: Vec<u8>,
    pub sk_pr: Vec<u8>,
}

impl std::fmt::Debug for IkeSaKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IkeSaKeys")
            .field("sk_d_len", &self.sk_d.len())
            .field("integrity_key_len", &self.sk_ai.len())
            .field("encryption_key_len", &self.sk_ei.len())
            .finish_non_exhaustive()
    }
}

/// Keys for one Child SA
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ChildSaKeys {
    pub sk_ei: Vec<u8>,
    pub sk_ai: Vec<u8>,
    pub sk_er: Vec<u8>,
    pub sk_ar: Vec<u8>,
}

impl std::fmt::Debug for ChildSaKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildSaKeys")
            .field("encryption_key_len", &self.sk_ei.len())
            .field("integrity_key_len", &self.sk_ai.len())
            .finish_non_exhaustive()
    }
}

/// Sequential reader over derived keying material
struct KeyMaterial<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> KeyMaterial<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        KeyMaterial { bytes, offset: 0 }
    }

    fn take(&mut self, len: usize) -> Vec<u8> {
        let key = self.bytes[self.offset..self.offset + len].to_vec();
        self.offset += len;
        key
    }
}

/// Sum of `count * length` terms, or `OutputTooLong` when it does not fit in `usize`
fn keymat_length(prf: &Prf, terms: &[(usize, usize)]) -> Result<usize, CryptoError> {
    terms
        .iter()
        .try_fold(0usize, |total, &(count, length)| {
            length.checked_mul(count).and_then(|n| total.checked_add(n))
        })
        .ok_or(CryptoError::OutputTooLong {
            requested: usize::MAX,
            max: MAX_PRF_PLUS_ITERATIONS * prf.output_length(),
        })
}

/// Derive all IKE SA keys from SKEYSEED
#[allow(clippy::too_many_arguments)]
pub fn derive_ike_sa_keys(
    prf: &Prf,
    skeyseed: &[u8],
    nonce_init: &[u8],
    nonce_resp: &[u8],
    spi_init: u64,
    spi_resp: u64,
    integrity_key_length: usize,
    encryption_key_length: usize,
) -> Result<IkeSaKeys, CryptoError> {
    let mut seed =
        Vec::with_capacity(nonce_init.len() + nonce_resp.len() + 2 * SPI_LEN_IKE);
    seed.extend_from_slice(nonce_init);
    seed.extend_from_slice(nonce_resp);
    seed.extend_from_slice(&spi_init.to_be_bytes());
    seed.extend_from_slice(&spi_resp.to_be_bytes());

    let prf_key_length = prf.key_length();
    let total = keymat_length(
        prf,
        &[(3, prf_key_length), (2, integrity_key_length), (2, encryption_key_length)],
    )?;

    let mut keymat = prf.expand(skeyseed, &seed, total)?;
    let mut reader = KeyMaterial::new(&keymat);
    let keys = IkeSaKeys {
        sk_d: reader.take(prf_key_length),
        sk_ai: reader.take(integrity_key_length),
        sk_ar: reader.take(integrity_key_length),
        sk_ei: reader.take(encryption_key_length),
        sk_er: reader.take(encryption_key_length),
        sk_pi: reader.take(prf_key_length),
        sk_pr: reader.take(prf_key_length),
    };
    keymat.zeroize();

    Ok(keys)
}

/// Derive Child SA keys from SK_d
///
/// `shared_secret` is empty when the CREATE_CHILD_SA exchange carried no KE
/// payload.
pub fn derive_child_sa_keys(
    prf: &Prf,
    sk_d: &[u8],
    shared_secret: &[u8],
    nonce_init: &[u8],
    nonce_resp: &[u8],
    encryption_key_length: usize,
    integrity_key_length: usize,
) -> Result<ChildSaKeys, CryptoError> {
    let mut seed =
        Vec::with_capacity(shared_secret.len() + nonce_init.len() + nonce_resp.len());
    seed.extend_from_slice(shared_secret);
    seed.extend_from_slice(nonce_init);
    seed.extend_from_slice(nonce_resp);

    let total = keymat_length(prf, &[(2, encryption_key_length), (2, integrity_key_length)])?;
    let mut keymat = prf.expand(sk_d, &seed, total)?;
    let mut reader = KeyMaterial::new(&keymat);
    let keys = ChildSaKeys {
        sk_ei: reader.take(encryption_key_length),
        sk_ai: reader.take(integrity_key_length),
        sk_er: reader.take(encryption_key_length),
        sk_ar: reader.take(integrity_key_length),
    };
    keymat.zeroize();

    Ok(keys)
}

/// Build the octets signed by an AUTH payload
///
/// `id_payload_body` is the ID payload without its generic header.
pub fn signed_octets(
    prf: &Prf,
    message: &[u8],
    peer_nonce: &[u8],
    sk_p: &[u8],
    id_payload_body: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let id_mac = prf.sign(sk_p, id_payload_body)?;

    let mut octets = Vec::with_capacity(message.len() + peer_nonce.len() + id_mac.len());
    octets.extend_from_slice(message);
    octets.extend_from_slice(peer_nonce);
    octets.extend_from_slice(&id_mac);
    Ok(octets)
}

/// AUTH data for a pre-shared key, or for an EAP MSK
pub fn psk_auth_data(prf: &Prf, shared_key: &[u8], signed_octets: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut pad_key = prf.sign(shared_key, KEY_PAD_IKEV2)?;
    let auth = prf.sign(&pad_key, signed_octets);
    pad_key.zeroize();
    auth
}
