//! QUIC Initial secret key schedule (RFC 9001 §5.2), derived from a
//! public salt and the client's destination connection ID — independent
//! of the TLS handshake itself, which is why the dataplane derives these
//! keys directly rather than asking the TLS engine for them. Handshake
//! and 1-RTT keys, which do depend on the live handshake transcript, come
//! from the engine in [`super::rustls_engine`] instead.

use ring::hkdf::{Prk, Salt, HKDF_SHA256};

use crate::error::TlsSeamError;

/// The QUIC v1 Initial salt (RFC 9001 §5.2).
const INITIAL_SALT: [u8; 20] = [
    0x38, 0x76, 0x2c, 0xf7, 0xf5, 0x59, 0x34, 0xb3, 0x4d, 0x17, 0x9a, 0xe6, 0xa4, 0xc8, 0x0c, 0xad,
    0xcc, 0xbb, 0x7f, 0x0a,
];

struct OutputLen(usize);

impl ring::hkdf::KeyType for OutputLen {
    fn len(&self) -> usize {
        self.0
    }
}

fn expand(prk: &Prk, label: &[u8], len: usize) -> Result<Vec<u8>, TlsSeamError> {
    let mut hkdf_label = Vec::with_capacity(2 + 1 + 6 + label.len() + 1);
    hkdf_label.extend_from_slice(&(len as u16).to_be_bytes());
    let full_label_len = 6 + label.len(); // "tls13 " + label
    hkdf_label.push(full_label_len as u8);
    hkdf_label.extend_from_slice(b"tls13 ");
    hkdf_label.extend_from_slice(label);
    hkdf_label.push(0); // empty context

    let okm = prk
        .expand(&[&hkdf_label], OutputLen(len))
        .map_err(|_| TlsSeamError::Alert("HKDF-Expand-Label failed".into()))?;
    let mut out = vec![0u8; len];
    okm.fill(&mut out).map_err(|_| TlsSeamError::Alert("HKDF-Expand-Label fill failed".into()))?;
    Ok(out)
}

/// HKDF-Expand-Label as defined by RFC 8446 §7.1, used by the TLS 1.3 key
/// schedule that QUIC reuses for Initial secrets.
pub fn hkdf_expand_label(secret: &[u8], label: &[u8], len: usize) -> Result<Vec<u8>, TlsSeamError> {
    // Re-wrap `secret` as a PRK: the label expansion step accepts any
    // already-extracted pseudorandom key.
    let prk = Prk::new_less_safe(HKDF_SHA256, secret);
    expand(&prk, label, len)
}

pub struct InitialSecrets {
    pub client_key: Vec<u8>,
    pub client_iv: Vec<u8>,
    pub client_hp: Vec<u8>,
    pub server_key: Vec<u8>,
    pub server_iv: Vec<u8>,
    pub server_hp: Vec<u8>,
}

const AES_128_KEY_LEN: usize = 16;
const AEAD_IV_LEN: usize = 12;

/// Derives the Initial packet-protection and header-protection keys for
/// both directions from the client's destination connection ID.
pub fn derive_initial_secrets(client_dcid: &[u8]) -> Result<InitialSecrets, TlsSeamError> {
    let salt = Salt::new(HKDF_SHA256, &INITIAL_SALT);
    let initial_secret = salt.extract(client_dcid);

    let client_secret = expand(&initial_secret, b"client in", 32)?;
    let server_secret = expand(&initial_secret, b"server in", 32)?;

    let client_key = hkdf_expand_label(&client_secret, b"quic key", AES_128_KEY_LEN)?;
    let client_iv = hkdf_expand_label(&client_secret, b"quic iv", AEAD_IV_LEN)?;
    let client_hp = hkdf_expand_label(&client_secret, b"quic hp", AES_128_KEY_LEN)?;
    let server_key = hkdf_expand_label(&server_secret, b"quic key", AES_128_KEY_LEN)?;
    let server_iv = hkdf_expand_label(&server_secret, b"quic iv", AEAD_IV_LEN)?;
    let server_hp = hkdf_expand_label(&server_secret, b"quic hp", AES_128_KEY_LEN)?;

    Ok(InitialSecrets { client_key, client_iv, client_hp, server_key, server_iv, server_hp })
}
