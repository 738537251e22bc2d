//! AEAD packet protection for the Initial packet-number space (RFC 9001
//! §5.2–§5.3). Handshake and 1-RTT keys come from the negotiated cipher
//! suite via [`super::rustls_engine`]; Initial traffic always uses
//! AES-128-GCM with keys derived in [`super::key_schedule`], so this
//! module builds the matching [`PacketCrypto`] directly from those raw
//! key/iv bytes rather than going through the TLS engine.

use ring::aead::{LessSafeKey, Nonce, UnboundKey, AES_128_GCM, NONCE_LEN};
use ring::aead::quic::AES_128 as HP_AES_128;

use super::engine::{DirectionalKeys, Keys, PacketCrypto};
use super::key_schedule::InitialSecrets;
use crate::error::TlsSeamError;
use crate::quic::header_protection::HeaderProtectionKey;

pub struct InitialPacketCrypto {
    key: LessSafeKey,
    iv: [u8; NONCE_LEN],
}

impl InitialPacketCrypto {
    fn new(key_bytes: &[u8], iv_bytes: &[u8]) -> Result<Self, TlsSeamError> {
        let unbound = UnboundKey::new(&AES_128_GCM, key_bytes).map_err(|_| TlsSeamError::Alert("invalid Initial AEAD key length".into()))?;
        let mut iv = [0u8; NONCE_LEN];
        iv.copy_from_slice(iv_bytes);
        Ok(Self { key: LessSafeKey::new(unbound), iv })
    }

    /// Per-packet nonce: the IV with the packet number XORed into its
    /// low-order bytes (RFC 9001 §5.3).
    fn nonce_for(&self, packet_number: u64) -> Nonce {
        let mut nonce = self.iv;
        let pn_bytes = packet_number.to_be_bytes();
        for (n, p) in nonce.iter_mut().rev().zip(pn_bytes.iter().rev()) {
            *n ^= p;
        }
        Nonce::assume_unique_for_key(nonce)
    }
}

impl PacketCrypto for InitialPacketCrypto {
    fn seal_in_place(&self, packet_number: u64, header: &[u8], payload_and_tag: &mut Vec<u8>) -> Result<(), TlsSeamError> {
        let nonce = self.nonce_for(packet_number);
        self.key
            .seal_in_place_append_tag(nonce, ring::aead::Aad::from(header), payload_and_tag)
            .map_err(|_| TlsSeamError::Alert("Initial packet seal failed".into()))
    }

    fn open_in_place<'a>(&self, packet_number: u64, header: &[u8], payload_and_tag: &'a mut [u8]) -> Result<&'a mut [u8], TlsSeamError> {
        let nonce = self.nonce_for(packet_number);
        self.key
            .open_in_place(nonce, ring::aead::Aad::from(header), payload_and_tag)
            .map_err(|_| TlsSeamError::Alert("Initial packet open failed".into()))
    }
}

fn directional_keys(key: &[u8], iv: &[u8], hp: &[u8]) -> Result<DirectionalKeys, TlsSeamError> {
    let packet = InitialPacketCrypto::new(key, iv)?;
    let header_protection = HeaderProtectionKey::new(&HP_AES_128, hp).map_err(|_| TlsSeamError::Alert("Initial header protection key derivation failed".into()))?;
    Ok(DirectionalKeys { packet: Box::new(packet), header_protection })
}

/// Builds the server's Initial-space keys: `local` protects packets the
/// server sends, `remote` removes protection from packets the client
/// sent.
pub fn server_initial_keys(secrets: &InitialSecrets) -> Result<Keys, TlsSeamError> {
    let local = directional_keys(&secrets.server_key, &secrets.server_iv, &secrets.server_hp)?;
    let remote = directional_keys(&secrets.client_key, &secrets.client_iv, &secrets.client_hp)?;
    Ok(Keys { local, remote })
}

/// Builds the client's Initial-space keys, the mirror image of
/// [`server_initial_keys`]. Used by client-role tests and any future
/// client-side dataplane role.
pub fn client_initial_keys(secrets: &InitialSecrets) -> Result<Keys, TlsSeamError> {
    let local = directional_keys(&secrets.client_key, &secrets.client_iv, &secrets.client_hp)?;
    let remote = directional_keys(&secrets.server_key, &secrets.server_iv, &secrets.server_hp)?;
    Ok(Keys { local, remote })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_seals_and_client_opens_the_same_initial_packet() {
        let dcid = [7u8; 8];
        let secrets = super::super::key_schedule::derive_initial_secrets(&dcid).unwrap();
        let server = server_initial_keys(&secrets).unwrap();
        let client = client_initial_keys(&secrets).unwrap();

        let header = b"fake long header bytes";
        let mut payload = b"hello client".to_vec();
        server.local.packet.seal_in_place(0, header, &mut payload).unwrap();
        let opened = client.remote.packet.open_in_place(0, header, &mut payload).unwrap();
        assert_eq!(opened, b"hello client");
    }

    #[test]
    fn wrong_packet_number_fails_to_open() {
        let secrets = super::super::key_schedule::derive_initial_secrets(&[3u8; 8]).unwrap();
        let server = server_initial_keys(&secrets).unwrap();
        let client = client_initial_keys(&secrets).unwrap();

        let header = b"header";
        let mut payload = b"payload bytes".to_vec();
        server.local.packet.seal_in_place(1, header, &mut payload).unwrap();
        assert!(client.remote.packet.open_in_place(2, header, &mut payload).is_err());
    }
}
