//! TLS engine seam: the dataplane drives its own QUIC packet
//! framing and key schedule for Initial traffic, but delegates the
//! actual TLS 1.3 handshake (ClientHello through Finished) and the
//! Handshake/1-RTT key material it produces to a pluggable engine.

use crate::error::TlsSeamError;
use crate::quic::space::SpaceId;

/// One directional AEAD + header-protection key pair, opaque to callers
/// beyond what they need to protect or unprotect a packet.
pub struct DirectionalKeys {
    pub packet: Box<dyn PacketCrypto>,
    pub header_protection: crate::quic::header_protection::HeaderProtectionKey,
}

/// Packet payload AEAD, keyed per direction per packet-number space.
pub trait PacketCrypto: Send + Sync {
    fn seal_in_place(&self, packet_number: u64, header: &[u8], payload_and_tag: &mut Vec<u8>) -> Result<(), TlsSeamError>;
    fn open_in_place<'a>(&self, packet_number: u64, header: &[u8], payload_and_tag: &'a mut [u8]) -> Result<&'a mut [u8], TlsSeamError>;
}

/// A key change the engine has produced: either the Handshake space's
/// keys becoming available, or the final 1-RTT keys.
pub enum KeyChange {
    Handshake { keys: Keys },
    OneRtt { keys: Keys },
}

pub struct Keys {
    pub local: DirectionalKeys,
    pub remote: DirectionalKeys,
}

/// Abstracts the TLS 1.3 handshake engine itself. Implementations own the
/// cryptographic state machine; the QUIC layer only feeds it CRYPTO
/// stream bytes in order and asks it for bytes to send back.
pub trait TlsEngine {
    /// Feeds reassembled, in-order CRYPTO data from `space` to the
    /// engine.
    fn read_handshake(&mut self, space: SpaceId, data: &[u8]) -> Result<(), TlsSeamError>;

    /// Drains any handshake bytes the engine wants to send, appending
    /// them to `out`. Returns a key change if producing those bytes
    /// unlocked a new packet-protection level.
    fn write_handshake(&mut self, space: SpaceId, out: &mut Vec<u8>) -> Result<Option<KeyChange>, TlsSeamError>;

    fn is_handshaking(&self) -> bool;

    fn alpn_protocol(&self) -> Option<&[u8]>;
}
