//! Per-connection QUIC state: packet-number spaces,
//! CRYPTO reassembly, the handshake driver, stream multiplexing, and
//! congestion control, composed into one connection-scoped object. The
//! TLS engine that actually drives the handshake's cryptography sits
//! behind [`crate::tls::TlsEngine`] and is wired in by the orchestrator.

use std::time::Instant;

use super::cid::ConnectionId;
use super::crypto_stream::CryptoStream;
use super::handshake::{HandshakeDriver, HandshakeEvent, HandshakeState};
use super::recovery::CongestionController;
use super::space::{PacketNumberSpaces, SpaceId};
use super::stream::StreamReassembler;
use crate::error::QuicError;

pub struct Connection {
    pub local_cid: ConnectionId,
    pub peer_cid: ConnectionId,
    spaces: PacketNumberSpaces,
    initial_crypto: CryptoStream,
    handshake_crypto: CryptoStream,
    handshake: HandshakeDriver,
    streams: StreamReassembler,
    congestion: CongestionController,
}

impl Connection {
    #[must_use]
    pub fn new(local_cid: ConnectionId, peer_cid: ConnectionId) -> Self {
        Self {
            local_cid,
            peer_cid,
            spaces: PacketNumberSpaces::new(),
            initial_crypto: CryptoStream::new(),
            handshake_crypto: CryptoStream::new(),
            handshake: HandshakeDriver::new(),
            streams: StreamReassembler::new(),
            congestion: CongestionController::new(),
        }
    }

    #[must_use]
    pub fn handshake_state(&self) -> HandshakeState {
        self.handshake.state()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.handshake.is_connected()
    }

    pub fn spaces_mut(&mut self) -> &mut PacketNumberSpaces {
        &mut self.spaces
    }

    pub fn congestion_mut(&mut self) -> &mut CongestionController {
        &mut self.congestion
    }

    /// Records receipt of a packet number in the given space, rejecting
    /// duplicates before any frame inside it is processed further.
    pub fn accept_packet_number(&mut self, space: SpaceId, pn: u64) -> Result<(), QuicError> {
        if !self.spaces.get_mut(space).record_rx(pn) {
            return Err(QuicError::DuplicatePacketNumber { packet_number: pn });
        }
        Ok(())
    }

    /// Feeds CRYPTO frame data from the Initial space into reassembly,
    /// returning TLS flight bytes now ready for the engine, and advances
    /// the handshake driver on the first ClientHello delivery.
    pub fn receive_initial_crypto(&mut self, offset: u64, data: &[u8]) -> Result<Vec<u8>, QuicError> {
        let was_idle = self.handshake.state() == HandshakeState::Idle;
        let ready = self.initial_crypto.receive(offset, data);
        if was_idle && !ready.is_empty() {
            self.handshake.apply(HandshakeEvent::ClientHelloReceived)?;
        }
        Ok(ready)
    }

    /// Feeds CRYPTO frame data from the Handshake space into reassembly.
    pub fn receive_handshake_crypto(&mut self, offset: u64, data: &[u8]) -> Vec<u8> {
        self.handshake_crypto.receive(offset, data)
    }

    pub fn apply_handshake_event(&mut self, event: HandshakeEvent) -> Result<HandshakeState, QuicError> {
        self.handshake.apply(event)
    }

    pub fn receive_stream_data(&mut self, stream_id: u64, offset: u64, data: &[u8], fin: bool) -> Vec<u8> {
        self.streams.receive(stream_id, offset, data, fin)
    }

    #[must_use]
    pub fn is_stream_finished(&self, stream_id: u64) -> bool {
        self.streams.is_finished(stream_id)
    }

    pub fn on_packet_sent(&mut self, space: SpaceId, size: u64, now: Instant) -> u64 {
        let pn = self.spaces.get_mut(space).next_tx_packet_number();
        self.congestion.on_packet_sent(pn, size, now);
        pn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        Connection::new(ConnectionId::random(8), ConnectionId::random(8))
    }

    #[test]
    fn first_initial_crypto_bytes_advance_the_handshake() {
        let mut c = conn();
        assert_eq!(c.handshake_state(), HandshakeState::Idle);
        c.receive_initial_crypto(0, b"client hello").unwrap();
        assert_eq!(c.handshake_state(), HandshakeState::ClientHelloSeen);
    }

    #[test]
    fn out_of_order_initial_crypto_does_not_advance_until_contiguous() {
        let mut c = conn();
        c.receive_initial_crypto(5, b"world").unwrap();
        assert_eq!(c.handshake_state(), HandshakeState::Idle);
        c.receive_initial_crypto(0, b"hello").unwrap();
        assert_eq!(c.handshake_state(), HandshakeState::ClientHelloSeen);
    }

    #[test]
    fn duplicate_packet_number_in_a_space_is_rejected() {
        let mut c = conn();
        c.accept_packet_number(SpaceId::Initial, 0).unwrap();
        assert!(c.accept_packet_number(SpaceId::Initial, 0).is_err());
    }

    #[test]
    fn packet_number_spaces_are_independent_per_connection() {
        let mut c = conn();
        c.accept_packet_number(SpaceId::Initial, 0).unwrap();
        assert!(c.accept_packet_number(SpaceId::Handshake, 0).is_ok());
    }
}
