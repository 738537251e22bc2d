//! QUIC/TLS handshake state machine, independent of the concrete
//! TLS engine. Transitions are driven by CRYPTO data arriving from each
//! packet-number space and by key material becoming available; the
//! actual cryptography lives behind [`crate::tls::TlsEngine`].

use crate::error::QuicError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    ClientHelloSeen,
    ServerHelloSent,
    HandshakeComplete,
    Connected,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeEvent {
    ClientHelloReceived,
    ServerHelloSent,
    HandshakeKeysDerived,
    PeerFinishedVerified,
    OneRttKeysDerived,
    FatalAlert,
}

/// Drives the handshake state table. Any event not valid for the current
/// state moves to `Error` rather than panicking — a malformed or
/// out-of-order peer is a protocol violation, not a programming bug.
#[derive(Debug)]
pub struct HandshakeDriver {
    state: HandshakeState,
}

impl Default for HandshakeDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl HandshakeDriver {
    #[must_use]
    pub fn new() -> Self {
        Self { state: HandshakeState::Idle }
    }

    #[must_use]
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn apply(&mut self, event: HandshakeEvent) -> Result<HandshakeState, QuicError> {
        use HandshakeEvent as E;
        use HandshakeState as S;

        if event == E::FatalAlert {
            self.state = S::Error;
            return Ok(self.state);
        }

        self.state = match (self.state, event) {
            (S::Idle, E::ClientHelloReceived) => S::ClientHelloSeen,
            (S::ClientHelloSeen, E::ServerHelloSent) => S::ServerHelloSent,
            (S::ServerHelloSent, E::HandshakeKeysDerived) => S::ServerHelloSent,
            (S::ServerHelloSent, E::PeerFinishedVerified) => S::HandshakeComplete,
            (S::HandshakeComplete, E::OneRttKeysDerived) => S::Connected,
            (other, _) => {
                return Err(QuicError::ProtocolViolation(match other {
                    S::Error => "handshake event received after the handshake entered an error state",
                    _ => "handshake event is not valid for the current state",
                }));
            }
        };
        Ok(self.state)
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == HandshakeState::Connected
    }
}
