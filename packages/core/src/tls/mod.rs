//! TLS 1.3 integration seam: Initial secrets are derived directly
//! by the dataplane ([`key_schedule`]) since they depend only on a public
//! salt and the client's connection ID, while Handshake and 1-RTT key
//! material comes from a pluggable [`TlsEngine`], implemented here over
//! `rustls::quic` ([`rustls_engine`]).

pub mod engine;
pub mod initial_crypto;
pub mod key_schedule;
pub mod rustls_engine;

pub use engine::{DirectionalKeys, KeyChange, Keys, PacketCrypto, TlsEngine};
pub use initial_crypto::{client_initial_keys, server_initial_keys};
pub use key_schedule::{derive_initial_secrets, hkdf_expand_label, InitialSecrets};
pub use rustls_engine::RustlsEngine;
