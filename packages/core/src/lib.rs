//! `blitz-core`: the connection-terminating dataplane for the Blitz edge
//! gateway. QUIC transport, HTTP/3 framing and QPACK, the HTTP/1.x
//! parser, the TLS 1.3 integration seam, token-bucket rate limiting, JWT
//! authentication, and backend dispatch with health tracking.
//!
//! Socket accept loops, certificate file reading, CLI parsing, and TOML
//! configuration parsing are external collaborators (see the `gateway`
//! binary crate); this crate consumes only an already-parsed
//! [`config::GatewayConfig`], raw I/O primitives, an opaque
//! [`tls::TlsEngine`], and a [`time::Clock`].

pub mod backend;
pub mod config;
pub mod error;
pub mod h3;
pub mod http1;
pub mod jwt;
pub mod orchestrator;
pub mod qpack;
pub mod quic;
pub mod ratelimit;
pub mod telemetry;
pub mod time;
pub mod tls;
pub mod varint;

pub use config::GatewayConfig;
pub use error::GatewayError;
