//! Error taxonomy for the dataplane.
//!
//! One `thiserror` enum per subsystem, aggregated into [`GatewayError`] at
//! the orchestrator boundary. Parse/protocol errors carry enough detail for
//! logging; the orchestrator never forwards these details to the wire (see
//! `orchestrator::status`), only the mapped HTTP status.

use thiserror::Error;

/// Variable-length integer codec errors.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VarIntError {
    #[error("varint declares a {declared}-byte form but only {available} bytes remain")]
    IncompleteVarInt { declared: usize, available: usize },
    #[error("varint value exceeds the 62-bit representable range")]
    ValueOutOfRange,
}

/// QPACK static-table codec errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QpackError {
    #[error("static table index {0} does not exist")]
    InvalidIndex(u64),
    #[error("Huffman-coded strings are not supported")]
    HuffmanNotSupported,
    #[error("header block ended while a string or prefix integer was still being read")]
    Truncated,
    #[error("post-base indexed field lines require a dynamic table, which this codec does not implement")]
    DynamicTableRequired,
    #[error(transparent)]
    VarInt(#[from] VarIntError),
}

/// HTTP/3 framing errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum H3FrameError {
    #[error("control stream's first frame was not SETTINGS")]
    MissingSettings,
    #[error("frame payload truncated: declared {declared} bytes, {available} available")]
    Truncated { declared: u64, available: usize },
    #[error(transparent)]
    VarInt(#[from] VarIntError),
}

/// HTTP/1.x parser and formatter errors.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Http1Error {
    #[error("request exceeds the 16 KiB size cap")]
    RequestTooLarge,
    #[error("path exceeds the 8 KiB size cap")]
    PathTooLong,
    #[error("request has more than 100 headers")]
    TooManyHeaders,
    #[error("header name exceeds 256 bytes")]
    HeaderNameTooLong,
    #[error("header value exceeds 8 KiB")]
    HeaderValueTooLong,
    #[error("malformed request line")]
    MalformedRequestLine,
    #[error("malformed header line")]
    MalformedHeaderLine,
    #[error("request line or headers ended before the terminating blank line")]
    Incomplete,
    #[error("output buffer is too small to hold the formatted response")]
    BufferTooSmall,
}

/// QUIC packet- and connection-layer errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuicError {
    #[error("packet shorter than the minimum fixed header size")]
    PacketTooShort,
    #[error("unsupported or unrecognized QUIC version: {0:#x}")]
    UnsupportedVersion(u32),
    #[error("connection ID length {0} exceeds the 20-byte maximum")]
    ConnectionIdTooLong(usize),
    #[error("header protection or AEAD removal failed")]
    DecryptFailure,
    #[error("frame is malformed or violates flow-control bounds")]
    ProtocolViolation(&'static str),
    #[error("packet number {packet_number} is not greater than the space's received numbers and is a duplicate")]
    DuplicatePacketNumber { packet_number: u64 },
    #[error("1-RTT keys requested before the handshake completed")]
    KeysNotReady,
    #[error(transparent)]
    VarInt(#[from] VarIntError),
}

/// TLS engine seam errors.
#[derive(Debug, Error)]
pub enum TlsSeamError {
    #[error("TLS engine reported a fatal alert: {0}")]
    Alert(String),
    #[error("traffic secrets were requested before the handshake produced them")]
    SecretsNotReady,
    #[error("no application protocol overlap between offered ALPN values")]
    NoAlpnOverlap,
    #[error(transparent)]
    Rustls(#[from] rustls::Error),
}

/// Rate limiter errors.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("global rate limit exceeded")]
    Global,
    #[error("per-IP rate limit exceeded")]
    PerIp,
}

/// JWT validator errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JwtError {
    #[error("token is not well-formed compact JWS")]
    InvalidToken,
    #[error("token segment is not valid URL-safe base64")]
    InvalidBase64,
    #[error("header segment did not decode to the expected JSON shape")]
    InvalidHeader,
    #[error("payload segment did not decode to the expected JSON shape")]
    InvalidPayload,
    #[error("algorithm {0} is not supported by this validator")]
    UnsupportedAlgorithm(String),
    #[error("signature verification failed")]
    InvalidSignature,
    #[error("token has expired")]
    TokenExpired,
    #[error("token is not yet valid")]
    TokenNotYetValid,
    #[error("issuer does not match the configured value")]
    InvalidIssuer,
    #[error("audience does not match the configured value")]
    InvalidAudience,
    #[error("required claim '{0}' was missing or did not match")]
    AuthorizationDenied(String),
}

/// Backend pool and health-tracking errors.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BackendError {
    #[error("no backends are configured")]
    NoBackendsAvailable,
    #[error("connect to backend timed out")]
    ConnectTimeout,
    #[error("read from backend timed out")]
    ReadTimeout,
    #[error("connection pool for this backend is exhausted")]
    PoolExhausted,
    #[error("connection to backend was refused or reset")]
    ConnectionFailed,
    #[error("backend response was not a well-formed HTTP/1.1 response")]
    InvalidResponse,
}

/// Umbrella error for the request orchestrator, carrying the
/// mapping to an HTTP status code.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Http1(#[from] Http1Error),
    #[error(transparent)]
    Qpack(#[from] QpackError),
    #[error(transparent)]
    H3Frame(#[from] H3FrameError),
    #[error(transparent)]
    Quic(#[from] QuicError),
    #[error(transparent)]
    Tls(#[from] TlsSeamError),
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Maps this error to the fixed HTTP status table below. Internal
    /// failure detail (e.g. which crypto step failed) never crosses this
    /// boundary; only the status and a short reason phrase do.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Http1(
                Http1Error::RequestTooLarge
                | Http1Error::PathTooLong
                | Http1Error::TooManyHeaders
                | Http1Error::HeaderNameTooLong
                | Http1Error::HeaderValueTooLong,
            ) => 400,
            GatewayError::Http1(_) => 400,
            GatewayError::Qpack(_) | GatewayError::H3Frame(_) | GatewayError::Quic(_) => 400,
            GatewayError::Jwt(
                JwtError::InvalidToken
                | JwtError::InvalidBase64
                | JwtError::InvalidHeader
                | JwtError::InvalidPayload
                | JwtError::UnsupportedAlgorithm(_)
                | JwtError::InvalidSignature
                | JwtError::TokenExpired
                | JwtError::TokenNotYetValid,
            ) => 401,
            GatewayError::Jwt(JwtError::InvalidIssuer | JwtError::InvalidAudience | JwtError::AuthorizationDenied(_)) => 403,
            GatewayError::Backend(BackendError::NoBackendsAvailable | BackendError::PoolExhausted) => 503,
            GatewayError::Backend(BackendError::ConnectTimeout | BackendError::ReadTimeout) => 504,
            GatewayError::Backend(BackendError::ConnectionFailed | BackendError::InvalidResponse) => 502,
            GatewayError::RateLimit(_) => 429,
            GatewayError::Tls(_) => 400,
            GatewayError::Internal(_) => 500,
        }
    }

    /// Short, wire-safe reason phrase for this error.
    #[must_use]
    pub fn reason_phrase(&self) -> &'static str {
        match self.status_code() {
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            429 => "Too Many Requests",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            504 => "Gateway Timeout",
            _ => "Internal Server Error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_table() {
        assert_eq!(GatewayError::Http1(Http1Error::RequestTooLarge).status_code(), 400);
        assert_eq!(GatewayError::Jwt(JwtError::TokenExpired).status_code(), 401);
        assert_eq!(GatewayError::Jwt(JwtError::InvalidAudience).status_code(), 403);
        assert_eq!(GatewayError::Backend(BackendError::NoBackendsAvailable).status_code(), 503);
        assert_eq!(GatewayError::Backend(BackendError::ReadTimeout).status_code(), 504);
        assert_eq!(GatewayError::RateLimit(RateLimitError::Global).status_code(), 429);
        assert_eq!(GatewayError::Internal("boom".into()).status_code(), 500);
    }
}
