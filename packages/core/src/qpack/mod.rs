//! QPACK static-table header compression (RFC 9204). No dynamic
//! table: every field line is either an indexed reference into the static
//! table or a literal, and the header-block prefix always reports zero
//! dynamic-table usage.

mod decoder;
mod encoder;
mod prefix_int;
pub mod static_table;

pub use decoder::decode_header_block;
pub use encoder::encode_header_block;

/// A single decoded or to-be-encoded header field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    pub name: String,
    pub value: String,
}

impl HeaderField {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }

    /// True for HTTP/3 pseudo-headers (`:method`, `:path`, ...), which
    /// spec.md requires to precede regular headers in a header set.
    #[must_use]
    pub fn is_pseudo(&self) -> bool {
        self.name.starts_with(':')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> Vec<HeaderField> {
        vec![
            HeaderField::new(":method", "GET"),
            HeaderField::new(":scheme", "https"),
            HeaderField::new(":authority", "example.com"),
            HeaderField::new(":path", "/"),
            HeaderField::new("accept", "*/*"),
        ]
    }

    #[test]
    fn round_trip_is_idempotent_for_static_only_headers() {
        let headers = sample_request();
        let encoded = encode_header_block(&headers).expect("all names/values are static");
        let decoded = decode_header_block(&encoded).expect("encoder output always decodes");
        assert_eq!(decoded, headers);
    }

    #[test]
    fn pseudo_headers_precede_regular_headers_after_round_trip() {
        let headers = sample_request();
        let encoded = encode_header_block(&headers).unwrap();
        let decoded = decode_header_block(&encoded).unwrap();
        let first_regular = decoded.iter().position(|h| !h.is_pseudo()).unwrap();
        assert!(decoded[..first_regular].iter().all(HeaderField::is_pseudo));
    }

    #[test]
    fn header_block_prefix_is_two_zero_bytes() {
        let encoded = encode_header_block(&[HeaderField::new(":path", "/")]).unwrap();
        assert_eq!(&encoded[..2], &[0x00, 0x00]);
    }
}
