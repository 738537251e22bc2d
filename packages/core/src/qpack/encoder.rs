//! Response-side QPACK encoding, following a fixed three-rule encoding order.

use super::prefix_int;
use super::static_table;
use super::HeaderField;
use crate::error::QpackError;

/// Encodes a full header set into a QPACK header block: the two-byte
/// prefix (always "no dynamic table used") followed by one field-line
/// representation per header, in order.
pub fn encode_header_block(headers: &[HeaderField]) -> Result<Vec<u8>, QpackError> {
    let mut out = Vec::with_capacity(64);
    // Header block prefix: Required-Insert-Count=0, Delta-Base sign+value=0.
    out.push(0x00);
    out.push(0x00);
    for h in headers {
        encode_field(h, &mut out);
    }
    Ok(out)
}

fn encode_field(h: &HeaderField, out: &mut Vec<u8>) {
    if let Some(idx) = static_table::find_exact(&h.name, &h.value) {
        // Rule 1: indexed static — 1T IIIIII
        prefix_int::encode(idx, 6, 0b1100_0000, out);
        return;
    }
    if let Some(name_idx) = static_table::find_by_name(&h.name) {
        // Rule 2: literal with static name reference — 01NT IIII
        prefix_int::encode(name_idx, 4, 0b0101_0000, out);
        encode_string(h.value.as_bytes(), out);
        return;
    }
    // Rule 3: literal with literal name — 001N H PPP
    encode_literal_name(h.name.as_bytes(), out);
    encode_string(h.value.as_bytes(), out);
}

fn encode_literal_name(name: &[u8], out: &mut Vec<u8>) {
    // Class bits 001, N=0 (not never-indexed), H=0 (no Huffman support).
    prefix_int::encode(name.len() as u64, 3, 0b0010_0000, out);
    out.extend_from_slice(name);
}

fn encode_string(value: &[u8], out: &mut Vec<u8>) {
    // H=0: identity encoding, 7-bit length prefix.
    prefix_int::encode(value.len() as u64, 7, 0x00, out);
    out.extend_from_slice(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_exact_match_uses_single_indexed_instruction() {
        let headers = [HeaderField::new(":method", "GET")];
        let encoded = encode_header_block(&headers).unwrap();
        // prefix (2 bytes) + one instruction byte: 0xC0 | 17
        assert_eq!(encoded.len(), 3);
        assert_eq!(encoded[2], 0b1100_0000 | 17);
    }

    #[test]
    fn name_only_match_falls_back_to_literal_with_name_ref() {
        let headers = [HeaderField::new("content-type", "application/custom")];
        let encoded = encode_header_block(&headers).unwrap();
        assert_eq!(encoded[2] & 0b1100_0000, 0b0100_0000);
    }

    #[test]
    fn unknown_name_and_value_uses_literal_with_literal_name() {
        let headers = [HeaderField::new("x-custom-header", "hello")];
        let encoded = encode_header_block(&headers).unwrap();
        assert_eq!(encoded[2] & 0b1110_0000, 0b0010_0000);
    }
}
