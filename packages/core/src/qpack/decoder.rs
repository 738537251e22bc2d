//! Request-side QPACK decoding, dispatched over the four instruction classes.

use super::prefix_int;
use super::static_table;
use super::HeaderField;
use crate::error::QpackError;

/// Decodes a full QPACK header block, including its two-byte prefix.
pub fn decode_header_block(buf: &[u8]) -> Result<Vec<HeaderField>, QpackError> {
    if buf.len() < 2 {
        return Err(QpackError::Truncated);
    }
    // Header block prefix: this codec never installs dynamic-table state,
    // so Required-Insert-Count and Delta-Base are read and discarded.
    let (_required_insert_count, _flags, consumed) = prefix_int::decode(&buf[0..], 8)?;
    let mut offset = consumed;
    let (_delta_base, _sign_flags, consumed2) = prefix_int::decode(&buf[offset..], 7)?;
    offset += consumed2;

    let mut fields = Vec::new();
    while offset < buf.len() {
        let (field, used) = decode_field(&buf[offset..])?;
        fields.push(field);
        offset += used;
    }
    Ok(fields)
}

fn decode_field(buf: &[u8]) -> Result<(HeaderField, usize), QpackError> {
    let first = *buf.first().ok_or(QpackError::Truncated)?;

    if first & 0x80 != 0 {
        // 1 T IIIIII: indexed field line.
        let (index, flags, used) = prefix_int::decode(buf, 6)?;
        let is_static = flags & 0x40 != 0;
        if !is_static {
            return Err(QpackError::DynamicTableRequired);
        }
        let entry = static_table::lookup(index).ok_or(QpackError::InvalidIndex(index))?;
        return Ok((HeaderField::new(entry.0, entry.1), used));
    }

    if first & 0xC0 == 0x40 {
        // 01 N T IIII: literal field line with name reference.
        let (name_index, flags, used) = prefix_int::decode(buf, 4)?;
        let is_static = flags & 0x10 != 0;
        if !is_static {
            return Err(QpackError::DynamicTableRequired);
        }
        let entry = static_table::lookup(name_index).ok_or(QpackError::InvalidIndex(name_index))?;
        let (value, value_len) = decode_string(&buf[used..])?;
        return Ok((HeaderField::new(entry.0, value), used + value_len));
    }

    if first & 0xE0 == 0x20 {
        // 001 N H PPP: literal field line with literal name.
        let (name_len, flags, used) = prefix_int::decode(buf, 3)?;
        let huffman = flags & 0x08 != 0;
        if huffman {
            return Err(QpackError::HuffmanNotSupported);
        }
        let name_len = usize::try_from(name_len).map_err(|_| QpackError::Truncated)?;
        let name_bytes = buf.get(used..used + name_len).ok_or(QpackError::Truncated)?;
        let name = String::from_utf8_lossy(name_bytes).into_owned();
        let offset = used + name_len;
        let (value, value_len) = decode_string(&buf[offset..])?;
        return Ok((HeaderField::new(name, value), offset + value_len));
    }

    // 0001xxxx (post-base indexed) and 0000xxxx (post-base literal name
    // reference) both require a dynamic table, which this codec omits.
    Err(QpackError::DynamicTableRequired)
}

fn decode_string(buf: &[u8]) -> Result<(String, usize), QpackError> {
    let (len, flags, used) = prefix_int::decode(buf, 7)?;
    let huffman = flags & 0x80 != 0;
    if huffman {
        return Err(QpackError::HuffmanNotSupported);
    }
    let len = usize::try_from(len).map_err(|_| QpackError::Truncated)?;
    let bytes = buf.get(used..used + len).ok_or(QpackError::Truncated)?;
    Ok((String::from_utf8_lossy(bytes).into_owned(), used + len))
}

#[cfg(test)]
mod tests {
    use super::super::encoder::encode_header_block;
    use super::*;

    #[test]
    fn unknown_static_index_fails() {
        // Indexed field line with index 98 + 5 = out of range.
        let buf = [0x00, 0x00, 0b1100_0000 | 63, 0x3F, 0x00];
        let err = decode_header_block(&buf).unwrap_err();
        assert!(matches!(err, QpackError::InvalidIndex(_)));
    }

    #[test]
    fn huffman_bit_on_string_length_is_rejected() {
        let headers = [HeaderField::new("x-custom", "value")];
        let mut encoded = encode_header_block(&headers).unwrap();
        // Flip the Huffman bit on the value-length byte (literal name path:
        // prefix(2) + name-len byte + name bytes + value-len byte).
        let value_len_pos = 2 + 1 + "x-custom".len();
        encoded[value_len_pos] |= 0x80;
        assert_eq!(decode_header_block(&encoded), Err(QpackError::HuffmanNotSupported));
    }

    #[test]
    fn truncated_block_fails_cleanly() {
        assert_eq!(decode_header_block(&[0x00]), Err(QpackError::Truncated));
    }
}
