//! QUIC transport frame encoding/decoding (RFC 9000 §19), restricted
//! to the frame types the dataplane actually needs to drive a handshake
//! and carry HTTP/3: PADDING, PING, ACK, CRYPTO, and CONNECTION_CLOSE.
//! STREAM frames are handled by the HTTP/3 layer directly since their
//! payload is QPACK/H3-framed, not transport-level structure.

use crate::error::QuicError;
use crate::varint;

const FRAME_TYPE_PADDING: u64 = 0x00;
const FRAME_TYPE_PING: u64 = 0x01;
const FRAME_TYPE_ACK: u64 = 0x02;
const FRAME_TYPE_ACK_ECN: u64 = 0x03;
const FRAME_TYPE_CRYPTO: u64 = 0x06;
const FRAME_TYPE_CONNECTION_CLOSE_QUIC: u64 = 0x1c;
const FRAME_TYPE_CONNECTION_CLOSE_APP: u64 = 0x1d;
/// STREAM frames use the low 3 bits of the type as flags (OFF/LEN/FIN).
const FRAME_TYPE_STREAM_BASE: u64 = 0x08;
const FRAME_TYPE_STREAM_MAX: u64 = 0x0f;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame<'a> {
    Padding,
    Ping,
    Ack { largest_acked: u64, ack_delay: u64, first_ack_range: u64 },
    Crypto { offset: u64, data: &'a [u8] },
    Stream { stream_id: u64, offset: u64, fin: bool, data: &'a [u8] },
    ConnectionClose { error_code: u64, reason: &'a [u8] },
}

fn read_varint<'a>(buf: &mut &'a [u8]) -> Result<u64, QuicError> {
    let (value, used) = varint::decode(buf)?;
    *buf = &buf[used..];
    Ok(value)
}

/// Parses a single frame from the front of `buf`, returning the frame and
/// the number of bytes it consumed.
pub fn parse_frame(buf: &[u8]) -> Result<(Frame<'_>, usize), QuicError> {
    let start_len = buf.len();
    let mut cursor = buf;
    let frame_type = read_varint(&mut cursor)?;

    let frame = match frame_type {
        FRAME_TYPE_PADDING => Frame::Padding,
        FRAME_TYPE_PING => Frame::Ping,
        FRAME_TYPE_ACK | FRAME_TYPE_ACK_ECN => {
            let largest_acked = read_varint(&mut cursor)?;
            let ack_delay = read_varint(&mut cursor)?;
            let range_count = read_varint(&mut cursor)?;
            let first_ack_range = read_varint(&mut cursor)?;
            for _ in 0..range_count {
                read_varint(&mut cursor)?; // gap
                read_varint(&mut cursor)?; // ack range length
            }
            if frame_type == FRAME_TYPE_ACK_ECN {
                read_varint(&mut cursor)?; // ECT0
                read_varint(&mut cursor)?; // ECT1
                read_varint(&mut cursor)?; // ECN-CE
            }
            Frame::Ack { largest_acked, ack_delay, first_ack_range }
        }
        FRAME_TYPE_CRYPTO => {
            let offset = read_varint(&mut cursor)?;
            let len = read_varint(&mut cursor)?;
            let len = usize::try_from(len).map_err(|_| QuicError::ProtocolViolation("CRYPTO length overflows usize"))?;
            if cursor.len() < len {
                return Err(QuicError::ProtocolViolation("CRYPTO frame data truncated"));
            }
            let data = &cursor[..len];
            cursor = &cursor[len..];
            Frame::Crypto { offset, data }
        }
        FRAME_TYPE_CONNECTION_CLOSE_QUIC | FRAME_TYPE_CONNECTION_CLOSE_APP => {
            let error_code = read_varint(&mut cursor)?;
            if frame_type == FRAME_TYPE_CONNECTION_CLOSE_QUIC {
                read_varint(&mut cursor)?; // triggering frame type
            }
            let reason_len = read_varint(&mut cursor)?;
            let reason_len = usize::try_from(reason_len).map_err(|_| QuicError::ProtocolViolation("reason length overflows usize"))?;
            if cursor.len() < reason_len {
                return Err(QuicError::ProtocolViolation("CONNECTION_CLOSE reason truncated"));
            }
            let reason = &cursor[..reason_len];
            cursor = &cursor[reason_len..];
            Frame::ConnectionClose { error_code, reason }
        }
        t if (FRAME_TYPE_STREAM_BASE..=FRAME_TYPE_STREAM_MAX).contains(&t) => {
            let has_offset = t & 0x04 != 0;
            let has_len = t & 0x02 != 0;
            let fin = t & 0x01 != 0;

            let stream_id = read_varint(&mut cursor)?;
            let offset = if has_offset { read_varint(&mut cursor)? } else { 0 };
            let data = if has_len {
                let len = read_varint(&mut cursor)?;
                let len = usize::try_from(len).map_err(|_| QuicError::ProtocolViolation("STREAM length overflows usize"))?;
                if cursor.len() < len {
                    return Err(QuicError::ProtocolViolation("STREAM frame data truncated"));
                }
                let data = &cursor[..len];
                cursor = &cursor[len..];
                data
            } else {
                // No length field: data extends to the end of the packet.
                let data = cursor;
                cursor = &cursor[cursor.len()..];
                data
            };
            Frame::Stream { stream_id, offset, fin, data }
        }
        _ => return Err(QuicError::ProtocolViolation("unsupported or reserved frame type")),
    };

    Ok((frame, start_len - cursor.len()))
}

/// Encodes a CRYPTO frame, the only frame type this dataplane originates
/// outside of ACKs produced by the recovery loop.
pub fn encode_crypto(offset: u64, data: &[u8], out: &mut Vec<u8>) -> Result<(), QuicError> {
    varint::encode(FRAME_TYPE_CRYPTO, out)?;
    varint::encode(offset, out)?;
    varint::encode(data.len() as u64, out)?;
    out.extend_from_slice(data);
    Ok(())
}

/// Encodes a minimal single-range ACK frame.
pub fn encode_ack(largest_acked: u64, ack_delay: u64, first_ack_range: u64, out: &mut Vec<u8>) -> Result<(), QuicError> {
    varint::encode(FRAME_TYPE_ACK, out)?;
    varint::encode(largest_acked, out)?;
    varint::encode(ack_delay, out)?;
    varint::encode(0, out)?; // range count
    varint::encode(first_ack_range, out)?;
    Ok(())
}

/// Encodes a STREAM frame with explicit offset and length fields set.
pub fn encode_stream(stream_id: u64, offset: u64, data: &[u8], fin: bool, out: &mut Vec<u8>) -> Result<(), QuicError> {
    let mut frame_type = FRAME_TYPE_STREAM_BASE | 0x04 /* OFF */ | 0x02 /* LEN */;
    if fin {
        frame_type |= 0x01;
    }
    varint::encode(frame_type, out)?;
    varint::encode(stream_id, out)?;
    varint::encode(offset, out)?;
    varint::encode(data.len() as u64, out)?;
    out.extend_from_slice(data);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_crypto_frame() {
        let mut buf = Vec::new();
        encode_crypto(42, b"client hello bytes", &mut buf).unwrap();
        let (frame, used) = parse_frame(&buf).unwrap();
        assert_eq!(used, buf.len());
        assert_eq!(frame, Frame::Crypto { offset: 42, data: b"client hello bytes" });
    }

    #[test]
    fn round_trips_a_minimal_ack_frame() {
        let mut buf = Vec::new();
        encode_ack(10, 5, 10, &mut buf).unwrap();
        let (frame, _) = parse_frame(&buf).unwrap();
        assert_eq!(frame, Frame::Ack { largest_acked: 10, ack_delay: 5, first_ack_range: 10 });
    }

    #[test]
    fn parses_padding_and_ping() {
        assert_eq!(parse_frame(&[0x00]).unwrap(), (Frame::Padding, 1));
        assert_eq!(parse_frame(&[0x01]).unwrap(), (Frame::Ping, 1));
    }

    #[test]
    fn parses_connection_close_with_reason() {
        let mut buf = Vec::new();
        varint::encode(FRAME_TYPE_CONNECTION_CLOSE_APP, &mut buf).unwrap();
        varint::encode(7, &mut buf).unwrap();
        varint::encode(3, &mut buf).unwrap();
        buf.extend_from_slice(b"bye");
        let (frame, used) = parse_frame(&buf).unwrap();
        assert_eq!(used, buf.len());
        assert_eq!(frame, Frame::ConnectionClose { error_code: 7, reason: b"bye" });
    }

    #[test]
    fn truncated_crypto_frame_is_an_error() {
        let mut buf = Vec::new();
        varint::encode(FRAME_TYPE_CRYPTO, &mut buf).unwrap();
        varint::encode(0, &mut buf).unwrap();
        varint::encode(10, &mut buf).unwrap();
        buf.extend_from_slice(b"short");
        assert!(parse_frame(&buf).is_err());
    }

    #[test]
    fn unknown_frame_type_is_rejected() {
        assert!(parse_frame(&[0x40, 0xff]).is_err());
    }

    #[test]
    fn round_trips_a_stream_frame_with_fin() {
        let mut buf = Vec::new();
        encode_stream(4, 12, b"h3 payload", true, &mut buf).unwrap();
        let (frame, used) = parse_frame(&buf).unwrap();
        assert_eq!(used, buf.len());
        assert_eq!(frame, Frame::Stream { stream_id: 4, offset: 12, fin: true, data: b"h3 payload" });
    }
}
