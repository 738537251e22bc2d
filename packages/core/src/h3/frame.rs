//! HTTP/3 frame layout: `varint type ‖ varint length ‖ payload` (RFC 9114
//! §7.2).

use bytes::Bytes;

use super::settings::Settings;
use crate::error::H3FrameError;
use crate::varint;

const FRAME_DATA: u64 = 0x00;
const FRAME_HEADERS: u64 = 0x01;
const FRAME_SETTINGS: u64 = 0x04;
const FRAME_GOAWAY: u64 = 0x07;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Data(Bytes),
    Headers(Bytes),
    Settings(Settings),
    GoAway(u64),
    /// A recognized-but-unhandled or wholly unknown frame type, already
    /// skipped past its payload.
    Unknown { frame_type: u64 },
}

/// Parses one frame from the start of `buf`. Returns the frame and the
/// number of bytes consumed (header + payload), or `Ok(None)` if `buf`
/// does not yet contain a complete frame header.
pub fn parse_frame(buf: &[u8]) -> Result<Option<(Frame, usize)>, H3FrameError> {
    let Ok((frame_type, type_len)) = varint::decode(buf) else { return Ok(None) };
    let rest = &buf[type_len..];
    let Ok((length, len_len)) = varint::decode(rest) else { return Ok(None) };
    let header_len = type_len + len_len;
    let payload_len = usize::try_from(length).map_err(|_| H3FrameError::Truncated {
        declared: length,
        available: buf.len().saturating_sub(header_len),
    })?;

    let payload_start = header_len;
    let payload_end = payload_start + payload_len;
    if buf.len() < payload_end {
        return Ok(None);
    }
    let payload = &buf[payload_start..payload_end];

    let frame = match frame_type {
        FRAME_DATA => Frame::Data(Bytes::copy_from_slice(payload)),
        FRAME_HEADERS => Frame::Headers(Bytes::copy_from_slice(payload)),
        FRAME_SETTINGS => Frame::Settings(Settings::parse(payload)),
        FRAME_GOAWAY => {
            let (id, _) = varint::decode(payload).unwrap_or((0, 0));
            Frame::GoAway(id)
        }
        other => Frame::Unknown { frame_type: other },
    };
    Ok(Some((frame, payload_end)))
}

/// Encodes `frame` as `varint type ‖ varint length ‖ payload`.
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    let (frame_type, payload) = match frame {
        Frame::Data(bytes) => (FRAME_DATA, bytes.to_vec()),
        Frame::Headers(bytes) => (FRAME_HEADERS, bytes.to_vec()),
        Frame::Settings(settings) => (FRAME_SETTINGS, settings.encode()),
        Frame::GoAway(id) => {
            let mut payload = Vec::new();
            varint::encode(*id, &mut payload).ok();
            (FRAME_GOAWAY, payload)
        }
        Frame::Unknown { frame_type } => (*frame_type, Vec::new()),
    };
    let mut out = Vec::with_capacity(payload.len() + 8);
    varint::encode(frame_type, &mut out).ok();
    varint::encode(payload.len() as u64, &mut out).ok();
    out.extend_from_slice(&payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_frame_round_trips() {
        let frame = Frame::Data(Bytes::from_static(b"Hello, Blitz!"));
        let encoded = encode_frame(&frame);
        let (decoded, used) = parse_frame(&encoded).unwrap().unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(used, encoded.len());
    }

    #[test]
    fn unknown_frame_type_is_skipped_not_rejected() {
        let mut buf = Vec::new();
        crate::varint::encode(0x21, &mut buf).unwrap(); // reserved/grease-like type
        crate::varint::encode(3, &mut buf).unwrap();
        buf.extend_from_slice(b"abc");
        let (decoded, used) = parse_frame(&buf).unwrap().unwrap();
        assert_eq!(decoded, Frame::Unknown { frame_type: 0x21 });
        assert_eq!(used, buf.len());
    }

    #[test]
    fn incomplete_payload_reports_none_not_error() {
        let mut buf = Vec::new();
        crate::varint::encode(FRAME_DATA, &mut buf).unwrap();
        crate::varint::encode(10, &mut buf).unwrap();
        buf.extend_from_slice(b"short");
        assert_eq!(parse_frame(&buf).unwrap(), None);
    }

    #[test]
    fn goaway_round_trips() {
        let frame = Frame::GoAway(42);
        let encoded = encode_frame(&frame);
        let (decoded, _) = parse_frame(&encoded).unwrap().unwrap();
        assert_eq!(decoded, frame);
    }
}
