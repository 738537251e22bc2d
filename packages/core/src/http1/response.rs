//! HTTP/1.x response formatting into a caller-owned buffer.

use crate::error::Http1Error;

/// Writes a response into `out`, returning the length of the occupied
/// prefix. Always emits real CRLF bytes (never the literal two-character
/// sequence `\r` without a following `\n`, and never a lone `\n`).
pub fn format_response(
    out: &mut [u8],
    status: u16,
    reason: &str,
    headers: &[(&str, &str)],
    body: Option<&[u8]>,
) -> Result<usize, Http1Error> {
    let mut buf = Vec::with_capacity(256 + body.map_or(0, <[u8]>::len));
    buf.extend_from_slice(format!("HTTP/1.1 {status} {reason}\r\n").as_bytes());
    for (name, value) in headers {
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    if let Some(body) = body {
        buf.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
    }
    buf.extend_from_slice(b"Connection: keep-alive\r\n");
    buf.extend_from_slice(b"\r\n");
    if let Some(body) = body {
        buf.extend_from_slice(body);
    }

    if buf.len() > out.len() {
        return Err(Http1Error::BufferTooSmall);
    }
    out[..buf.len()].copy_from_slice(&buf);
    Ok(buf.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_the_canonical_hello_response() {
        let mut out = [0u8; 256];
        let len = format_response(
            &mut out,
            200,
            "OK",
            &[("Content-Type", "text/plain")],
            Some(b"Hello, Blitz!"),
        )
        .unwrap();
        let text = std::str::from_utf8(&out[..len]).unwrap();
        assert_eq!(
            text,
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 13\r\nConnection: keep-alive\r\n\r\nHello, Blitz!"
        );
    }

    #[test]
    fn every_line_ends_in_real_crlf() {
        let mut out = [0u8; 256];
        let len = format_response(&mut out, 204, "No Content", &[], None).unwrap();
        let text = std::str::from_utf8(&out[..len]).unwrap();
        assert!(!text.contains("\\r"));
        for line in text.split("\r\n").filter(|l| !l.is_empty()) {
            assert!(!line.contains('\r') && !line.contains('\n'));
        }
    }

    #[test]
    fn buffer_too_small_is_reported() {
        let mut out = [0u8; 4];
        let err = format_response(&mut out, 200, "OK", &[], Some(b"body")).unwrap_err();
        assert_eq!(err, Http1Error::BufferTooSmall);
    }
}
