//! Zero-allocation HTTP/1.x request parser: request line, headers,
//! and body all reference the caller's buffer directly.

use arrayvec::ArrayVec;

use super::request::{
    Header, Method, Request, Version, MAX_HEADERS, MAX_HEADER_NAME_LEN, MAX_HEADER_VALUE_LEN,
    MAX_PATH_LEN, MAX_REQUEST_SIZE,
};
use crate::error::Http1Error;

fn find_crlf(buf: &[u8]) -> Option<usize> {
    memchr::memmem::find(buf, b"\r\n")
}

fn trim_ows(s: &str) -> &str {
    s.trim_matches(|c| c == ' ' || c == '\t')
}

/// Parses one HTTP/1.x request from the start of `buf`.
pub fn parse_request(buf: &[u8]) -> Result<Request<'_>, Http1Error> {
    if buf.len() > MAX_REQUEST_SIZE {
        return Err(Http1Error::RequestTooLarge);
    }

    let line_end = find_crlf(buf).ok_or(Http1Error::Incomplete)?;
    let line = std::str::from_utf8(&buf[..line_end]).map_err(|_| Http1Error::MalformedRequestLine)?;
    let mut parts = line.splitn(3, ' ');
    let method_str = parts.next().ok_or(Http1Error::MalformedRequestLine)?;
    let target = parts.next().ok_or(Http1Error::MalformedRequestLine)?;
    let version_str = parts.next().ok_or(Http1Error::MalformedRequestLine)?;

    let method = Method::parse(method_str);

    let (path, query) = match target.find('?') {
        Some(i) => (&target[..i], Some(&target[i + 1..])),
        None => (target, None),
    };
    if path.len() > MAX_PATH_LEN {
        return Err(Http1Error::PathTooLong);
    }

    let version = match version_str {
        "HTTP/1.1" => Version::Http11,
        "HTTP/1.0" => Version::Http10,
        _ => return Err(Http1Error::MalformedRequestLine),
    };

    let mut offset = line_end + 2;
    let mut headers: ArrayVec<Header<'_>, MAX_HEADERS> = ArrayVec::new();
    let mut content_length: Option<usize> = None;

    loop {
        let rest = &buf[offset..];
        let rel_end = find_crlf(rest).ok_or(Http1Error::Incomplete)?;
        if rel_end == 0 {
            // Blank line: end of headers.
            offset += 2;
            break;
        }
        let header_line =
            std::str::from_utf8(&rest[..rel_end]).map_err(|_| Http1Error::MalformedHeaderLine)?;
        let colon = header_line.find(':').ok_or(Http1Error::MalformedHeaderLine)?;
        let name = header_line[..colon].trim_end();
        let value = trim_ows(&header_line[colon + 1..]);

        if name.len() > MAX_HEADER_NAME_LEN {
            return Err(Http1Error::HeaderNameTooLong);
        }
        if value.len() > MAX_HEADER_VALUE_LEN {
            return Err(Http1Error::HeaderValueTooLong);
        }
        if headers.len() >= MAX_HEADERS {
            return Err(Http1Error::TooManyHeaders);
        }
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse::<usize>().ok();
        }
        headers.push(Header { name, value });
        offset += rel_end + 2;
    }

    let body: &[u8] = match content_length {
        Some(len) => buf.get(offset..offset + len).ok_or(Http1Error::Incomplete)?,
        None => &buf[offset..],
    };

    Ok(Request { method, path, query, version, headers, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hello_request() {
        let raw = b"GET /hello HTTP/1.1\r\nHost: x\r\n\r\n";
        let req = parse_request(raw).unwrap();
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.path, "/hello");
        assert_eq!(req.version, Version::Http11);
        assert_eq!(req.header("host"), Some("x"));
        assert!(req.body.is_empty());
    }

    #[test]
    fn unknown_method_maps_to_unknown() {
        let raw = b"FROB / HTTP/1.1\r\n\r\n";
        let req = parse_request(raw).unwrap();
        assert_eq!(req.method, Method::Unknown);
    }

    #[test]
    fn query_string_is_split_from_path() {
        let raw = b"GET /search?q=rust HTTP/1.1\r\n\r\n";
        let req = parse_request(raw).unwrap();
        assert_eq!(req.path, "/search");
        assert_eq!(req.query, Some("q=rust"));
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let raw = b"GET / HTTP/1.1\r\nContent-Type: text/plain\r\n\r\n";
        let req = parse_request(raw).unwrap();
        assert_eq!(req.header("content-type"), Some("text/plain"));
        assert_eq!(req.header("CONTENT-TYPE"), Some("text/plain"));
    }

    #[test]
    fn body_is_sliced_by_content_length() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
        let req = parse_request(raw).unwrap();
        assert_eq!(req.body, b"hello");
    }

    #[test]
    fn request_exactly_16kb_parses() {
        let prefix_len = "POST / HTTP/1.1\r\nContent-Length: ".len();
        let suffix_len = "\r\n\r\n".len();
        // body_len is itself 5 digits in this range, which is accounted
        // for below and checked by the sanity assertion.
        let body_len = MAX_REQUEST_SIZE - prefix_len - suffix_len - 5;
        let header = format!("POST / HTTP/1.1\r\nContent-Length: {body_len}\r\n\r\n");
        let mut raw = header.into_bytes();
        raw.extend(std::iter::repeat(b'a').take(body_len));
        assert_eq!(raw.len(), MAX_REQUEST_SIZE, "test construction sanity check");
        assert!(parse_request(&raw).is_ok());
    }

    #[test]
    fn request_over_16kb_fails() {
        let raw = vec![b'a'; MAX_REQUEST_SIZE + 1];
        assert_eq!(parse_request(&raw), Err(Http1Error::RequestTooLarge));
    }

    #[test]
    fn path_exactly_8kb_parses() {
        let path = "/".to_string() + &"a".repeat(MAX_PATH_LEN - 1);
        assert_eq!(path.len(), MAX_PATH_LEN);
        let raw = format!("GET {path} HTTP/1.1\r\n\r\n");
        assert!(parse_request(raw.as_bytes()).is_ok());
    }

    #[test]
    fn path_over_8kb_fails() {
        let path = "/".to_string() + &"a".repeat(MAX_PATH_LEN);
        let raw = format!("GET {path} HTTP/1.1\r\n\r\n");
        assert_eq!(parse_request(raw.as_bytes()), Err(Http1Error::PathTooLong));
    }

    #[test]
    fn too_many_headers_fails() {
        let mut raw = String::from("GET / HTTP/1.1\r\n");
        for i in 0..=MAX_HEADERS {
            raw.push_str(&format!("X-H{i}: v\r\n"));
        }
        raw.push_str("\r\n");
        assert_eq!(parse_request(raw.as_bytes()), Err(Http1Error::TooManyHeaders));
    }

    #[test]
    fn incomplete_request_is_reported_distinctly() {
        let raw = b"GET / HTTP/1.1\r\nHost: x\r\n";
        assert_eq!(parse_request(raw), Err(Http1Error::Incomplete));
    }
}
