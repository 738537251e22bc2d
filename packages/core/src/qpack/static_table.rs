//! The 99-entry QPACK static table (RFC 9204 Appendix A). Indices 0..98 are
//! canonical and MUST NOT be renumbered.

/// One static-table entry: a header name and, where the RFC fixes one, a
/// value. An empty value means "name only" — any value may accompany it.
pub struct StaticEntry(pub &'static str, pub &'static str);

pub const STATIC_TABLE: [StaticEntry; 99] = [
    StaticEntry(":authority", ""),
    StaticEntry(":path", "/"),
    StaticEntry("age", "0"),
    StaticEntry("content-disposition", ""),
    StaticEntry("content-length", "0"),
    StaticEntry("cookie", ""),
    StaticEntry("date", ""),
    StaticEntry("etag", ""),
    StaticEntry("if-modified-since", ""),
    StaticEntry("if-none-match", ""),
    StaticEntry("last-modified", ""),
    StaticEntry("link", ""),
    StaticEntry("location", ""),
    StaticEntry("referer", ""),
    StaticEntry("set-cookie", ""),
    StaticEntry(":method", "CONNECT"),
    StaticEntry(":method", "DELETE"),
    StaticEntry(":method", "GET"),
    StaticEntry(":method", "HEAD"),
    StaticEntry(":method", "OPTIONS"),
    StaticEntry(":method", "POST"),
    StaticEntry(":method", "PUT"),
    StaticEntry(":scheme", "http"),
    StaticEntry(":scheme", "https"),
    StaticEntry(":status", "103"),
    StaticEntry(":status", "200"),
    StaticEntry(":status", "304"),
    StaticEntry(":status", "404"),
    StaticEntry(":status", "503"),
    StaticEntry("accept", "*/*"),
    StaticEntry("accept", "application/dns-message"),
    StaticEntry("accept-encoding", "gzip, deflate, br"),
    StaticEntry("accept-ranges", "bytes"),
    StaticEntry("access-control-allow-headers", "cache-control"),
    StaticEntry("access-control-allow-headers", "content-type"),
    StaticEntry("access-control-allow-origin", "*"),
    StaticEntry("cache-control", "max-age=0"),
    StaticEntry("cache-control", "max-age=2592000"),
    StaticEntry("cache-control", "max-age=604800"),
    StaticEntry("cache-control", "no-cache"),
    StaticEntry("cache-control", "no-store"),
    StaticEntry("cache-control", "public, max-age=31536000"),
    StaticEntry("content-encoding", "br"),
    StaticEntry("content-encoding", "gzip"),
    StaticEntry("content-type", "application/dns-message"),
    StaticEntry("content-type", "application/javascript"),
    StaticEntry("content-type", "application/json"),
    StaticEntry("content-type", "application/x-www-form-urlencoded"),
    StaticEntry("content-type", "image/gif"),
    StaticEntry("content-type", "image/jpeg"),
    StaticEntry("content-type", "image/png"),
    StaticEntry("content-type", "text/css"),
    StaticEntry("content-type", "text/html; charset=utf-8"),
    StaticEntry("content-type", "text/plain"),
    StaticEntry("content-type", "text/plain;charset=utf-8"),
    StaticEntry("range", "bytes=0-"),
    StaticEntry("strict-transport-security", "max-age=31536000"),
    StaticEntry("strict-transport-security", "max-age=31536000; includesubdomains"),
    StaticEntry("strict-transport-security", "max-age=31536000; includesubdomains; preload"),
    StaticEntry("vary", "accept-encoding"),
    StaticEntry("vary", "origin"),
    StaticEntry("x-content-type-options", "nosniff"),
    StaticEntry("x-xss-protection", "1; mode=block"),
    StaticEntry(":status", "100"),
    StaticEntry(":status", "204"),
    StaticEntry(":status", "206"),
    StaticEntry(":status", "302"),
    StaticEntry(":status", "400"),
    StaticEntry(":status", "403"),
    StaticEntry(":status", "421"),
    StaticEntry(":status", "425"),
    StaticEntry(":status", "500"),
    StaticEntry("accept-language", ""),
    StaticEntry("access-control-allow-credentials", "FALSE"),
    StaticEntry("access-control-allow-credentials", "TRUE"),
    StaticEntry("access-control-allow-headers", "*"),
    StaticEntry("access-control-allow-methods", "get"),
    StaticEntry("access-control-allow-methods", "get, post, options"),
    StaticEntry("access-control-allow-methods", "options"),
    StaticEntry("access-control-expose-headers", "content-length"),
    StaticEntry("access-control-request-headers", "content-type"),
    StaticEntry("access-control-request-method", "get"),
    StaticEntry("access-control-request-method", "post"),
    StaticEntry("alt-svc", "clear"),
    StaticEntry("authorization", ""),
    StaticEntry(
        "content-security-policy",
        "script-src 'none'; object-src 'none'; base-uri 'none'",
    ),
    StaticEntry("early-data", "1"),
    StaticEntry("expect-ct", ""),
    StaticEntry("forwarded", ""),
    StaticEntry("if-range", ""),
    StaticEntry("origin", ""),
    StaticEntry("purpose", "prefetch"),
    StaticEntry("server", ""),
    StaticEntry("timing-allow-origin", "*"),
    StaticEntry("upgrade-insecure-requests", "1"),
    StaticEntry("user-agent", ""),
    StaticEntry("x-forwarded-for", ""),
    StaticEntry("x-frame-options", "deny"),
    StaticEntry("x-frame-options", "sameorigin"),
];

/// Looks up an entry by index.
#[must_use]
pub fn lookup(index: u64) -> Option<&'static StaticEntry> {
    usize::try_from(index).ok().and_then(|i| STATIC_TABLE.get(i))
}

/// Finds the first entry whose name matches (case-sensitive; QPACK names
/// are always lower-case on the wire).
#[must_use]
pub fn find_by_name(name: &str) -> Option<u64> {
    STATIC_TABLE.iter().position(|e| e.0 == name).map(|i| i as u64)
}

/// Finds an entry matching both name and value exactly.
#[must_use]
pub fn find_exact(name: &str, value: &str) -> Option<u64> {
    STATIC_TABLE
        .iter()
        .position(|e| e.0 == name && e.1 == value)
        .map(|i| i as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_99_entries() {
        assert_eq!(STATIC_TABLE.len(), 99);
    }

    #[test]
    fn canonical_indices_from_rfc_example() {
        assert_eq!(STATIC_TABLE[17].0, ":method");
        assert_eq!(STATIC_TABLE[17].1, "GET");
        assert_eq!(STATIC_TABLE[23].1, "https");
        assert_eq!(STATIC_TABLE[0].0, ":authority");
        assert_eq!(STATIC_TABLE[1].1, "/");
        assert_eq!(STATIC_TABLE[25].1, "200");
        assert_eq!(STATIC_TABLE[53].1, "text/plain");
    }

    #[test]
    fn find_exact_and_find_by_name_agree_with_lookup() {
        let idx = find_exact(":method", "GET").expect("GET is a static entry");
        assert_eq!(idx, 17);
        assert_eq!(lookup(idx).unwrap().1, "GET");
        assert_eq!(find_by_name(":path"), Some(1));
    }

    #[test]
    fn unknown_index_returns_none() {
        assert!(lookup(99).is_none());
        assert!(find_by_name("x-does-not-exist").is_none());
    }
}
