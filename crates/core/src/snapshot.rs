//! Stored response snapshots.
//!
//! A snapshot is the immutable, fully-buffered copy of one successful HTTP
//! response. Because the body is a `Bytes` handle, cloning a snapshot is
//! cheap: the same fetched body can be handed to the caller and written to
//! the cache without re-reading anything.

use bytes::Bytes;

/// Response headers never replayed from the cache.
///
/// Hop-by-hop headers describe the original connection, not the resource;
/// content-length/encoding are recomputed for the stored (decoded) body.
const STRIPPED_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
    "content-encoding",
];

/// An immutable snapshot of a single cached HTTP response.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Request key: hex SHA-256 over method and canonical URL.
    pub key: String,
    /// Request method (always GET for stored entries).
    pub method: String,
    /// Canonical request URL the entry is keyed by.
    pub url: String,
    /// HTTP status of the stored response.
    pub status: u16,
    /// Content-Type header, if present.
    pub content_type: Option<String>,
    /// Replayable response headers (hop-by-hop headers stripped).
    pub headers: Vec<(String, String)>,
    /// Fully-buffered response body.
    pub body: Bytes,
    /// RFC 3339 timestamp of the originating fetch.
    pub fetched_at: String,
}

/// Filter response headers down to the set worth replaying from the cache.
pub fn retain_headers(headers: &[(String, String)]) -> Vec<(String, String)> {
    headers
        .iter()
        .filter(|(name, _)| !STRIPPED_HEADERS.contains(&name.to_ascii_lowercase().as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retain_headers_strips_hop_by_hop() {
        let headers = vec![
            ("Content-Type".to_string(), "text/html".to_string()),
            ("Connection".to_string(), "keep-alive".to_string()),
            ("Transfer-Encoding".to_string(), "chunked".to_string()),
            ("Cache-Control".to_string(), "no-store".to_string()),
        ];

        let retained = retain_headers(&headers);
        assert_eq!(retained.len(), 2);
        assert!(retained.iter().any(|(n, _)| n == "Content-Type"));
        assert!(retained.iter().any(|(n, _)| n == "Cache-Control"));
    }

    #[test]
    fn test_retain_headers_strips_content_length() {
        let headers = vec![("content-length".to_string(), "1234".to_string())];
        assert!(retain_headers(&headers).is_empty());
    }

    #[test]
    fn test_snapshot_clone_shares_body() {
        let body = Bytes::from_static(b"<html></html>");
        let snapshot = Snapshot {
            key: "abc".to_string(),
            method: "GET".to_string(),
            url: "http://localhost/index.html".to_string(),
            status: 200,
            content_type: Some("text/html".to_string()),
            headers: Vec::new(),
            body: body.clone(),
            fetched_at: chrono::Utc::now().to_rfc3339(),
        };

        let copy = snapshot.clone();
        assert_eq!(copy.body, body);
    }
}
