//! Request key generation.

use sha2::{Digest, Sha256};

/// Compute the cache key identifying one request: method plus canonical URL.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_stability() {
        let key1 = compute_request_key("GET", "http://localhost:8080/index.html");
        let key2 = compute_request_key("GET", "http://localhost:8080/index.html");
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_key_differs_by_url() {
        let key1 = compute_request_key("GET", "http://localhost:8080/index.html");
        let key2 = compute_request_key("GET", "http://localhost:8080/app.js");
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_key_differs_by_query() {
        let key1 = compute_request_key("GET", "http://localhost:8080/rab.html?floor=1");
        let key2 = compute_request_key("GET", "http://localhost:8080/rab.html?floor=2");
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_key_differs_by_method() {
        let key1 = compute_request_key("GET", "http://localhost:8080/index.html");
        let key2 = compute_request_key("HEAD", "http://localhost:8080/index.html");
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_key_format() {
        let key = compute_request_key("GET", "http://localhost:8080/");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
