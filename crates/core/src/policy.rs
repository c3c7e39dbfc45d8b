//! Cacheability policy for lazily populated entries.
//!
//! Steady-state population is deliberately narrow: only plain same-origin
//! GET responses with status 200 are stored. Redirected, cross-origin and
//! non-200 responses pass through to the caller untouched.

use url::Url;

/// True if two URLs share scheme, host and port.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme() && a.host_str() == b.host_str() && a.port_or_known_default() == b.port_or_known_default()
}

/// Decide whether a fetched response may be written to the cache.
///
/// A response is cacheable when all of the following hold:
/// - the request method is GET,
/// - the final status is 200,
/// - no redirect was followed (requested and final URL are identical),
/// - the target shares the configured upstream's origin.
pub fn should_cache(method: &str, status: u16, requested: &Url, final_url: &Url, upstream: &Url) -> bool {
    method == "GET" && status == 200 && requested == final_url && same_origin(requested, upstream)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_same_origin_ignores_path() {
        assert!(same_origin(&url("http://localhost:8080/a"), &url("http://localhost:8080/b?q=1")));
    }

    #[test]
    fn test_same_origin_default_port() {
        assert!(same_origin(&url("https://example.com/"), &url("https://example.com:443/x")));
        assert!(!same_origin(&url("https://example.com/"), &url("https://example.com:8443/x")));
    }

    #[test]
    fn test_should_cache_plain_hit() {
        let upstream = url("http://localhost:8080/");
        let target = url("http://localhost:8080/app.js");
        assert!(should_cache("GET", 200, &target, &target, &upstream));
    }

    #[test]
    fn test_should_cache_rejects_non_200() {
        let upstream = url("http://localhost:8080/");
        let target = url("http://localhost:8080/missing.js");
        assert!(!should_cache("GET", 404, &target, &target, &upstream));
        assert!(!should_cache("GET", 500, &target, &target, &upstream));
    }

    #[test]
    fn test_should_cache_rejects_redirected() {
        let upstream = url("http://localhost:8080/");
        let requested = url("http://localhost:8080/old");
        let final_url = url("http://localhost:8080/new");
        assert!(!should_cache("GET", 200, &requested, &final_url, &upstream));
    }

    #[test]
    fn test_should_cache_rejects_cross_origin() {
        let upstream = url("http://localhost:8080/");
        let target = url("https://cdn.example.com/lib.js");
        assert!(!should_cache("GET", 200, &target, &target, &upstream));
    }

    #[test]
    fn test_should_cache_rejects_non_get() {
        let upstream = url("http://localhost:8080/");
        let target = url("http://localhost:8080/form");
        assert!(!should_cache("POST", 200, &target, &target, &upstream));
    }
}
