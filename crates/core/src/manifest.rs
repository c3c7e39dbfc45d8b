//! Install manifest resolution.
//!
//! The manifest is the configured, ordered list of request targets that must
//! be cached before a generation is considered ready. Relative targets are
//! resolved against the upstream origin; absolute http(s) URLs (third-party
//! assets) are kept as-is. Resolution happens once at startup.

use url::Url;

use crate::Error;
use crate::cache::hash::compute_request_key;

/// The resolved install manifest for the current version.
#[derive(Debug, Clone)]
pub struct Manifest {
    targets: Vec<Url>,
}

impl Manifest {
    /// Resolve configured targets against the upstream origin.
    ///
    /// Targets that canonicalize to the same request key collapse to the
    /// first occurrence, so an install writes at most one entry per key.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` for an empty target, a relative target
    /// that does not resolve against the upstream, or an absolute target
    /// with a non-http(s) scheme.
    pub fn resolve(targets: &[String], upstream: &Url) -> Result<Self, Error> {
        let mut resolved = Vec::with_capacity(targets.len());
        let mut seen = Vec::with_capacity(targets.len());

        for target in targets {
            let url = resolve_target(target, upstream)?;
            let key = compute_request_key("GET", url.as_str());
            if !seen.contains(&key) {
                seen.push(key);
                resolved.push(url);
            }
        }

        Ok(Self { targets: resolved })
    }

    /// Resolved targets in configured order.
    pub fn targets(&self) -> &[Url] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// True if the resolved target is a manifest member.
    pub fn contains(&self, url: &Url) -> bool {
        self.targets.contains(url)
    }
}

/// Resolve one request target against the upstream origin.
///
/// A target starting with `/` is joined onto the upstream; anything else
/// must be an absolute http(s) URL. Fragments are dropped either way.
pub fn resolve_target(target: &str, upstream: &Url) -> Result<Url, Error> {
    let trimmed = target.trim();

    if trimmed.is_empty() {
        return Err(Error::InvalidUrl("empty manifest target".to_string()));
    }

    let mut url = if trimmed.starts_with('/') {
        upstream
            .join(trimmed)
            .map_err(|e| Error::InvalidUrl(format!("{trimmed}: {e}")))?
    } else {
        let parsed = Url::parse(trimmed).map_err(|e| Error::InvalidUrl(format!("{trimmed}: {e}")))?;
        match parsed.scheme() {
            "http" | "https" => parsed,
            scheme => return Err(Error::InvalidUrl(format!("unsupported scheme: {scheme}"))),
        }
    };

    url.set_fragment(None);

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream() -> Url {
        Url::parse("http://localhost:8080").unwrap()
    }

    #[test]
    fn test_resolve_relative_targets() {
        let manifest = Manifest::resolve(&["/index.html".to_string(), "/app.js".to_string()], &upstream()).unwrap();

        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.targets()[0].as_str(), "http://localhost:8080/index.html");
        assert_eq!(manifest.targets()[1].as_str(), "http://localhost:8080/app.js");
    }

    #[test]
    fn test_resolve_keeps_absolute_targets() {
        let manifest =
            Manifest::resolve(&["https://cdn.example.com/chart.min.js".to_string()], &upstream()).unwrap();

        assert_eq!(manifest.targets()[0].as_str(), "https://cdn.example.com/chart.min.js");
    }

    #[test]
    fn test_resolve_preserves_order() {
        let manifest = Manifest::resolve(
            &["/b.css".to_string(), "/a.css".to_string(), "/index.html".to_string()],
            &upstream(),
        )
        .unwrap();

        let paths: Vec<&str> = manifest.targets().iter().map(|u| u.path()).collect();
        assert_eq!(paths, vec!["/b.css", "/a.css", "/index.html"]);
    }

    #[test]
    fn test_resolve_collapses_duplicates() {
        let manifest = Manifest::resolve(
            &["/index.html".to_string(), "/index.html#top".to_string(), "/index.html".to_string()],
            &upstream(),
        )
        .unwrap();

        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn test_resolve_rejects_empty_target() {
        let result = Manifest::resolve(&["   ".to_string()], &upstream());
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_resolve_rejects_bad_scheme() {
        let result = Manifest::resolve(&["file:///etc/passwd".to_string()], &upstream());
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_resolve_target_drops_fragment() {
        let url = resolve_target("/index.html#checklist", &upstream()).unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/index.html");
    }

    #[test]
    fn test_resolve_target_preserves_query() {
        let url = resolve_target("/rab.html?floor=2", &upstream()).unwrap();
        assert_eq!(url.query(), Some("floor=2"));
    }

    #[test]
    fn test_contains() {
        let manifest = Manifest::resolve(&["/index.html".to_string()], &upstream()).unwrap();
        let member = resolve_target("/index.html", &upstream()).unwrap();
        let other = resolve_target("/app.js", &upstream()).unwrap();

        assert!(manifest.contains(&member));
        assert!(!manifest.contains(&other));
    }
}
