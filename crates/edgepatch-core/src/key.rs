//! # Storage Keys
//!
//! Documents are addressed by a key derived from their URL:
//!
//! ```text
//! opportunities/{host}/{sha256(path + query)}   per-URL document
//! opportunities/{host}/config                   domain configuration
//! ```
//!
//! The path digest keeps keys flat and bounded in length regardless of how
//! deep or how long the page URL is. The same relative key is used in the
//! production and preview buckets; only the bucket differs.

use sha2::{Digest, Sha256};
use url::Url;

use crate::error::CoreError;

/// Top-level prefix for all keys written by the engine.
pub const KEY_PREFIX: &str = "opportunities";

/// CDN path prefix under which preview documents are served.
pub const PREVIEW_PATH_PREFIX: &str = "preview";

/// Storage key for one URL's configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigKey {
    host: String,
    key: String,
}

impl ConfigKey {
    /// Derive the key for an absolute `http(s)` URL.
    ///
    /// Fragments are ignored; an empty path is treated as `/`.
    pub fn for_url(url: &Url) -> Result<Self, CoreError> {
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| CoreError::InvalidUrl {
                url: url.to_string(),
                reason: "url has no host".to_string(),
            })?
            .to_ascii_lowercase();

        let mut target = url.path().to_string();
        if target.is_empty() {
            target.push('/');
        }
        if let Some(query) = url.query() {
            target.push('?');
            target.push_str(query);
        }

        let digest = hex(&Sha256::digest(target.as_bytes()));
        Ok(Self {
            key: format!("{KEY_PREFIX}/{host}/{digest}"),
            host,
        })
    }

    /// Key of the domain configuration for `host`.
    pub fn domain_config(host: &str) -> String {
        format!("{KEY_PREFIX}/{}/config", host.to_ascii_lowercase())
    }

    /// Lowercased host the key belongs to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Key relative to its bucket.
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Path invalidated on the CDN for the production document.
    pub fn cdn_path(&self) -> String {
        format!("/{}", self.key)
    }

    /// Path invalidated on the CDN for the preview document.
    pub fn preview_cdn_path(&self) -> String {
        format!("/{PREVIEW_PATH_PREFIX}/{}", self.key)
    }
}

impl std::fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)
    }
}

/// Parse an absolute `http`/`https` URL.
pub fn parse_page_url(raw: &str) -> Result<Url, CoreError> {
    let url = Url::parse(raw.trim()).map_err(|e| CoreError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(CoreError::InvalidUrl {
            url: raw.to_string(),
            reason: "expected an absolute http(s) url".to_string(),
        }),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> ConfigKey {
        ConfigKey::for_url(&Url::parse(raw).unwrap()).unwrap()
    }

    #[test]
    fn key_is_deterministic_and_host_scoped() {
        let a = key("https://WWW.Example.com/blog/post");
        let b = key("https://www.example.com/blog/post#section");
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("opportunities/www.example.com/"));
        assert_eq!(a.as_str().len(), "opportunities/www.example.com/".len() + 64);
    }

    #[test]
    fn query_string_distinguishes_keys() {
        assert_ne!(key("https://example.com/p?a=1"), key("https://example.com/p"));
    }

    #[test]
    fn root_path_digest_matches_slash() {
        let root = key("https://example.com");
        let expected = hex(&Sha256::digest(b"/"));
        assert!(root.as_str().ends_with(&expected));
    }

    #[test]
    fn cdn_paths_are_rooted() {
        let k = key("https://example.com/x");
        assert_eq!(k.cdn_path(), format!("/{}", k.as_str()));
        assert_eq!(k.preview_cdn_path(), format!("/preview/{}", k.as_str()));
    }

    #[test]
    fn domain_config_key_shape() {
        assert_eq!(
            ConfigKey::domain_config("Example.com"),
            "opportunities/example.com/config"
        );
    }

    #[test]
    fn parse_page_url_rejects_relative_and_non_http() {
        assert!(parse_page_url("/just/a/path").is_err());
        assert!(parse_page_url("mailto:someone@example.com").is_err());
        assert!(parse_page_url("ftp://example.com/file").is_err());
        assert!(parse_page_url(" https://example.com/ok ").is_ok());
    }
}
