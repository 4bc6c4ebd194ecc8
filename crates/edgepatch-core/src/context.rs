//! # Collaborator Records
//!
//! Sites, opportunities, and suggestions are owned by an external data
//! layer. The engine only needs the narrow view modeled here, which is also
//! the JSON shape the CLI reads.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cdn::CdnProviderConfig;

/// A customer site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    pub base_url: Url,
    #[serde(default)]
    pub edge: SiteEdgeConfig,
}

impl Site {
    /// Host name of the base URL, or the empty string for host-less URLs.
    pub fn host(&self) -> &str {
        self.base_url.host_str().unwrap_or_default()
    }
}

/// Per-site edge deployment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteEdgeConfig {
    /// CDN providers to invalidate. `None` falls back to the engine default.
    #[serde(default)]
    pub cdn_providers: Option<Vec<String>>,
    /// Per-provider credential overrides, layered over the engine's.
    #[serde(default)]
    pub cdn: BTreeMap<String, CdnProviderConfig>,
    #[serde(default = "default_true")]
    pub preview_enabled: bool,
}

impl Default for SiteEdgeConfig {
    fn default() -> Self {
        Self {
            cdn_providers: None,
            cdn: BTreeMap::new(),
            preview_enabled: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// A category of content issue grouping suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: String,
    /// Category label, e.g. `headings` or `faq`; selects the mapper.
    #[serde(rename = "type")]
    pub opportunity_type: String,
}

impl Opportunity {
    pub fn new(id: impl Into<String>, opportunity_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            opportunity_type: opportunity_type.into(),
        }
    }
}

/// One proposed fix belonging to an opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: String,
    /// Category-specific payload; each mapper reads its own shape.
    #[serde(default)]
    pub data: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl Suggestion {
    pub fn new(id: impl Into<String>, data: serde_json::Value, updated_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            data,
            updated_at,
        }
    }

    /// Timestamp stamped on patches derived from this suggestion.
    ///
    /// Uses `data.scrapedAt` when it parses as RFC 3339, else `updated_at`.
    /// Never wall-clock, so reprocessing yields identical patches.
    pub fn last_updated_ms(&self) -> i64 {
        self.data
            .get("scrapedAt")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.timestamp_millis())
            .unwrap_or_else(|| self.updated_at.timestamp_millis())
    }

    /// A string field of `data`, trimmed; `None` when absent or blank.
    pub fn data_str(&self, field: &str) -> Option<&str> {
        self.data
            .get(field)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Verdict of a mapper's eligibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    pub eligible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Eligibility {
    pub fn eligible() -> Self {
        Self {
            eligible: true,
            reason: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            eligible: false,
            reason: Some(reason.into()),
        }
    }

    /// Rejection reason, or a generic one for eligible verdicts.
    pub fn reason_or_default(&self) -> String {
        self.reason
            .clone()
            .unwrap_or_else(|| "suggestion is not deployable".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn last_updated_prefers_scraped_at() {
        let s = Suggestion::new(
            "s1",
            serde_json::json!({"scrapedAt": "2025-01-02T03:04:05Z"}),
            at(1_000),
        );
        assert_eq!(s.last_updated_ms(), 1_735_787_045_000);
    }

    #[test]
    fn last_updated_falls_back_to_updated_at() {
        let s = Suggestion::new("s1", serde_json::json!({"scrapedAt": "yesterday"}), at(1_234));
        assert_eq!(s.last_updated_ms(), 1_234);
        let s = Suggestion::new("s1", serde_json::Value::Null, at(99));
        assert_eq!(s.last_updated_ms(), 99);
    }

    #[test]
    fn data_str_trims_and_drops_blank() {
        let s = Suggestion::new("s", serde_json::json!({"a": "  x ", "b": "  ", "c": 3}), at(0));
        assert_eq!(s.data_str("a"), Some("x"));
        assert_eq!(s.data_str("b"), None);
        assert_eq!(s.data_str("c"), None);
        assert_eq!(s.data_str("missing"), None);
    }

    #[test]
    fn site_edge_defaults_enable_preview() {
        let site: Site = serde_json::from_value(serde_json::json!({
            "id": "site-1",
            "baseUrl": "https://www.example.com"
        }))
        .unwrap();
        assert!(site.edge.preview_enabled);
        assert!(site.edge.cdn_providers.is_none());
        assert_eq!(site.host(), "www.example.com");
    }

    #[test]
    fn opportunity_type_uses_type_field() {
        let opp: Opportunity =
            serde_json::from_value(serde_json::json!({"id": "o", "type": "faq"})).unwrap();
        assert_eq!(opp.opportunity_type, "faq");
    }
}
