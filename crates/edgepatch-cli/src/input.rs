//! Loading collaborator records from files.
//!
//! Files ending in `.yaml` or `.yml` are parsed as YAML, everything else as
//! JSON. A suggestions file holds either a list or a single suggestion.

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use edgepatch_core::{Opportunity, Site, Suggestion};

/// Parse a JSON or YAML file.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse YAML in {}", path.display()))
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse JSON in {}", path.display()))
    }
}

pub fn load_site(path: &Path) -> Result<Site> {
    load(path)
}

pub fn load_opportunity(path: &Path) -> Result<Opportunity> {
    load(path)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SuggestionFile {
    Many(Vec<Suggestion>),
    One(Box<Suggestion>),
}

pub fn load_suggestions(path: &Path) -> Result<Vec<Suggestion>> {
    Ok(match load::<SuggestionFile>(path)? {
        SuggestionFile::Many(all) => all,
        SuggestionFile::One(one) => vec![*one],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_json_list_and_single_suggestion() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("list.json");
        std::fs::write(
            &list,
            r#"[{"id":"a","data":{},"updatedAt":"2024-01-01T00:00:00Z"},
                {"id":"b","updatedAt":"2024-01-02T00:00:00Z"}]"#,
        )
        .unwrap();
        let single = dir.path().join("one.json");
        std::fs::write(&single, r#"{"id":"c","data":{"x":1},"updatedAt":"2024-01-01T00:00:00Z"}"#)
            .unwrap();

        let ids: Vec<String> = load_suggestions(&list).unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(load_suggestions(&single).unwrap()[0].id, "c");
    }

    #[test]
    fn loads_yaml_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.yaml");
        std::fs::write(
            &path,
            "id: site-1\nbaseUrl: https://www.example.com/\nedge:\n  cdnProviders: [fastly]\n",
        )
        .unwrap();

        let site = load_site(&path).unwrap();
        assert_eq!(site.host(), "www.example.com");
        assert_eq!(site.edge.cdn_providers.as_deref(), Some(&["fastly".to_string()][..]));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opp.json");
        std::fs::write(&path, "{").unwrap();

        let err = load_opportunity(&path).unwrap_err();
        assert!(format!("{err:#}").contains("opp.json"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_opportunity(Path::new("/nonexistent/opp.json")).is_err());
    }
}
