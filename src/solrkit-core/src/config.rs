use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::document::Field;
use crate::search_field::FieldPriorities;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_server_address")]
    pub server_address: String,
    #[serde(default = "default_server_port")]
    pub server_port: String,
    #[serde(default = "default_server_directory")]
    pub server_directory: String,

    // Search defaults
    #[serde(default = "default_search_field")]
    pub default_search_field: String,
    #[serde(default)]
    pub field_priorities: Vec<FieldPriority>,
    /// Legacy `fieldPriorities.xml`; takes precedence over `field_priorities`
    #[serde(default)]
    pub field_priorities_file: Option<String>,

    // Fields appended to every indexed document
    #[serde(default)]
    pub default_fields: BTreeMap<String, String>,

    // HTTP client
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FieldPriority {
    pub field: String,
    pub weight: f64,
}

fn default_server_address() -> String {
    "http://127.0.0.1".to_string()
}

fn default_server_port() -> String {
    "8080".to_string()
}

fn default_server_directory() -> String {
    "solr".to_string()
}

fn default_search_field() -> String {
    "content".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// `<address>:<port>/<directory>`
    pub fn server_url(&self) -> String {
        format!(
            "{}:{}/{}",
            self.server_address.trim_end_matches('/'),
            self.server_port,
            self.server_directory.trim_matches('/')
        )
    }

    pub fn field_priorities(&self) -> anyhow::Result<FieldPriorities> {
        if let Some(path) = &self.field_priorities_file {
            return FieldPriorities::load(path);
        }

        let mut priorities = FieldPriorities::new();
        for p in &self.field_priorities {
            priorities.insert(p.field.as_str(), p.weight)?;
        }
        Ok(priorities)
    }

    pub fn default_fields(&self) -> crate::Result<Vec<Field>> {
        self.default_fields
            .iter()
            .map(|(name, value)| Field::new(name.as_str(), value.as_str()))
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_address: default_server_address(),
            server_port: default_server_port(),
            server_directory: default_server_directory(),
            default_search_field: default_search_field(),
            field_priorities: Vec::new(),
            field_priorities_file: None,
            default_fields: BTreeMap::new(),
            timeout_secs: default_timeout_secs(),
            insecure_skip_verify: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_server_url() {
        let config = Config::default();
        assert_eq!(config.server_url(), "http://127.0.0.1:8080/solr");
        assert_eq!(config.default_search_field, "content");
        assert!(config.field_priorities().unwrap().is_empty());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"server_address": "http://search.local/", "server_port": "8983"}"#)
                .unwrap();
        assert_eq!(config.server_url(), "http://search.local:8983/solr");
        assert_eq!(config.timeout_secs, 30);
        assert!(!config.insecure_skip_verify);
    }

    #[test]
    fn test_inline_field_priorities_keep_order() {
        let config: Config = serde_json::from_str(
            r#"{"field_priorities": [{"field": "title", "weight": 10}, {"field": "content", "weight": 1}]}"#,
        )
        .unwrap();
        let priorities = config.field_priorities().unwrap();
        let entries: Vec<(&str, f64)> = priorities.iter().collect();
        assert_eq!(entries, vec![("title", 10.0), ("content", 1.0)]);
    }

    #[test]
    fn test_priorities_file_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fieldPriorities.xml");
        std::fs::write(&path, r#"<fields><field name="summary">3</field></fields>"#).unwrap();

        let config = Config {
            field_priorities: vec![FieldPriority {
                field: "title".to_string(),
                weight: 10.0,
            }],
            field_priorities_file: Some(path.to_string_lossy().into_owned()),
            ..Config::default()
        };
        let priorities = config.field_priorities().unwrap();
        assert_eq!(priorities.len(), 1);
        assert_eq!(priorities.get("summary"), Some(3.0));
    }

    #[test]
    fn test_default_fields() {
        let config: Config =
            serde_json::from_str(r#"{"default_fields": {"site": "blog", "lang": "en"}}"#).unwrap();
        let fields = config.default_fields().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name(), "lang");
        assert_eq!(fields[1].value().as_str(), Some("blog"));
    }

    #[test]
    fn test_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"server_directory": "solr/blog"}"#).unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server_url(), "http://127.0.0.1:8080/solr/blog");
        assert!(Config::load("does-not-exist.json").is_err());
    }
}
