//! Sync configuration.
//!
//! Loaded from a JSON file and overridden by environment variables. Every
//! value is normalised before use: trimmed, empty strings treated as unset,
//! URLs stripped of trailing slashes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{http_base_url, normalize_text_option};

pub const REMOTE_URL_ENV: &str = "TANDEM_REMOTE_URL";
pub const TABLE_ENV: &str = "TANDEM_TABLE";

const DEFAULT_TABLE: &str = "todoitem";
const DEFAULT_API_VERSION: &str = "2.0.0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Remote backend base URL, e.g. `https://todo.example.com`
    #[serde(default)]
    pub remote_url: Option<String>,
    /// Remote table name
    #[serde(default = "default_table")]
    pub table: String,
    /// Value of the API version header sent with every request
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            table: default_table(),
            api_version: default_api_version(),
        }
    }
}

impl SyncConfig {
    /// Parse a config file payload
    pub fn parse(payload: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(payload)
            .map_err(|error| Error::Config(format!("invalid sync config JSON: {error}")))?;
        config.normalize();
        Ok(config)
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&raw).map_err(|error| {
            Error::Config(format!("failed to parse {}: {error}", path.display()))
        })?;
        config.normalize();
        Ok(config)
    }

    /// Apply overrides; `lookup` is usually `std::env::var(..).ok()`
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = normalize_text_option(lookup(REMOTE_URL_ENV)) {
            self.remote_url = Some(url);
        }
        if let Some(table) = normalize_text_option(lookup(TABLE_ENV)) {
            self.table = table;
        }
        self.normalize();
        self
    }

    pub fn is_configured(&self) -> bool {
        normalize_text_option(self.remote_url.clone()).is_some()
    }

    /// Remote base URL without trailing slash
    pub fn remote_base_url(&self) -> Result<String> {
        let url = normalize_text_option(self.remote_url.clone())
            .ok_or_else(|| Error::Config("remote_url is not set".to_string()))?;
        http_base_url(&url).map(str::to_string).ok_or_else(|| {
            Error::Config("remote_url must include http:// or https://".to_string())
        })
    }

    /// Table name, restricted to characters safe in a URL path segment
    pub fn table_name(&self) -> Result<&str> {
        let table = self.table.trim();
        let valid = !table.is_empty()
            && table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(table)
        } else {
            Err(Error::Config(format!("invalid table name '{}'", self.table)))
        }
    }

    fn normalize(&mut self) {
        self.remote_url = normalize_text_option(self.remote_url.take())
            .map(|url| url.trim_end_matches('/').to_string());
        self.table = normalize_text_option(Some(std::mem::take(&mut self.table)))
            .unwrap_or_else(default_table);
        self.api_version = normalize_text_option(Some(std::mem::take(&mut self.api_version)))
            .unwrap_or_else(default_api_version);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_fills_defaults() {
        let config = SyncConfig::parse(r#"{"remote_url": " https://todo.example.com/ "}"#)
            .expect("config should parse");
        assert_eq!(
            config,
            SyncConfig {
                remote_url: Some("https://todo.example.com".to_string()),
                table: "todoitem".to_string(),
                api_version: "2.0.0".to_string(),
            }
        );
    }

    #[test]
    fn parse_rejects_unknown_fields() {
        let error = SyncConfig::parse(r#"{"remote_url": "https://x", "token": "t"}"#).unwrap_err();
        assert!(error.to_string().contains("unknown field"));
    }

    #[test]
    fn overrides_win_over_file_values() {
        let config = SyncConfig::parse(r#"{"remote_url": "https://file.example.com"}"#)
            .unwrap()
            .with_overrides(|key| match key {
                REMOTE_URL_ENV => Some("https://env.example.com/".to_string()),
                TABLE_ENV => Some("   ".to_string()),
                _ => None,
            });
        assert_eq!(
            config.remote_url.as_deref(),
            Some("https://env.example.com")
        );
        assert_eq!(config.table, "todoitem");
    }

    #[test]
    fn remote_base_url_requires_http_scheme() {
        let config = SyncConfig {
            remote_url: Some("todo.example.com".to_string()),
            ..SyncConfig::default()
        };
        assert!(config.remote_base_url().is_err());
        assert!(!SyncConfig::default().is_configured());
    }

    #[test]
    fn table_name_rejects_path_characters() {
        let config = SyncConfig {
            table: "todo/../admin".to_string(),
            ..SyncConfig::default()
        };
        assert!(config.table_name().is_err());
        assert_eq!(SyncConfig::default().table_name().unwrap(), "todoitem");
    }

    #[test]
    fn load_from_missing_path_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SyncConfig::load_from_path(&dir.path().join("missing.json")).unwrap();
        assert_eq!(config, SyncConfig::default());
    }
}
