use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::doctype::DocType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the Solr instance, without a trailing slash.
    #[serde(default = "default_solr_url")]
    pub solr_url: String,
    /// Root directory holding `GRANTS/`, `PUBS/`, and `PTAB/` input trees.
    #[serde(default = "default_files_root")]
    pub files_root: PathBuf,
    /// Per-request timeout for Solr submissions, in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub cores: CoresConfig,
}

fn default_solr_url() -> String {
    "http://localhost:8983".to_string()
}

fn default_files_root() -> PathBuf {
    PathBuf::from("files")
}

fn default_timeout_seconds() -> u64 {
    30
}

/// Solr core names per document type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoresConfig {
    #[serde(default = "default_grants_core")]
    pub grants: String,
    #[serde(default = "default_pubs_core")]
    pub pubs: String,
    #[serde(default = "default_ptab_core")]
    pub ptab: String,
}

fn default_grants_core() -> String {
    "grants".to_string()
}

fn default_pubs_core() -> String {
    "pubs".to_string()
}

fn default_ptab_core() -> String {
    "ptab".to_string()
}

impl Default for CoresConfig {
    fn default() -> Self {
        Self {
            grants: default_grants_core(),
            pubs: default_pubs_core(),
            ptab: default_ptab_core(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            solr_url: default_solr_url(),
            files_root: default_files_root(),
            timeout_seconds: default_timeout_seconds(),
            cores: CoresConfig::default(),
        }
    }
}

impl Config {
    /// Get the configuration directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("patsolr");
        Ok(config_dir)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, falling back to defaults when no config
    /// file has been written yet.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {}", config_path.display()))?;

        config.solr_url = expand_env_var(&config.solr_url);
        config.solr_url = config.solr_url.trim_end_matches('/').to_string();

        Ok(config)
    }

    /// Solr core name for a document type.
    pub fn core(&self, doc_type: DocType) -> &str {
        match doc_type {
            DocType::Grants => &self.cores.grants,
            DocType::Pubs => &self.cores.pubs,
            DocType::Ptab => &self.cores.ptab,
        }
    }
}

/// Expand environment variable references like ${VAR_NAME}
fn expand_env_var(value: &str) -> String {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).unwrap_or_default()
    } else if let Some(var_name) = value.strip_prefix('$') {
        std::env::var(var_name).unwrap_or_default()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_var_braces() {
        std::env::set_var("PATSOLR_TEST_VAR_A", "http://solr:8983");
        assert_eq!(expand_env_var("${PATSOLR_TEST_VAR_A}"), "http://solr:8983");
        std::env::remove_var("PATSOLR_TEST_VAR_A");
    }

    #[test]
    fn test_expand_env_var_literal() {
        assert_eq!(
            expand_env_var("http://localhost:8983"),
            "http://localhost:8983"
        );
    }

    #[test]
    fn test_expand_env_var_missing_returns_empty() {
        assert_eq!(expand_env_var("${DEFINITELY_NOT_SET_XYZ_123}"), "");
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            solr_url = "http://search.example.gov:8983"
            files_root = "/data/files"
            timeout_seconds = 10

            [cores]
            grants = "grants_v2"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.solr_url, "http://search.example.gov:8983");
        assert_eq!(config.files_root, PathBuf::from("/data/files"));
        assert_eq!(config.timeout_seconds, 10);
        assert_eq!(config.cores.grants, "grants_v2");
        // Unset cores keep their defaults
        assert_eq!(config.cores.ptab, "ptab");
    }

    #[test]
    fn test_config_default_values() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.solr_url, "http://localhost:8983");
        assert_eq!(config.files_root, PathBuf::from("files"));
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn test_core_lookup_per_doc_type() {
        let config = Config::default();
        assert_eq!(config.core(DocType::Grants), "grants");
        assert_eq!(config.core(DocType::Pubs), "pubs");
        assert_eq!(config.core(DocType::Ptab), "ptab");
    }

    #[test]
    fn test_config_roundtrip_toml() {
        let config = Config {
            solr_url: "http://10.0.0.5:8983".into(),
            files_root: PathBuf::from("/srv/patents"),
            timeout_seconds: 5,
            cores: CoresConfig::default(),
        };

        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.solr_url, "http://10.0.0.5:8983");
        assert_eq!(deserialized.files_root, PathBuf::from("/srv/patents"));
    }
}
