use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CiWatchError, Result};

/// Configuration file structure for ciwatch.
///
/// Loaded from `<config_dir>/ciwatch/config.toml` when present; every value
/// can be overridden by a CLI flag or environment variable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub gitlab: GitLabConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitLabConfig {
    /// GitLab personal access token
    pub token: Option<String>,

    /// GitLab instance base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// GitLab project path (e.g. 'group/project')
    pub project: Option<String>,

    /// Git remote used to discover the project path
    #[serde(default = "default_remote")]
    pub remote: String,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: default_base_url(),
            project: None,
            remote: default_remote(),
        }
    }
}

fn default_base_url() -> String {
    "https://gitlab.com".to_owned()
}

fn default_remote() -> String {
    "origin".to_owned()
}

impl Config {
    /// Loads the user config, falling back to defaults when no file exists.
    pub fn load() -> Result<Self> {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(Self::default());
        };
        let path = config_dir.join("ciwatch").join("config.toml");
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| CiWatchError::Config(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.gitlab.base_url, "https://gitlab.com");
        assert_eq!(config.gitlab.remote, "origin");
        assert!(config.gitlab.token.is_none());
        assert!(config.gitlab.project.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[gitlab]
token = "glpat-abc"
base-url = "https://gitlab.example.com"
project = "group/project"
remote = "upstream"
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.gitlab.token.as_deref(), Some("glpat-abc"));
        assert_eq!(config.gitlab.base_url, "https://gitlab.example.com");
        assert_eq!(config.gitlab.project.as_deref(), Some("group/project"));
        assert_eq!(config.gitlab.remote, "upstream");
    }

    #[test]
    fn test_load_from_partial_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[gitlab]\nproject = \"group/project\"").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.gitlab.base_url, "https://gitlab.com");
        assert_eq!(config.gitlab.project.as_deref(), Some("group/project"));
    }

    #[test]
    fn test_load_from_malformed_file_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[gitlab\nnot toml").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, CiWatchError::Config(_)));
    }
}
