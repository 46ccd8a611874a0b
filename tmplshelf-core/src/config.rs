//! Configuration for tmplshelf

use crate::TemplateError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration as TOML
pub const DEFAULT_CONFIG: &str = r#"# tmplshelf configuration

[server]
# Address and port the HTTP service binds to
bind = "0.0.0.0"
port = 3000

[index]
# Directory holding the JSON templates
root = "./templates"
# Directory names skipped anywhere in the tree
exclude_dirs = [".git", "node_modules", ".github", ".vscode", ".idea", "dist"]
# Base-name glob patterns that are never indexed
exclude_files = ["package.json", "package-lock.json", "tsconfig*.json"]

[query]
# Page size when the caller sends no limit
default_limit = 50
# Upper bound for limit / per_page
max_limit = 200
"#;

/// tmplshelf configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
    #[serde(default = "default_exclude_files")]
    pub exclude_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

// Default value functions
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_root() -> PathBuf {
    PathBuf::from("./templates")
}
fn default_exclude_dirs() -> Vec<String> {
    [".git", "node_modules", ".github", ".vscode", ".idea", "dist"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_exclude_files() -> Vec<String> {
    ["package.json", "package-lock.json", "tsconfig*.json"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_limit() -> usize {
    50
}
fn default_max_limit() -> usize {
    200
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            exclude_dirs: default_exclude_dirs(),
            exclude_files: default_exclude_files(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse config from TOML string
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| TemplateError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Address the service listens on, as `bind:port`
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }

    fn validate(&self) -> crate::Result<()> {
        if self.query.max_limit == 0 {
            return Err(TemplateError::ConfigParse(
                "query.max_limit must be at least 1".to_string(),
            ));
        }
        if self.query.default_limit == 0 || self.query.default_limit > self.query.max_limit {
            return Err(TemplateError::ConfigParse(format!(
                "query.default_limit must be between 1 and {}",
                self.query.max_limit
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config = Config::from_toml(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.index.root, PathBuf::from("./templates"));
        assert!(config.index.exclude_dirs.contains(&".git".to_string()));
        assert_eq!(config.query.default_limit, 50);
        assert_eq!(config.query.max_limit, 200);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config = Config::from_toml("[index]\nroot = \"/srv/templates\"\n").unwrap();
        assert_eq!(config.index.root, PathBuf::from("/srv/templates"));
        assert_eq!(config.index.exclude_files.len(), 3);
        assert_eq!(config.listen_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_default_limit_above_max_is_rejected() {
        let err = Config::from_toml("[query]\ndefault_limit = 500\nmax_limit = 100\n").unwrap_err();
        assert!(matches!(err, TemplateError::ConfigParse(_)));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = Config::from_toml("[server\nport = 1").unwrap_err();
        assert!(matches!(err, TemplateError::ConfigParse(_)));
    }
}
