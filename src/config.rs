/// Server configuration.
///
/// Settings are read from one TOML file, the first found of:
///
///   1. the path given with `--config`
///   2. `.origami-lsp.toml` in the workspace root
///   3. `origami-lsp/config.toml` in the user configuration directory
///
/// Every key is optional; anything left out keeps its default.
///
/// ```toml
/// log_level = "debug"
///
/// [index]
/// extensions = ["zy", "php"]
/// exclude = ["vendor"]
/// scan_workspace = true
///
/// [completion]
/// keywords = true
/// auto_import = true
/// ```
use std::path::{Path, PathBuf};

use etcetera::BaseStrategy;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ConfigError;

/// File name looked up in the workspace root.
pub const WORKSPACE_CONFIG: &str = ".origami-lsp.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Tracing filter used when neither `RUST_LOG` nor `--log-level` is set.
    pub log_level: Option<String>,
    pub index: IndexConfig,
    pub completion: CompletionConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    /// File extensions (without the dot) treated as source files.
    pub extensions: Vec<String>,
    /// Directory names never descended into.
    pub exclude: Vec<String>,
    /// Index the whole workspace when the client connects.
    pub scan_workspace: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["zy".to_string(), "php".to_string()],
            exclude: ["node_modules", "vendor", "build", "dist"]
                .into_iter()
                .map(String::from)
                .collect(),
            scan_workspace: true,
        }
    }
}

impl IndexConfig {
    pub fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompletionConfig {
    /// Offer keywords and snippets.
    pub keywords: bool,
    /// Attach `use` edits to class completions from other namespaces.
    pub auto_import: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            keywords: true,
            auto_import: true,
        }
    }
}

impl Config {
    /// Parse one configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Candidate files in lookup order.
    pub fn search_paths(explicit: Option<&Path>, workspace: Option<&Path>) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(path) = explicit {
            paths.push(path.to_path_buf());
        }
        if let Some(root) = workspace {
            paths.push(root.join(WORKSPACE_CONFIG));
        }
        if let Ok(strategy) = etcetera::choose_base_strategy() {
            paths.push(strategy.config_dir().join("origami-lsp").join("config.toml"));
        }
        paths
    }

    /// Load the first existing file of [`Config::search_paths`].
    ///
    /// Returns the defaults when no file exists.  An explicit path that
    /// does not exist is an error.
    pub fn load(explicit: Option<&Path>, workspace: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit
            && !path.exists()
        {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        for path in Self::search_paths(explicit, workspace) {
            if path.is_file() {
                debug!(path = %path.display(), "loading configuration");
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    /// [`Config::load`], logging failures and falling back to defaults.
    pub fn load_or_default(explicit: Option<&Path>, workspace: Option<&Path>) -> Self {
        Self::load(explicit, workspace).unwrap_or_else(|err| {
            warn!("{err}; using default configuration");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_keep_defaults() {
        let config: Config = toml::from_str("[completion]\nkeywords = false\n").expect("parse");
        assert!(!config.completion.keywords);
        assert!(config.completion.auto_import);
        assert_eq!(config.index, IndexConfig::default());
        assert_eq!(config.log_level, None);
    }

    #[test]
    fn workspace_file_is_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(WORKSPACE_CONFIG),
            "log_level = \"debug\"\n[index]\nextensions = [\"zy\"]\n",
        )
        .expect("write");
        let config = Config::load(None, Some(dir.path())).expect("load");
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.index.extensions, vec!["zy".to_string()]);
        assert!(config.index.is_source_file(Path::new("a/b.zy")));
        assert!(!config.index.is_source_file(Path::new("a/b.php")));
    }

    #[test]
    fn bad_files_are_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "unknown_key = 1\n").expect("write");
        assert!(matches!(
            Config::load(Some(&path), None),
            Err(ConfigError::Toml { .. })
        ));
        assert!(matches!(
            Config::load(Some(&dir.path().join("missing.toml")), None),
            Err(ConfigError::Io { .. })
        ));
    }
}
