// src/config/file.rs
// Optional TOML config file layered under environment overrides.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Shape of `~/.crace/config.toml`. Every field is optional; a missing or
/// unparsable file falls back to `Settings`' own defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FileConfig {
    pub storage_dir: Option<PathBuf>,
    pub project_root: Option<PathBuf>,
    pub log_level: Option<String>,
    pub embedding_dim: Option<usize>,
}

impl FileConfig {
    pub fn load_default() -> Self {
        Self::load_from(&Self::default_path())
    }

    /// `~/.crace/config.toml`, matching the teacher's `~/.mira/config.toml`
    /// home-directory-only convention (never CWD).
    pub fn default_path() -> PathBuf {
        dirs::home_dir().unwrap_or_else(std::env::temp_dir).join(".crace/config.toml")
    }

    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(text) = std::fs::read_to_string(path) else {
            debug!(path = %path.display(), "no config file found, using defaults");
            return Self::default();
        };
        match toml::from_str(&text) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse config file, using defaults");
                Self::default()
            }
        }
    }

    /// Writes this config back to `path`, creating parent directories as
    /// needed. Used by `crace config set`.
    pub fn save_to(&self, path: &std::path::Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let body = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = FileConfig::load_from(std::path::Path::new("/nonexistent/crace.toml"));
        assert!(cfg.storage_dir.is_none());
    }

    #[test]
    fn parses_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "log_level = \"debug\"\nembedding_dim = 256\n").unwrap();
        let cfg = FileConfig::load_from(&path);
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
        assert_eq!(cfg.embedding_dim, Some(256));
        assert!(cfg.storage_dir.is_none());
    }
}
