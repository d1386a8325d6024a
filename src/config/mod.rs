// src/config/mod.rs
// Two-layer configuration: environment-variable overrides over an optional
// TOML file, merged once into an immutable `Settings` at process start.

pub mod env;
pub mod file;

pub use env::EnvOverrides;
pub use file::FileConfig;

use std::path::PathBuf;

/// Process-wide settings, assembled once at startup and threaded down
/// through `AppState`. Nothing in the rest of the crate reads `std::env`
/// directly past this point.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory backing `conversations/<id>.json`, `memories.json`, and
    /// the embedding index snapshots. Defaults to a platform data dir.
    pub storage_dir: PathBuf,
    /// Project root bootstrapped from `SENORITA_PROJECT_ROOT`, if any.
    pub project_root: Option<PathBuf>,
    /// Tracing filter string, e.g. "info" or "crace=debug,tower_http=info".
    pub log_level: String,
    /// Embedding vector dimension (fixed per index).
    pub embedding_dim: usize,
}

impl Settings {
    pub fn load() -> Self {
        let file = FileConfig::load_default();
        let overrides = EnvOverrides::from_env();

        let storage_dir = overrides
            .storage_dir
            .or(file.storage_dir)
            .unwrap_or_else(default_storage_dir);
        let project_root = overrides.project_root.or(file.project_root);
        let log_level = overrides
            .log_level
            .or(file.log_level)
            .unwrap_or_else(|| "info".to_string());
        let embedding_dim = file.embedding_dim.unwrap_or(384);

        Self {
            storage_dir,
            project_root,
            log_level,
            embedding_dim,
        }
    }
}

fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("crace")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_storage_dir_is_absolute_enough() {
        let dir = default_storage_dir();
        assert!(dir.ends_with("crace"));
    }
}
