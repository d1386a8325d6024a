// src/config/env.rs
// Environment-variable overrides - single source of truth for env-derived config.

use std::path::PathBuf;
use tracing::debug;

/// Overrides read from the process environment. `SENORITA_*` is the only
/// namespace that is part of the CRACE core contract (§6); `RUST_LOG` is
/// accepted as a fallback for the log filter, mirroring common `tracing`
/// practice.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub project_root: Option<PathBuf>,
    pub storage_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        let project_root = read_path("SENORITA_PROJECT_ROOT").filter(|p| p.is_dir());
        let storage_dir = read_path("SENORITA_STORAGE_DIR");
        let log_level = std::env::var("SENORITA_LOG_LEVEL")
            .ok()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .filter(|v| !v.trim().is_empty());

        let overrides = Self {
            project_root,
            storage_dir,
            log_level,
        };
        overrides.log_status();
        overrides
    }

    fn log_status(&self) {
        if let Some(root) = &self.project_root {
            debug!(project_root = %root.display(), "loaded SENORITA_PROJECT_ROOT");
        }
        if let Some(dir) = &self.storage_dir {
            debug!(storage_dir = %dir.display(), "loaded SENORITA_STORAGE_DIR");
        }
    }
}

fn read_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}
