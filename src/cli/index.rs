// src/cli/index.rs
// `crace index [--path]` - one-shot project indexing, no server started.

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use crace::config::Settings;
use crace::state::AppState;

pub async fn run_index(path: Option<PathBuf>, mut settings: Settings) -> Result<()> {
    let root = path.unwrap_or(std::env::current_dir()?);
    settings.project_root = Some(root.clone());

    let state = AppState::build(settings).await?;
    let indexed = state.set_project_root(&root).await?;
    state.persist_embedding_snapshots().await?;

    info!(root = %root.display(), indexed, "one-shot index complete");
    println!("Indexed {indexed} file(s) under {}", root.display());
    Ok(())
}
