// src/cli/config.rs
// `crace config show|set` - inspects or edits the TOML layer of the
// two-layer configuration (§A2). Environment overrides are never
// written back; they always win at load time regardless of this file.

use anyhow::{Result, bail};

use crace::config::{FileConfig, Settings};

const VALID_KEYS: &[&str] = &["storage_dir", "project_root", "log_level", "embedding_dim"];

pub fn run_config_show() -> Result<()> {
    let settings = Settings::load();
    let path = FileConfig::default_path();

    println!("Config file: {}", path.display());
    println!();
    println!("storage_dir   = {}", settings.storage_dir.display());
    match &settings.project_root {
        Some(root) => println!("project_root  = {}", root.display()),
        None => println!("project_root  = (not set)"),
    }
    println!("log_level     = \"{}\"", settings.log_level);
    println!("embedding_dim = {}", settings.embedding_dim);

    Ok(())
}

pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    if !VALID_KEYS.contains(&key) {
        bail!("Unknown config key '{key}'. Valid keys: {}", VALID_KEYS.join(", "));
    }

    let path = FileConfig::default_path();
    let mut config = FileConfig::load_from(&path);

    match key {
        "storage_dir" => config.storage_dir = Some(value.into()),
        "project_root" => config.project_root = Some(value.into()),
        "log_level" => config.log_level = Some(value.to_string()),
        "embedding_dim" => {
            config.embedding_dim =
                Some(value.parse().map_err(|_| anyhow::anyhow!("'{value}' is not a valid integer"))?)
        }
        _ => unreachable!("validated above"),
    }

    config.save_to(&path)?;
    println!("Set {key} = {value} in {}", path.display());
    Ok(())
}
