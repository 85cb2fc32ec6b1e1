//! Init command implementation

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use rewards_ledger::config::RewardsConfig;
use rewards_ledger::rewards::RewardsDb;

/// Write the default config and create the database
pub fn init_command(config_path: Option<PathBuf>, db_path: &Path, force: bool) -> Result<()> {
    let config_path =
        config_path.unwrap_or_else(|| RewardsConfig::global_config_dir().join("config.toml"));

    if config_path.exists() && !force {
        bail!(
            "Configuration already exists: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    RewardsConfig::default().save_to_file(&config_path)?;
    println!("Created: {}", config_path.display());

    RewardsDb::open(db_path)?;
    info!(db = %db_path.display(), "Database ready");
    println!("Database: {}", db_path.display());

    Ok(())
}
