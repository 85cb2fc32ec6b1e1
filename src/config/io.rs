//! Configuration file I/O operations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::RewardsConfig;

impl RewardsConfig {
    /// Get the global data directory path (~/.rewards/)
    pub fn global_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".rewards")
    }

    /// Default database location (~/.rewards/rewards.db)
    pub fn default_db_path() -> PathBuf {
        Self::global_config_dir().join("rewards.db")
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: RewardsConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration from a directory
    /// Looks for .rewards/config.toml, falling back to defaults
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(".rewards/config.toml");
        if path.exists() {
            return Self::from_file(&path);
        }
        Ok(Self::default())
    }

    /// Save configuration to a file (temp file + rename)
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        let tmp_path = path.with_extension("toml.tmp");
        std::fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config file: {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to replace config file: {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let mut config = RewardsConfig::default();
        config.lesson.base_xp = 12;
        config.hearts.refill_cost_gems = 7;

        let path = dir.path().join(".rewards/config.toml");
        config.save_to_file(&path).unwrap();

        let loaded = RewardsConfig::from_dir(dir.path()).unwrap();
        assert_eq!(loaded.lesson.base_xp, 12);
        assert_eq!(loaded.hearts.refill_cost_gems, 7);
        assert_eq!(loaded.quests.daily.len(), config.quests.daily.len());
    }

    #[test]
    fn test_missing_dir_config_is_default() {
        let dir = tempdir().unwrap();
        let loaded = RewardsConfig::from_dir(dir.path()).unwrap();
        assert_eq!(loaded.pro.daily_bonus_gems, 20);
    }
}
