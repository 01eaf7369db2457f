// File: ./src/config.rs
use crate::storage;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// User configuration, read from `config.toml` in the platform config
/// directory. Every field has a default so a missing or sparse file works.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Store directory override. Unset means the platform data directory
    /// (the `FLATCAL_DATA_DIR` environment variable beats both).
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    pub fn path() -> Option<PathBuf> {
        let proj = ProjectDirs::from("org", "flatcal", "flatcal")?;
        Some(proj.config_dir().join("config.toml"))
    }

    /// A missing file is a fresh install, not an error; an unreadable or
    /// malformed file is.
    pub fn load() -> Result<Self> {
        let Some(path) = Self::path() else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::path().context("no usable config directory")?;
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        storage::atomic_write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.log_level, "info");
        assert!(cfg.data_dir.is_none());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let cfg: Config = toml::from_str("data_dir = \"/tmp/flatcal\"").unwrap();
        assert_eq!(cfg.data_dir, Some(PathBuf::from("/tmp/flatcal")));
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn round_trips_through_toml() {
        let cfg = Config {
            data_dir: Some(PathBuf::from("/var/lib/flatcal")),
            log_level: "debug".to_string(),
        };
        let text = toml::to_string_pretty(&cfg).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }
}
