//! pomo configuration.
//!
//! Loaded from `~/.pomo/config.toml`. Every key is optional; a missing file
//! means defaults.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Duration used when `start` is given no `--minutes`.
pub const DEFAULT_MINUTES: u32 = 25;

/// pomo configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Minutes for a new cycle when none are given.
    pub default_minutes: u32,

    /// Task labels offered by `pomo tasks` before any history exists.
    pub task_suggestions: Vec<String>,

    /// Where snapshots live. Defaults to `~/.pomo/data/`.
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_minutes: DEFAULT_MINUTES,
            task_suggestions: Vec::new(),
            data_dir: None,
        }
    }
}

impl Config {
    /// Load config from `~/.pomo/config.toml`, falling back to defaults when
    /// the file or the home directory is missing.
    pub fn load() -> Result<Self, String> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from an explicit path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let contents = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };

        let config: Self = toml::from_str(&contents)
            .map_err(|e| format!("invalid config at {}: {e}", path.display()))?;

        if config.default_minutes == 0 {
            return Err(format!(
                "default-minutes must be positive in {}",
                path.display()
            ));
        }

        Ok(config)
    }

    /// The config file path: `~/.pomo/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".pomo").join("config.toml"))
    }
}
