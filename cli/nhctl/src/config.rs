//! CLI configuration.
//!
//! Handles:
//! - Scheduler address
//! - Long-poll wait for watches
//! - Optional directory of job skeleton overrides

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use nh_jobspec::Templates;
use serde::{Deserialize, Serialize};

/// Configuration file name.
const CONFIG_FILE: &str = "config.json";

const DEFAULT_ADDRESS: &str = "127.0.0.1:4646";

const DEFAULT_WAIT_SECS: u64 = 30;

/// Get the config directory path.
fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("io", "nomad-helper", "nh")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

/// Path of the config file.
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Scheduler agent address, `host:port` or a full URL.
    #[serde(default = "default_address")]
    pub address: String,

    /// How long the scheduler may hold each watch request, in seconds.
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,

    /// Directory with `job.json`, `group.json`, `task.json` or `service.json`
    /// overriding the built-in skeletons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<PathBuf>,
}

fn default_address() -> String {
    std::env::var("NOMAD_ADDR").unwrap_or_else(|_| DEFAULT_ADDRESS.to_string())
}

fn default_wait_secs() -> u64 {
    DEFAULT_WAIT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: default_address(),
            wait_secs: DEFAULT_WAIT_SECS,
            template_dir: None,
        }
    }
}

impl Config {
    /// Load config from disk, or return default.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", path))
    }

    /// Save config to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {:?}", path))
    }

    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    /// Skeletons for new jobs, honouring `template_dir`.
    pub fn templates(&self) -> Result<Templates> {
        match &self.template_dir {
            Some(dir) => Templates::from_dir(dir)
                .with_context(|| format!("Failed to load job templates from {:?}", dir)),
            None => Ok(Templates::builtin()),
        }
    }
}
