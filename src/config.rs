use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "echojournal";
const DATABASE_FILE: &str = "echo_journal.db";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Holds the database and the `audio/` directory
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    #[serde(default = "default_capture_chunk_ms")]
    pub capture_chunk_ms: u64,

    #[serde(default = "default_ring_buffer_secs")]
    pub ring_buffer_secs: u64,
}

fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(dir).join(APP_DIR);
    }
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".local").join("share").join(APP_DIR),
        Err(_) => PathBuf::from(APP_DIR),
    }
}

fn default_progress_interval_ms() -> u64 {
    100
}

fn default_capture_chunk_ms() -> u64 {
    100
}

fn default_ring_buffer_secs() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            progress_interval_ms: default_progress_interval_ms(),
            capture_chunk_ms: default_capture_chunk_ms(),
            ring_buffer_secs: default_ring_buffer_secs(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.config/echojournal/config.json)
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from `config_path`, writing defaults there if it does not exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            tracing::info!(
                "Config file not found at {:?}, creating default config",
                config_path
            );
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        tracing::info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        tracing::info!("Saved config to {:?}", config_path);
        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(dir)
        } else {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            PathBuf::from(home).join(".config")
        };

        Ok(config_dir.join(APP_DIR).join("config.json"))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("data_dir cannot be empty"));
        }

        if self.progress_interval_ms == 0 {
            return Err(anyhow::anyhow!("progress_interval_ms must be greater than 0"));
        }

        if self.capture_chunk_ms == 0 {
            return Err(anyhow::anyhow!("capture_chunk_ms must be greater than 0"));
        }

        if self.ring_buffer_secs.saturating_mul(1000) < self.capture_chunk_ms {
            return Err(anyhow::anyhow!(
                "ring_buffer_secs must hold at least one capture chunk"
            ));
        }

        Ok(())
    }

    /// Directory recordings are written to
    pub fn audio_dir(&self) -> PathBuf {
        self.data_dir.join("audio")
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn capture_chunk_secs(&self) -> f32 {
        self.capture_chunk_ms as f32 / 1000.0
    }

    pub fn ring_secs(&self) -> f32 {
        self.ring_buffer_secs as f32
    }
}
