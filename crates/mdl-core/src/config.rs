use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Retry parameters for manifest segments (optional section in config.toml).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRetryConfig {
    /// Maximum number of attempts per segment (including the first).
    pub max_attempts: u32,
    /// Fixed delay between attempts, in milliseconds.
    pub delay_ms: u64,
}

impl Default for SegmentRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1000,
        }
    }
}

/// Global configuration loaded from `~/.config/mdl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MdlConfig {
    /// Maximum number of file downloads running at once.
    pub concurrent_files: usize,
    /// Range workers per whole-file task, and segments in flight per segmented task.
    pub per_file_threads: usize,
    /// How often a paused worker re-checks the pause flag.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Throughput sampler tick.
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    /// libcurl connect timeout.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Optional User-Agent sent with every request.
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub segment_retry: SegmentRetryConfig,
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_sample_interval_ms() -> u64 {
    100
}

fn default_connect_timeout_secs() -> u64 {
    30
}

impl Default for MdlConfig {
    fn default() -> Self {
        Self {
            concurrent_files: 12,
            per_file_threads: 16,
            poll_interval_ms: default_poll_interval_ms(),
            sample_interval_ms: default_sample_interval_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: None,
            segment_retry: SegmentRetryConfig::default(),
        }
    }
}

impl MdlConfig {
    /// Copy with every count that would stall the engine at zero raised to one.
    pub fn normalized(&self) -> Self {
        let mut cfg = self.clone();
        cfg.concurrent_files = cfg.concurrent_files.max(1);
        cfg.per_file_threads = cfg.per_file_threads.max(1);
        cfg.poll_interval_ms = cfg.poll_interval_ms.max(1);
        cfg.sample_interval_ms = cfg.sample_interval_ms.max(1);
        cfg.segment_retry.max_attempts = cfg.segment_retry.max_attempts.max(1);
        cfg
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MdlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = MdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: MdlConfig = toml::from_str(&data)?;
    Ok(cfg.normalized())
}
