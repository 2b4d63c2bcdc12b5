// Daemon configuration
//
// Layering, lowest priority first: built-in defaults, optional TOML file,
// SAYONARA_* environment variables, command-line overrides.

use crate::{DriveError, DriveResult, SsdFallback, WipeConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/sayonara/autowipe.toml";
pub const ENV_PREFIX: &str = "SAYONARA";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoWipeConfig {
    pub poll_interval_ms: u64,
    /// Device names never returned by enumeration ("sda" or "/dev/sda")
    pub exclude: Vec<String>,
    pub rediscovery: RediscoveryPolicy,
    pub wipe: WipeConfig,
    pub paths: SystemPaths,
    pub tools: ToolPaths,
}

impl Default for AutoWipeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            exclude: vec!["sda".to_string()],
            rediscovery: RediscoveryPolicy::Remember,
            wipe: WipeConfig::default(),
            paths: SystemPaths::default(),
            tools: ToolPaths::default(),
        }
    }
}

/// How the known-device set treats a disk that disappears and comes back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RediscoveryPolicy {
    /// Once seen, never wiped again this session
    #[default]
    Remember,
    /// Forgotten when absent from an enumeration; wiped again on reattach
    Forget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemPaths {
    pub partitions: PathBuf,
    pub sysfs_block: PathBuf,
    pub dev_root: PathBuf,
    pub mounts: PathBuf,
    /// Only report disks whose node under `dev_root` is a block device
    pub verify_device_nodes: bool,
}

impl Default for SystemPaths {
    fn default() -> Self {
        Self {
            partitions: PathBuf::from("/proc/partitions"),
            sysfs_block: PathBuf::from("/sys/block"),
            dev_root: PathBuf::from("/dev"),
            mounts: PathBuf::from("/proc/mounts"),
            verify_device_nodes: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub umount: String,
    pub blkdiscard: String,
    pub shred: String,
    pub hdparm: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            umount: "umount".to_string(),
            blkdiscard: "blkdiscard".to_string(),
            shred: "shred".to_string(),
            hdparm: "hdparm".to_string(),
        }
    }
}

impl AutoWipeConfig {
    /// Load defaults, then `path` (or the default location if it exists),
    /// then the environment.
    ///
    /// An explicitly given file must exist; the default location may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));

        let settings = config::Config::builder()
            .add_source(config::File::from(file).required(path.is_some()))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("exclude")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", file.display()))?;

        let config: AutoWipeConfig = settings
            .try_deserialize()
            .context("Failed to parse configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DriveResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(DriveError::Config(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.wipe.overwrite_passes == 0 {
            return Err(DriveError::Config(
                "wipe.overwrite_passes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Apply command-line values on top of file and environment, then
    /// re-validate. An override exclusion list replaces the configured one.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> DriveResult<()> {
        if let Some(interval) = overrides.poll_interval {
            self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        }
        if let Some(passes) = overrides.overwrite_passes {
            self.wipe.overwrite_passes = passes;
        }
        if let Some(exclude) = &overrides.exclude {
            self.exclude = exclude
                .iter()
                .map(|e| e.trim())
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(fallback) = overrides.ssd_fallback {
            self.wipe.ssd_fallback = fallback;
        }
        if let Some(policy) = overrides.rediscovery {
            self.rediscovery = policy;
        }
        self.validate()
    }
}

/// Values given on the command line; `None` keeps the loaded setting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub poll_interval: Option<Duration>,
    pub overwrite_passes: Option<u32>,
    pub exclude: Option<Vec<String>>,
    pub ssd_fallback: Option<SsdFallback>,
    pub rediscovery: Option<RediscoveryPolicy>,
}
