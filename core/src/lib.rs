// Allow uppercase acronyms for industry-standard terms like HDD, SSD
#![allow(clippy::upper_case_acronyms)]

//! Unattended drive destruction.
//!
//! Watches the kernel partition table for whole disks that appear after
//! startup and destroys their contents with the method that suits the media:
//! forced zero-fill discard for solid-state drives, ATA secure erase with a
//! multi-pass overwrite fallback for spinning disks.

pub mod config;
pub mod drives;
pub mod wipe_orchestrator;

// Re-export main wipe orchestrator for convenience
pub use config::{AutoWipeConfig, ConfigOverrides, RediscoveryPolicy, SystemPaths, ToolPaths};
pub use wipe_orchestrator::{wipe_device, SessionStats, WipeOrchestrator};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;

// Global flag for handling SIGINT/SIGTERM
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Set the interrupt flag (called by signal handler)
pub fn set_interrupted() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Check if an interrupt has been received
pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Reset the interrupt flag (primarily for testing)
pub fn reset_interrupted() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

#[derive(Error, Debug)]
pub enum DriveError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Device vanished: {0}")]
    DeviceVanished(String),

    #[error("Media type unknown: {0}")]
    ClassificationUnknown(String),

    #[error("Tool not found: {0}")]
    ToolMissing(String),

    #[error("{tool} failed ({status}): {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("Hardware command failed: {0}")]
    HardwareCommandFailed(String),

    #[error("Device not eligible: {0}")]
    NotEligible(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type DriveResult<T> = Result<T, DriveError>;

/// Media class as reported by `/sys/block/<dev>/queue/rotational`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaType {
    Rotational,
    SolidState,
}

impl MediaType {
    /// Parse the kernel attribute ("0" or "1", trailing newline allowed)
    pub fn from_rotational_flag(flag: &str) -> Option<Self> {
        match flag.trim() {
            "1" => Some(MediaType::Rotational),
            "0" => Some(MediaType::SolidState),
            _ => None,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Rotational => write!(f, "HDD"),
            MediaType::SolidState => write!(f, "SSD"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WipeMethod {
    Discard,
    SecureErase,
    Overwrite,
}

impl fmt::Display for WipeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WipeMethod::Discard => write!(f, "discard"),
            WipeMethod::SecureErase => write!(f, "secure-erase"),
            WipeMethod::Overwrite => write!(f, "overwrite"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WipeOutcome {
    Success,
    ToolFailure,
    DeviceVanished,
    ClassificationUnknown,
}

impl WipeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, WipeOutcome::Success)
    }
}

impl fmt::Display for WipeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WipeOutcome::Success => write!(f, "success"),
            WipeOutcome::ToolFailure => write!(f, "tool-failure"),
            WipeOutcome::DeviceVanished => write!(f, "device-vanished"),
            WipeOutcome::ClassificationUnknown => write!(f, "classification-unknown"),
        }
    }
}

/// Per-device wipe settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WipeConfig {
    /// Random passes handed to the overwrite tool; a zero pass always follows
    pub overwrite_passes: u32,
    pub ssd_fallback: SsdFallback,
    /// Transient ATA security credential used for secure erase
    pub erase_password: String,
}

impl Default for WipeConfig {
    fn default() -> Self {
        Self {
            overwrite_passes: 3,
            ssd_fallback: SsdFallback::None,
            erase_password: "sayonara".to_string(),
        }
    }
}

/// What to do when discard fails on a solid-state drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SsdFallback {
    #[default]
    None,
    Overwrite,
}

/// Result of one classify-and-wipe run; logged, never persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WipeReport {
    pub device_path: String,
    pub media_type: Option<MediaType>,
    /// Methods tried, in order
    pub attempts: Vec<WipeMethod>,
    /// Method that completed with exit status 0
    pub method: Option<WipeMethod>,
    pub outcome: WipeOutcome,
    pub error_message: Option<String>,
    pub start_time: DateTime<Utc>,
    pub elapsed: Duration,
}
