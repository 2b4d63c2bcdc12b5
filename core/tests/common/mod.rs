//! Shared fixtures for the integration tests
//!
//! - `mock_sysfs`: temp-dir stand-ins for /proc/partitions, /proc/mounts and /sys/block
//! - `mock_commands`: a recording `DriveCommands` fake and fake tool scripts

#![allow(dead_code)]

pub mod mock_commands;
pub mod mock_sysfs;
