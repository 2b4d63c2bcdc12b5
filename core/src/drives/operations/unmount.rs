use super::run_tool;
use crate::{DriveError, DriveResult};
use glob::Pattern;
use std::fs;
use std::path::Path;

/// One line of the mount table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub source: String,
    pub mount_point: String,
}

pub struct UnmountOperations;

impl UnmountOperations {
    /// Unmount every mount whose source is the device or one of its numbered
    /// partitions. Returns how many mount points were released.
    ///
    /// Errors only report that something stayed mounted; callers treat them as
    /// warnings.
    pub fn unmount_device(umount: &str, mounts_path: &Path, device_path: &str) -> DriveResult<usize> {
        let table = fs::read_to_string(mounts_path)?;
        let targets = Self::mounts_for_device(&Self::parse_mount_table(&table), device_path)?;

        if targets.is_empty() {
            tracing::debug!(device = device_path, "Nothing mounted");
            return Ok(0);
        }

        let mut failed = 0;
        // Newest mounts first so nested mount points come off before their parents
        for entry in targets.iter().rev() {
            match run_tool(umount, &[entry.mount_point.as_str()]) {
                Ok(()) => tracing::info!(
                    device = device_path,
                    source = %entry.source,
                    mount_point = %entry.mount_point,
                    "Unmounted"
                ),
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        device = device_path,
                        mount_point = %entry.mount_point,
                        error = %e,
                        "Unmount failed"
                    );
                }
            }
        }

        if failed > 0 {
            return Err(DriveError::HardwareCommandFailed(format!(
                "{} of {} mount points on {} could not be unmounted",
                failed,
                targets.len(),
                device_path
            )));
        }

        Ok(targets.len())
    }

    /// Mounts belonging to the device, in mount-table order.
    ///
    /// Partition sources match the glob `<device>[0-9]*`, so `/dev/sdb` picks
    /// up `/dev/sdb1` but not the separate disk `/dev/sdba`.
    pub fn mounts_for_device(
        entries: &[MountEntry],
        device_path: &str,
    ) -> DriveResult<Vec<MountEntry>> {
        let pattern = Pattern::new(&format!("{}[0-9]*", Pattern::escape(device_path)))
            .map_err(|e| DriveError::HardwareCommandFailed(format!("Bad device pattern: {}", e)))?;

        Ok(entries
            .iter()
            .filter(|entry| entry.source == device_path || pattern.matches(&entry.source))
            .cloned()
            .collect())
    }

    pub fn parse_mount_table(contents: &str) -> Vec<MountEntry> {
        contents
            .lines()
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let source = fields.next()?;
                let mount_point = fields.next()?;
                Some(MountEntry {
                    source: Self::unescape(source),
                    mount_point: Self::unescape(mount_point),
                })
            })
            .collect()
    }

    /// Undo the kernel's octal escaping (`\040` for space, etc.)
    pub(crate) fn unescape(field: &str) -> String {
        let bytes = field.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'\\' && i + 4 <= bytes.len() {
                let value = std::str::from_utf8(&bytes[i + 1..i + 4])
                    .ok()
                    .and_then(|digits| u8::from_str_radix(digits, 8).ok());
                if let Some(value) = value {
                    out.push(value);
                    i += 4;
                    continue;
                }
            }
            out.push(bytes[i]);
            i += 1;
        }
        String::from_utf8_lossy(&out).into_owned()
    }
}
