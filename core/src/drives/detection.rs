use crate::config::{AutoWipeConfig, SystemPaths};
use crate::{DriveError, DriveResult, MediaType};
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// SCSI/SATA ("sd") and legacy IDE ("hd") whole disks: prefix plus letters only
const WHOLE_DISK_PATTERN: &str = r"^(sd|hd)[a-z]+$";

/// Column holding the device name in /proc/partitions
const NAME_COLUMN: usize = 3;

fn whole_disk_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(WHOLE_DISK_PATTERN).expect("whole disk pattern is valid"))
}

/// Stateless view of the disks currently attached to the host
#[derive(Debug, Clone)]
pub struct DriveDetector {
    partitions_path: PathBuf,
    sysfs_block_root: PathBuf,
    dev_root: PathBuf,
    exclusions: Vec<String>,
    verify_device_nodes: bool,
}

impl DriveDetector {
    pub fn new(paths: &SystemPaths, exclusions: &[String]) -> Self {
        Self {
            partitions_path: paths.partitions.clone(),
            sysfs_block_root: paths.sysfs_block.clone(),
            dev_root: paths.dev_root.clone(),
            exclusions: exclusions.to_vec(),
            verify_device_nodes: paths.verify_device_nodes,
        }
    }

    pub fn from_config(config: &AutoWipeConfig) -> Self {
        Self::new(&config.paths, &config.exclude)
    }

    /// Current set of eligible whole-disk device paths.
    ///
    /// Never fails: an unreadable partition table is logged and yields an
    /// empty set so the monitoring loop keeps running.
    pub fn enumerate(&self) -> BTreeSet<String> {
        self.try_enumerate().unwrap_or_else(|e| {
            tracing::warn!(
                path = %self.partitions_path.display(),
                error = %e,
                "Partition table unreadable, treating as no devices"
            );
            BTreeSet::new()
        })
    }

    /// Like `enumerate`, but lets the caller tell "no disks" from "could not look"
    pub fn try_enumerate(&self) -> DriveResult<BTreeSet<String>> {
        let contents = fs::read_to_string(&self.partitions_path)?;

        Ok(Self::parse_partition_table(&contents, &self.exclusions)
            .into_iter()
            .map(|name| self.device_path(&name))
            .filter(|path| !self.verify_device_nodes || Self::is_block_device(Path::new(path)))
            .collect())
    }

    /// Whole-disk names from /proc/partitions text, minus exclusions
    pub fn parse_partition_table(contents: &str, exclusions: &[String]) -> BTreeSet<String> {
        contents
            .lines()
            .filter_map(|line| {
                let columns: Vec<&str> = line.split_whitespace().collect();
                // Header ("major minor #blocks name") and blank lines have no numeric major
                if columns.len() <= NAME_COLUMN || columns[0].parse::<u32>().is_err() {
                    return None;
                }
                Some(columns[NAME_COLUMN])
            })
            .filter(|name| Self::is_whole_disk(name))
            .filter(|name| !Self::is_excluded(name, exclusions))
            .map(str::to_string)
            .collect()
    }

    pub fn is_whole_disk(name: &str) -> bool {
        whole_disk_regex().is_match(name)
    }

    /// Exclusion entries may be bare names or full device paths
    pub fn is_excluded(name: &str, exclusions: &[String]) -> bool {
        exclusions.iter().any(|entry| {
            let entry = entry.trim();
            entry == name || Path::new(entry).file_name().is_some_and(|f| f == name)
        })
    }

    /// Canonical path for a device named by hand (`sdb` or `/dev/sdb`).
    ///
    /// Applies the same whole-disk and exclusion rules as enumeration.
    pub fn resolve_target(&self, device: &str) -> DriveResult<String> {
        let name = Self::device_name(device.trim());
        if !Self::is_whole_disk(name) {
            return Err(DriveError::NotEligible(format!(
                "{} is not a whole SCSI/SATA or IDE disk",
                device
            )));
        }
        if Self::is_excluded(name, &self.exclusions) {
            return Err(DriveError::NotEligible(format!(
                "{} is excluded by configuration",
                device
            )));
        }
        Ok(self.device_path(name))
    }

    pub fn device_path(&self, name: &str) -> String {
        self.dev_root.join(name).to_string_lossy().into_owned()
    }

    /// Kernel name of a device path (`/dev/sdb` -> `sdb`)
    pub fn device_name(device_path: &str) -> &str {
        Path::new(device_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(device_path)
    }

    /// Read the media class fresh from sysfs
    pub fn media_type(&self, device_path: &str) -> DriveResult<MediaType> {
        let name = Self::device_name(device_path);
        let device_dir = self.sysfs_block_root.join(name);

        if !device_dir.is_dir() {
            return Err(DriveError::DeviceVanished(device_path.to_string()));
        }

        let flag_path = device_dir.join("queue").join("rotational");
        let flag = match fs::read_to_string(&flag_path) {
            Ok(flag) => flag,
            // Removed between the directory check and the read
            Err(e) if e.kind() == io::ErrorKind::NotFound && !device_dir.exists() => {
                return Err(DriveError::DeviceVanished(device_path.to_string()));
            }
            Err(e) => {
                return Err(DriveError::ClassificationUnknown(format!(
                    "{}: {}",
                    flag_path.display(),
                    e
                )));
            }
        };

        MediaType::from_rotational_flag(&flag).ok_or_else(|| {
            DriveError::ClassificationUnknown(format!(
                "{}: unexpected rotational value {:?}",
                device_path,
                flag.trim()
            ))
        })
    }

    /// Whether the kernel still lists the device under sysfs
    pub fn is_present(&self, device_path: &str) -> bool {
        self.sysfs_block_root
            .join(Self::device_name(device_path))
            .is_dir()
    }

    fn is_block_device(path: &Path) -> bool {
        fs::metadata(path)
            .map(|meta| meta.file_type().is_block_device())
            .unwrap_or(false)
    }
}
