//! Fake kernel views backed by a temp directory

use sayonara_autowipe::{AutoWipeConfig, SystemPaths};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const ROTATIONAL: &str = "1";
pub const SOLID_STATE: &str = "0";

pub struct MockSystem {
    root: TempDir,
    pub paths: SystemPaths,
}

impl MockSystem {
    /// Empty partition table, empty sysfs, no mounts
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        let paths = SystemPaths {
            partitions: root.path().join("proc/partitions"),
            sysfs_block: root.path().join("sys/block"),
            dev_root: root.path().join("dev"),
            mounts: root.path().join("proc/mounts"),
            verify_device_nodes: false,
        };
        fs::create_dir_all(&paths.sysfs_block).unwrap();
        fs::create_dir_all(root.path().join("proc")).unwrap();
        fs::write(&paths.mounts, "").unwrap();

        let system = Self { root, paths };
        system.write_partitions(&[]);
        system
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Write /proc/partitions verbatim from (name, blocks) rows
    pub fn write_partitions(&self, rows: &[&str]) {
        let mut listing = String::from("major minor  #blocks  name\n\n");
        for (minor, name) in rows.iter().enumerate() {
            listing.push_str(&format!("   8 {:>8} {:>12} {}\n", minor, 1_953_514_584u64, name));
        }
        fs::write(&self.paths.partitions, listing).unwrap();
    }

    /// Attach whole disks (with one partition each) and set their media flag
    pub fn attach(&self, disks: &[(&str, &str)]) {
        let mut rows = Vec::new();
        for (name, flag) in disks {
            rows.push(name.to_string());
            rows.push(format!("{}1", name));
            self.set_rotational(name, flag);
        }
        let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
        self.write_partitions(&rows);
    }

    pub fn set_rotational(&self, name: &str, flag: &str) {
        let queue = self.paths.sysfs_block.join(name).join("queue");
        fs::create_dir_all(&queue).unwrap();
        fs::write(queue.join("rotational"), format!("{}\n", flag)).unwrap();
    }

    pub fn detach_from_sysfs(&self, name: &str) {
        let _ = fs::remove_dir_all(self.paths.sysfs_block.join(name));
    }

    pub fn set_mounts(&self, contents: &str) {
        fs::write(&self.paths.mounts, contents).unwrap();
    }

    pub fn dev(&self, name: &str) -> String {
        self.paths.dev_root.join(name).to_string_lossy().into_owned()
    }

    pub fn config(&self, exclude: &[&str]) -> AutoWipeConfig {
        AutoWipeConfig {
            poll_interval_ms: 5,
            exclude: exclude.iter().map(|e| e.to_string()).collect(),
            paths: self.paths.clone(),
            ..Default::default()
        }
    }
}

impl Default for MockSystem {
    fn default() -> Self {
        Self::new()
    }
}
