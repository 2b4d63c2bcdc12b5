//! Mock command execution infrastructure for testing
//!
//! `RecordingCommands` stands in for the external tools and keeps the order of
//! every invocation. `FakeTools` writes shell scripts that log their arguments,
//! for driving the real `SystemCommands` without touching a disk.

use sayonara_autowipe::drives::DriveCommands;
use sayonara_autowipe::{DriveError, DriveResult, ToolPaths};
use std::collections::HashSet;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Unmount(String),
    Discard(String),
    Overwrite(String, u32),
    SecureErase(String),
}

impl Call {
    pub fn device(&self) -> &str {
        match self {
            Call::Unmount(d) | Call::Discard(d) | Call::SecureErase(d) => d,
            Call::Overwrite(d, _) => d,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Unmount,
    Discard,
    Overwrite,
    SecureErase,
}

/// Every call succeeds unless its operation was marked failing
#[derive(Clone, Default)]
pub struct RecordingCommands {
    calls: Arc<Mutex<Vec<Call>>>,
    failing: Arc<Mutex<HashSet<Op>>>,
}

impl RecordingCommands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, op: Op) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, device: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.device() == device)
            .collect()
    }

    fn record(&self, op: Op, call: Call) -> DriveResult<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(&op) {
            return Err(DriveError::ToolFailed {
                tool: format!("{:?}", op),
                status: "exit status: 1".to_string(),
                stderr: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

impl DriveCommands for RecordingCommands {
    fn unmount(&self, device: &str) -> DriveResult<()> {
        self.record(Op::Unmount, Call::Unmount(device.to_string()))
    }

    fn discard(&self, device: &str) -> DriveResult<()> {
        self.record(Op::Discard, Call::Discard(device.to_string()))
    }

    fn overwrite(&self, device: &str, passes: u32) -> DriveResult<()> {
        self.record(Op::Overwrite, Call::Overwrite(device.to_string(), passes))
    }

    fn secure_erase(&self, device: &str, _password: &str) -> DriveResult<()> {
        self.record(Op::SecureErase, Call::SecureErase(device.to_string()))
    }
}

/// Shell-script replacements for umount, blkdiscard, shred and hdparm.
///
/// Each script appends `<tool> <args...>` to a shared log and exits with the
/// status configured for that tool.
pub struct FakeTools {
    dir: PathBuf,
    log: PathBuf,
}

impl FakeTools {
    pub fn new(root: &Path) -> Self {
        let dir = root.join("bin");
        fs::create_dir_all(&dir).unwrap();
        let tools = Self {
            log: root.join("tools.log"),
            dir,
        };
        for tool in ["umount", "blkdiscard", "shred", "hdparm"] {
            tools.set_exit(tool, 0);
        }
        tools
    }

    pub fn set_exit(&self, tool: &str, status: i32) {
        let script = format!(
            "#!/bin/sh\necho \"{} $*\" >> '{}'\nexit {}\n",
            tool,
            self.log.display(),
            status
        );
        let path = self.dir.join(tool);
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// hdparm that fails only the erase step, leaving set-pass and disable working
    pub fn hdparm_erase_fails(&self) {
        let script = format!(
            "#!/bin/sh\necho \"hdparm $*\" >> '{}'\n[ \"$3\" = \"--security-erase\" ] && exit 5\nexit 0\n",
            self.log.display()
        );
        let path = self.dir.join("hdparm");
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    pub fn paths(&self) -> ToolPaths {
        let tool = |name: &str| self.dir.join(name).to_string_lossy().into_owned();
        ToolPaths {
            umount: tool("umount"),
            blkdiscard: tool("blkdiscard"),
            shred: tool("shred"),
            hdparm: tool("hdparm"),
        }
    }

    pub fn invocations(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}
