// Drive operations and management
//
// Thin wrappers around the external tools that do the destructive work.
// The wipe state machine only sees the DriveCommands trait.

pub mod secure_erase; // ATA security erase via hdparm
pub mod shred; // Multi-pass overwrite
pub mod trim; // Forced zero-fill discard
pub mod unmount; // Best-effort unmount of a disk's partitions

// Re-exports for convenience
pub use secure_erase::ATASecureErase;
pub use shred::OverwriteOperations;
pub use trim::TrimOperations;
pub use unmount::UnmountOperations;

use crate::config::{AutoWipeConfig, ToolPaths};
use crate::{DriveError, DriveResult};
use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Lines of tool stderr kept for the error message
const STDERR_TAIL_LINES: usize = 8;

/// Capability seam over the external wipe tools
#[cfg_attr(test, mockall::automock)]
pub trait DriveCommands: Send + Sync {
    /// Unmount everything mounted from the device or its partitions
    fn unmount(&self, device_path: &str) -> DriveResult<()>;

    /// Forced zero-fill discard of the whole device
    fn discard(&self, device_path: &str) -> DriveResult<()>;

    /// `passes` random passes followed by a zero pass
    fn overwrite(&self, device_path: &str, passes: u32) -> DriveResult<()>;

    /// Set a transient security credential, then issue the erase
    fn secure_erase(&self, device_path: &str, password: &str) -> DriveResult<()>;
}

/// Runs the real tools
#[derive(Debug, Clone)]
pub struct SystemCommands {
    tools: ToolPaths,
    mounts_path: PathBuf,
}

impl SystemCommands {
    pub fn new(tools: ToolPaths, mounts_path: PathBuf) -> Self {
        Self { tools, mounts_path }
    }

    pub fn from_config(config: &AutoWipeConfig) -> Self {
        Self::new(config.tools.clone(), config.paths.mounts.clone())
    }
}

impl DriveCommands for SystemCommands {
    fn unmount(&self, device_path: &str) -> DriveResult<()> {
        UnmountOperations::unmount_device(&self.tools.umount, &self.mounts_path, device_path)
            .map(|_| ())
    }

    fn discard(&self, device_path: &str) -> DriveResult<()> {
        TrimOperations::discard_entire_device(&self.tools.blkdiscard, device_path)
    }

    fn overwrite(&self, device_path: &str, passes: u32) -> DriveResult<()> {
        OverwriteOperations::overwrite(&self.tools.shred, device_path, passes)
    }

    fn secure_erase(&self, device_path: &str, password: &str) -> DriveResult<()> {
        ATASecureErase::erase_with_credential(&self.tools.hdparm, device_path, password)
    }
}

/// Run a tool to completion, streaming its stderr into the log.
///
/// No timeout: secure erase and shred legitimately run for hours.
pub(crate) fn run_tool(program: &str, args: &[&str]) -> DriveResult<()> {
    tracing::debug!(tool = program, args = ?args, "Running external tool");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => DriveError::ToolMissing(program.to_string()),
            _ => DriveError::IoError(e),
        })?;

    let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
    if let Some(stderr) = child.stderr.take() {
        for line in BufReader::new(stderr).lines().map_while(Result::ok) {
            tracing::debug!(tool = program, "{}", line);
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }
    }

    let status = child.wait()?;
    if status.success() {
        return Ok(());
    }

    Err(DriveError::ToolFailed {
        tool: program.to_string(),
        status: status.to_string(),
        stderr: Vec::from(tail).join("\n"),
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_tool_success() {
        assert!(run_tool("true", &[]).is_ok());
    }

    #[test]
    fn test_run_tool_nonzero_exit() {
        let err = run_tool("false", &[]).unwrap_err();
        assert!(matches!(err, DriveError::ToolFailed { ref tool, .. } if tool == "false"));
    }

    #[test]
    fn test_run_tool_missing_binary() {
        let err = run_tool("sayonara-no-such-tool", &["--help"]).unwrap_err();
        assert!(matches!(err, DriveError::ToolMissing(ref t) if t == "sayonara-no-such-tool"));
    }

    #[test]
    fn test_run_tool_keeps_stderr_tail() {
        let err = run_tool(
            "sh",
            &["-c", "for i in 1 2 3 4 5 6 7 8 9 10; do echo line$i >&2; done; exit 3"],
        )
        .unwrap_err();

        match err {
            DriveError::ToolFailed { status, stderr, .. } => {
                assert!(status.contains('3'), "status was {}", status);
                assert!(stderr.contains("line10"));
                assert!(stderr.contains("line3"));
                assert!(!stderr.contains("line2\n"));
                assert_eq!(stderr.lines().count(), STDERR_TAIL_LINES);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
