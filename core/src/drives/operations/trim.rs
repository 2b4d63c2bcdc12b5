use super::run_tool;
use crate::DriveResult;

pub struct TrimOperations;

impl TrimOperations {
    /// Discard every block and force zeroes back on read.
    ///
    /// `-f` overrides blkdiscard's refusal to touch devices with a
    /// recognizable signature; `-z` zero-fills instead of a plain discard.
    pub fn discard_entire_device(blkdiscard: &str, device_path: &str) -> DriveResult<()> {
        tracing::info!(device = device_path, "Starting full-device discard via blkdiscard");
        run_tool(blkdiscard, &Self::discard_args(device_path))?;
        tracing::info!(device = device_path, "Discard completed successfully");
        Ok(())
    }

    pub(crate) fn discard_args(device_path: &str) -> Vec<&str> {
        vec!["-f", "-z", device_path]
    }
}
