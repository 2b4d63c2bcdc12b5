use super::run_tool;
use crate::DriveResult;

pub struct OverwriteOperations;

impl OverwriteOperations {
    /// `passes` random passes plus a final zero pass. Blocks until shred exits.
    pub fn overwrite(shred: &str, device_path: &str, passes: u32) -> DriveResult<()> {
        tracing::info!(
            device = device_path,
            passes,
            "Starting multi-pass overwrite (final pass writes zeros)"
        );
        let passes = passes.to_string();
        run_tool(shred, &Self::overwrite_args(device_path, &passes))?;
        tracing::info!(device = device_path, "Overwrite completed successfully");
        Ok(())
    }

    pub(crate) fn overwrite_args<'a>(device_path: &'a str, passes: &'a str) -> Vec<&'a str> {
        vec!["-v", "-n", passes, "-z", device_path]
    }
}
