use crate::drives::operations::DriveCommands;
use crate::{DriveResult, SsdFallback, WipeConfig, WipeMethod};

pub struct SSDWipe;

impl SSDWipe {
    /// Forced zero-fill discard. Overwrite runs only when the fallback policy
    /// asks for it.
    pub fn wipe(
        commands: &dyn DriveCommands,
        device_path: &str,
        config: &WipeConfig,
        attempts: &mut Vec<WipeMethod>,
    ) -> DriveResult<WipeMethod> {
        tracing::info!(device = device_path, "Starting SSD discard");

        attempts.push(WipeMethod::Discard);
        let discard_err = match commands.discard(device_path) {
            Ok(()) => return Ok(WipeMethod::Discard),
            Err(e) => e,
        };

        match config.ssd_fallback {
            SsdFallback::None => Err(discard_err),
            SsdFallback::Overwrite => {
                tracing::warn!(
                    device = device_path,
                    error = %discard_err,
                    "Discard failed, falling back to overwrite"
                );
                attempts.push(WipeMethod::Overwrite);
                commands.overwrite(device_path, config.overwrite_passes)?;
                Ok(WipeMethod::Overwrite)
            }
        }
    }
}
