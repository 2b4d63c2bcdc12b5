use crate::drives::operations::DriveCommands;
use crate::{DriveResult, WipeConfig, WipeMethod};

pub struct HDDWipe;

impl HDDWipe {
    /// Firmware secure erase first; multi-pass overwrite if the drive,
    /// controller or tool refuses.
    ///
    /// Every method tried is pushed onto `attempts`. Returns the method that
    /// completed, or the last error.
    pub fn wipe(
        commands: &dyn DriveCommands,
        device_path: &str,
        config: &WipeConfig,
        attempts: &mut Vec<WipeMethod>,
    ) -> DriveResult<WipeMethod> {
        tracing::info!(device = device_path, "Starting HDD secure erase");

        attempts.push(WipeMethod::SecureErase);
        match commands.secure_erase(device_path, &config.erase_password) {
            Ok(()) => return Ok(WipeMethod::SecureErase),
            Err(e) => tracing::warn!(
                device = device_path,
                error = %e,
                "Hardware secure erase not available, falling back to overwrite"
            ),
        }

        attempts.push(WipeMethod::Overwrite);
        commands.overwrite(device_path, config.overwrite_passes)?;
        Ok(WipeMethod::Overwrite)
    }
}
