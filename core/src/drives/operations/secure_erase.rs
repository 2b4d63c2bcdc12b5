use super::run_tool;
use crate::DriveResult;

/// ATA security erase through hdparm
pub struct ATASecureErase;

impl ATASecureErase {
    /// Two-step erase: set the user password, then SECURITY ERASE UNIT.
    ///
    /// If the password was accepted but the erase failed, the drive is left
    /// locked; the credential is cleared again so a software overwrite can
    /// still write to it.
    pub fn erase_with_credential(hdparm: &str, device_path: &str, password: &str) -> DriveResult<()> {
        tracing::info!(device = device_path, "Running ATA secure erase");

        Self::set_password(hdparm, device_path, password)?;

        if let Err(e) = run_tool(hdparm, &Self::erase_args(device_path, password)) {
            tracing::warn!(device = device_path, error = %e, "Secure erase failed, clearing security password");
            if let Err(disable_err) = Self::disable_password(hdparm, device_path, password) {
                tracing::warn!(
                    device = device_path,
                    error = %disable_err,
                    "Could not clear security password, drive may stay locked"
                );
            }
            return Err(e);
        }

        tracing::info!(device = device_path, "Hardware secure erase completed successfully");
        Ok(())
    }

    fn set_password(hdparm: &str, device_path: &str, password: &str) -> DriveResult<()> {
        run_tool(hdparm, &Self::set_password_args(device_path, password))
    }

    fn disable_password(hdparm: &str, device_path: &str, password: &str) -> DriveResult<()> {
        run_tool(hdparm, &Self::disable_args(device_path, password))
    }

    pub(crate) fn set_password_args<'a>(device_path: &'a str, password: &'a str) -> Vec<&'a str> {
        vec!["--user-master", "u", "--security-set-pass", password, device_path]
    }

    pub(crate) fn erase_args<'a>(device_path: &'a str, password: &'a str) -> Vec<&'a str> {
        vec!["--user-master", "u", "--security-erase", password, device_path]
    }

    pub(crate) fn disable_args<'a>(device_path: &'a str, password: &'a str) -> Vec<&'a str> {
        vec!["--user-master", "u", "--security-disable", password, device_path]
    }
}
