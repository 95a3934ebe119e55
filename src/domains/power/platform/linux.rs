use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::Command;

use crate::errors::WachError;

use super::{PlatformAdapter, clear_signal_mask};

pub struct LinuxAdapter {
    screensaver_path: PathBuf,
}

impl LinuxAdapter {
    pub fn new() -> Result<Self, WachError> {
        let path = which::which("xdg-screensaver").map_err(|e| WachError::ConfigError {
            key: "xdg-screensaver".into(),
            message: format!("xdg-screensaver not found in PATH: {e}"),
        })?;

        Ok(Self {
            screensaver_path: path,
        })
    }
}

impl PlatformAdapter for LinuxAdapter {
    fn build_command(&self) -> Result<Command, WachError> {
        let mut cmd = Command::new(&self.screensaver_path);
        cmd.arg("reset");

        unsafe {
            cmd.pre_exec(clear_signal_mask);
        }

        Ok(cmd)
    }
}
