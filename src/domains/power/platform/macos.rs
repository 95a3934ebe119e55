use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::Command;

use crate::errors::WachError;

use super::{PlatformAdapter, clear_signal_mask};

pub struct MacOsAdapter {
    caffeinate_path: PathBuf,
}

impl MacOsAdapter {
    pub fn new() -> Result<Self, WachError> {
        let path = which::which("caffeinate").map_err(|e| WachError::ConfigError {
            key: "caffeinate".into(),
            message: format!("caffeinate not found in PATH: {e}"),
        })?;

        Ok(Self {
            caffeinate_path: path,
        })
    }
}

impl PlatformAdapter for MacOsAdapter {
    fn build_command(&self) -> Result<Command, WachError> {
        let mut cmd = Command::new(&self.caffeinate_path);
        cmd.arg("-u") // declare user active
            .arg("-t")
            .arg("1");

        unsafe {
            cmd.pre_exec(clear_signal_mask);
        }

        Ok(cmd)
    }
}
