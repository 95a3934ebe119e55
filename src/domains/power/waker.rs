use anyhow::{Result, bail};
use log::warn;

use crate::errors::WachError;

use super::platform::{PlatformAdapter, default_adapter};

/// Side-effecting action that tells the environment's idle/screensaver
/// subsystem that activity has occurred. Invoked by the watchdog on every
/// tick; must be callable from any thread.
pub trait IdleResetter: Send + Sync {
    fn reset_idle_timer(&self) -> Result<()>;
}

/// Production resetter: runs the platform reset utility to completion.
///
/// If the utility cannot be resolved at construction the waker degrades
/// rather than failing: one warning up front, then an error per tick that
/// the watchdog logs and absorbs.
pub struct CommandWaker {
    adapter: Option<Box<dyn PlatformAdapter>>,
}

impl CommandWaker {
    pub fn new() -> Self {
        match default_adapter() {
            Ok(adapter) => Self {
                adapter: Some(Box::new(adapter)),
            },
            Err(e) => {
                warn!("idle-reset command unavailable, keep-awake runs degraded: {e}");
                Self { adapter: None }
            }
        }
    }

    pub fn with_adapter(adapter: Box<dyn PlatformAdapter>) -> Self {
        Self {
            adapter: Some(adapter),
        }
    }
}

impl Default for CommandWaker {
    fn default() -> Self {
        Self::new()
    }
}

impl IdleResetter for CommandWaker {
    fn reset_idle_timer(&self) -> Result<()> {
        let Some(adapter) = self.adapter.as_deref() else {
            bail!("no idle-reset command available on this system");
        };

        let mut cmd = adapter.build_command()?;
        // The utility is short-lived; running it to completion reaps the
        // child in-line instead of leaving a zombie per tick.
        let status = cmd
            .status()
            .map_err(|e| WachError::io("run_idle_reset", format!("{cmd:?}"), e))?;
        if !status.success() {
            bail!("idle-reset command exited with {status}");
        }
        Ok(())
    }
}
