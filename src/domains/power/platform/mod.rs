use std::process::Command;

use crate::errors::WachError;

#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "linux")]
pub use linux::LinuxAdapter as PlatformAdapterImpl;
#[cfg(target_os = "macos")]
pub use macos::MacOsAdapter as PlatformAdapterImpl;

pub trait PlatformAdapter: Send + Sync {
    /// Build the idle-reset command specific to the platform.
    ///
    /// The returned command must be safe to run from the watchdog thread,
    /// which executes with all signals blocked: the child's signal mask has
    /// to be cleared before exec.
    fn build_command(&self) -> Result<Command, WachError>;
}

pub fn default_adapter() -> Result<PlatformAdapterImpl, WachError> {
    PlatformAdapterImpl::new()
}

/// Clear the inherited signal mask in the child before exec.
///
/// The watchdog thread spawns with every signal blocked and the reset
/// utility would inherit that mask across exec. Handler dispositions revert
/// to default on exec by themselves; only the mask has to be reset by hand.
/// Must stay async-signal-safe, so raw libc only.
pub(crate) fn clear_signal_mask() -> std::io::Result<()> {
    unsafe {
        let mut set: libc::sigset_t = std::mem::zeroed();
        if libc::sigemptyset(&mut set) != 0 {
            return Err(std::io::Error::last_os_error());
        }
        if libc::sigprocmask(libc::SIG_SETMASK, &set, std::ptr::null_mut()) != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}
