use std::fmt::Display;

/// Abort the process after logging a diagnostic.
///
/// Reserved for OS-primitive failures (signal masking, thread creation)
/// where a violated locking or threading invariant makes it unsafe to keep
/// running. Collaborator failures are never routed here.
pub fn fatal_os(operation: &str, err: impl Display) -> ! {
    log::error!("{operation} failed: {err}; aborting");
    std::process::abort()
}
