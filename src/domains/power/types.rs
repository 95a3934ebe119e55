use std::time::Duration;

use super::watchdog::WatchdogHandle;

/// How often the watchdog performs the idle-reset action.
pub const DEFAULT_WAKE_INTERVAL: Duration = Duration::from_secs(10);

/// Environment override for the wake interval, in whole seconds.
pub const WAKE_INTERVAL_ENV: &str = "WACHWERK_WAKE_INTERVAL_SECS";

/// Mutable controller state. Only ever touched under the controller's
/// recursive lock, and never borrowed across a collaborator call.
pub struct ControllerState {
    /// Number of currently unmatched suspend requests. Clamped at zero:
    /// unmatched resumes are ignored instead of driving it negative.
    pub active_count: u32,
    /// Invariant: `Some` exactly while `active_count > 0`.
    pub watchdog: Option<WatchdogHandle>,
    pub passthrough_warned: bool,
    #[cfg(test)]
    pub watchdog_starts: usize,
    #[cfg(test)]
    pub watchdog_stops: usize,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            active_count: 0,
            watchdog: None,
            passthrough_warned: false,
            #[cfg(test)]
            watchdog_starts: 0,
            #[cfg(test)]
            watchdog_stops: 0,
        }
    }
}
