//! Reference-counted keep-awake controller.
//!
//! Callers that want screen-idle suspension held off record a suspend
//! request with [`SuspendController::set_suspend`]; matched resumes release
//! it. While at least one request is active, a single watchdog thread
//! periodically resets the environment's idle timer. The controller is
//! built to sit behind an interposed windowing-API entry point: its lock is
//! recursive, every failure short of a broken OS primitive is absorbed, and
//! the wrapped capability is always forwarded to first.

pub mod domains;
pub mod errors;
pub mod infrastructure;
pub mod utils;

pub use domains::power::{
    CommandWaker, IdleResetter, SuspendController, SuspendPassthrough, WatchdogHandle,
    get_global_suspend_controller, set_global_suspend_controller,
};
pub use errors::WachError;
pub use infrastructure::suspend_bridge::handle_suspend_request;
