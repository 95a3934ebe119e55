pub mod controller;
pub mod platform;
pub mod types;
pub mod waker;
pub mod watchdog;

pub use controller::{
    SuspendController, SuspendPassthrough, get_global_suspend_controller,
    set_global_suspend_controller,
};
pub use types::{DEFAULT_WAKE_INTERVAL, WAKE_INTERVAL_ENV};
pub use waker::{CommandWaker, IdleResetter};
pub use watchdog::WatchdogHandle;
