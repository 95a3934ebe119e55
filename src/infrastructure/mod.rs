pub mod logging;
pub mod suspend_bridge;
