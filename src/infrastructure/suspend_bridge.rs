use crate::domains::power::get_global_suspend_controller;

/// Forward a suspend/resume request to the process-wide controller without
/// coupling the call site to controller construction.
pub fn handle_suspend_request(active: bool) {
    match get_global_suspend_controller() {
        Some(controller) => controller.set_suspend(active),
        None => log::debug!("suspend request dropped: no global controller registered"),
    }
}
