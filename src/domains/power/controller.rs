use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use parking_lot::ReentrantMutex;

use crate::utils::env::duration_secs_from_env;

use super::types::{ControllerState, DEFAULT_WAKE_INTERVAL, WAKE_INTERVAL_ENV};
use super::waker::{CommandWaker, IdleResetter};
use super::watchdog;

// Global singleton so an interposed entry point can reach the controller
// without threading a handle through foreign call stacks.
static GLOBAL_SUSPEND: OnceCell<Arc<SuspendController>> = OnceCell::new();

pub fn set_global_suspend_controller(controller: Arc<SuspendController>) {
    let _ = GLOBAL_SUSPEND.set(controller);
}

pub fn get_global_suspend_controller() -> Option<Arc<SuspendController>> {
    GLOBAL_SUSPEND.get().cloned()
}

/// Passthrough to whatever underlying capability the embedding system
/// wraps. May be entirely absent at runtime, and a call may legally
/// re-enter [`SuspendController::set_suspend`].
pub trait SuspendPassthrough: Send + Sync {
    fn forward_suspend(&self, active: bool) -> Result<()>;
}

/// Reference-counted keep-awake controller.
///
/// Tracks how many callers currently want screen-idle suspension disabled
/// and keeps exactly one watchdog thread alive while that count is above
/// zero. The internal lock is recursive: `set_suspend` is safe to call
/// concurrently from any thread and re-entrantly from the passthrough.
pub struct SuspendController {
    state: ReentrantMutex<RefCell<ControllerState>>,
    resetter: Arc<dyn IdleResetter>,
    passthrough: Option<Arc<dyn SuspendPassthrough>>,
    wake_interval: Duration,
}

impl SuspendController {
    pub fn new(
        resetter: Arc<dyn IdleResetter>,
        passthrough: Option<Arc<dyn SuspendPassthrough>>,
    ) -> Self {
        let wake_interval =
            duration_secs_from_env(WAKE_INTERVAL_ENV).unwrap_or(DEFAULT_WAKE_INTERVAL);
        Self::with_wake_interval(resetter, passthrough, wake_interval)
    }

    pub fn with_wake_interval(
        resetter: Arc<dyn IdleResetter>,
        passthrough: Option<Arc<dyn SuspendPassthrough>>,
        wake_interval: Duration,
    ) -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(ControllerState::default())),
            resetter,
            passthrough,
            wake_interval,
        }
    }

    /// Build a controller around the platform idle-reset command and
    /// register it as the process-wide instance.
    pub fn initialize(passthrough: Option<Arc<dyn SuspendPassthrough>>) -> Arc<Self> {
        let controller = Arc::new(Self::new(Arc::new(CommandWaker::new()), passthrough));
        set_global_suspend_controller(Arc::clone(&controller));
        controller
    }

    /// Record one suspend (`true`) or resume (`false`) request.
    ///
    /// All failures are absorbed; the only externally visible effects are
    /// log lines, the forwarded call, and watchdog lifecycle. A resume with
    /// no suspend active is a warned no-op, so the count never goes
    /// negative.
    pub fn set_suspend(&self, active: bool) {
        let verb = if active { "suspend" } else { "resume" };
        debug!("{verb} requested");

        let guard = self.state.lock();

        // The forward happens before any bookkeeping and regardless of it.
        // No state borrow may be live across this call: it can re-enter.
        match &self.passthrough {
            Some(passthrough) => {
                if let Err(e) = passthrough.forward_suspend(active) {
                    warn!("failed to forward {verb} to wrapped capability: {e}");
                }
            }
            None => {
                let warned = {
                    let mut state = guard.borrow_mut();
                    std::mem::replace(&mut state.passthrough_warned, true)
                };
                if !warned {
                    warn!("no wrapped suspend capability available; continuing without forwarding");
                }
            }
        }

        let stopping = {
            let mut state = guard.borrow_mut();
            if state.active_count == 0 {
                if active {
                    info!("starting watchdog");
                    state.watchdog = Some(watchdog::start(
                        Arc::clone(&self.resetter),
                        self.wake_interval,
                    ));
                    #[cfg(test)]
                    {
                        state.watchdog_starts += 1;
                    }
                    None
                } else {
                    warn!("resume requested, but no suspends are active; ignoring");
                    return;
                }
            } else if state.active_count == 1 && !active {
                info!("canceling watchdog");
                #[cfg(test)]
                {
                    state.watchdog_stops += 1;
                }
                state.watchdog.take()
            } else {
                None
            }
        };

        // Join outside the borrow. The watchdog thread never touches
        // controller state, so blocking here cannot deadlock.
        if let Some(handle) = stopping {
            handle.stop();
        }

        let count = {
            let mut state = guard.borrow_mut();
            if active {
                state.active_count += 1;
            } else {
                state.active_count -= 1;
            }
            state.active_count
        };
        debug!(
            "{count} suspend{} now active",
            if count == 1 { " is" } else { "s are" }
        );
    }

    pub fn active_suspends(&self) -> u32 {
        self.state.lock().borrow().active_count
    }

    pub fn watchdog_active(&self) -> bool {
        self.state.lock().borrow().watchdog.is_some()
    }

    #[cfg(test)]
    fn watchdog_start_stop_counts(&self) -> (usize, usize) {
        let guard = self.state.lock();
        let state = guard.borrow();
        (state.watchdog_starts, state.watchdog_stops)
    }
}

impl Drop for SuspendController {
    fn drop(&mut self) {
        let guard = self.state.lock();
        let watchdog = guard.borrow_mut().watchdog.take();
        if let Some(handle) = watchdog {
            handle.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::env::EnvAdapter;
    use anyhow::bail;
    use serial_test::serial;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use std::time::Instant;

    const TICK: Duration = Duration::from_millis(5);

    #[derive(Default)]
    struct RecordingResetter {
        calls: AtomicUsize,
    }

    impl RecordingResetter {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn wait_for_calls(&self, at_least: usize) {
            let deadline = Instant::now() + Duration::from_secs(5);
            while self.calls() < at_least && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(2));
            }
            assert!(
                self.calls() >= at_least,
                "expected at least {at_least} resets, saw {}",
                self.calls()
            );
        }
    }

    impl IdleResetter for RecordingResetter {
        fn reset_idle_timer(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingPassthrough {
        forwarded: StdMutex<Vec<bool>>,
        fail: bool,
    }

    impl RecordingPassthrough {
        fn failing() -> Self {
            Self {
                forwarded: StdMutex::new(Vec::new()),
                fail: true,
            }
        }

        fn forwarded(&self) -> Vec<bool> {
            self.forwarded.lock().unwrap().clone()
        }
    }

    impl SuspendPassthrough for RecordingPassthrough {
        fn forward_suspend(&self, active: bool) -> Result<()> {
            self.forwarded.lock().unwrap().push(active);
            if self.fail {
                bail!("capability unavailable");
            }
            Ok(())
        }
    }

    fn build_controller(
        passthrough: Option<Arc<dyn SuspendPassthrough>>,
    ) -> (SuspendController, Arc<RecordingResetter>) {
        let resetter = Arc::new(RecordingResetter::default());
        let controller =
            SuspendController::with_wake_interval(resetter.clone(), passthrough, TICK);
        (controller, resetter)
    }

    #[test]
    fn count_follows_balanced_requests() {
        let (controller, _resetter) = build_controller(None);

        controller.set_suspend(true);
        assert_eq!(controller.active_suspends(), 1);
        assert!(controller.watchdog_active());

        controller.set_suspend(true);
        assert_eq!(controller.active_suspends(), 2);
        assert!(controller.watchdog_active());

        controller.set_suspend(false);
        assert_eq!(controller.active_suspends(), 1);
        assert!(controller.watchdog_active());

        controller.set_suspend(false);
        assert_eq!(controller.active_suspends(), 0);
        assert!(!controller.watchdog_active());

        assert_eq!(controller.watchdog_start_stop_counts(), (1, 1));
    }

    #[test]
    fn resume_with_no_active_suspends_is_ignored() {
        let passthrough = Arc::new(RecordingPassthrough::default());
        let (controller, _resetter) = build_controller(Some(passthrough.clone()));

        controller.set_suspend(false);

        assert_eq!(controller.active_suspends(), 0);
        assert!(!controller.watchdog_active());
        // The forward still happened even though the bookkeeping no-oped.
        assert_eq!(passthrough.forwarded(), vec![false]);
        assert_eq!(controller.watchdog_start_stop_counts(), (0, 0));
    }

    #[test]
    fn passthrough_sees_every_request() {
        let passthrough = Arc::new(RecordingPassthrough::default());
        let (controller, _resetter) = build_controller(Some(passthrough.clone()));

        controller.set_suspend(true);
        controller.set_suspend(true);
        controller.set_suspend(false);
        controller.set_suspend(false);

        assert_eq!(passthrough.forwarded(), vec![true, true, false, false]);
    }

    #[test]
    fn passthrough_failure_is_absorbed() {
        let passthrough = Arc::new(RecordingPassthrough::failing());
        let (controller, _resetter) = build_controller(Some(passthrough.clone()));

        controller.set_suspend(true);
        assert_eq!(controller.active_suspends(), 1);
        assert!(controller.watchdog_active());

        controller.set_suspend(false);
        assert_eq!(controller.active_suspends(), 0);
        assert!(!controller.watchdog_active());
    }

    #[test]
    fn missing_passthrough_is_not_fatal() {
        let (controller, _resetter) = build_controller(None);

        controller.set_suspend(true);
        controller.set_suspend(false);
        assert_eq!(controller.active_suspends(), 0);
    }

    #[test]
    fn watchdog_ticks_while_suspended_and_stays_silent_after_resume() {
        let (controller, resetter) = build_controller(None);

        controller.set_suspend(true);
        resetter.wait_for_calls(2);

        controller.set_suspend(false);
        let after_stop = resetter.calls();
        thread::sleep(TICK * 4);
        assert_eq!(
            resetter.calls(),
            after_stop,
            "no reset may happen after the watchdog was canceled"
        );
    }

    #[test]
    fn nested_suspends_share_a_single_watchdog() {
        let (controller, _resetter) = build_controller(None);

        controller.set_suspend(true);
        controller.set_suspend(true);
        controller.set_suspend(false);
        assert!(controller.watchdog_active());
        assert_eq!(controller.watchdog_start_stop_counts(), (1, 0));

        controller.set_suspend(false);
        assert!(!controller.watchdog_active());
        assert_eq!(controller.watchdog_start_stop_counts(), (1, 1));
    }

    /// A passthrough that re-enters the controller once, the way a wrapped
    /// capability running under a recursive display lock may.
    #[derive(Default)]
    struct ReentrantPassthrough {
        controller: OnceCell<Arc<SuspendController>>,
        reentered: AtomicBool,
    }

    impl SuspendPassthrough for ReentrantPassthrough {
        fn forward_suspend(&self, active: bool) -> Result<()> {
            if active && !self.reentered.swap(true, Ordering::SeqCst) {
                if let Some(controller) = self.controller.get() {
                    controller.set_suspend(true);
                }
            }
            Ok(())
        }
    }

    #[test]
    fn reentrant_passthrough_does_not_deadlock() {
        let passthrough = Arc::new(ReentrantPassthrough::default());
        let resetter = Arc::new(RecordingResetter::default());
        let controller = Arc::new(SuspendController::with_wake_interval(
            resetter,
            Some(passthrough.clone() as Arc<dyn SuspendPassthrough>),
            TICK,
        ));
        assert!(passthrough.controller.set(Arc::clone(&controller)).is_ok());

        // The outer suspend forwards first; the re-entrant inner call runs a
        // complete set_suspend(true) of its own before the outer bookkeeping.
        controller.set_suspend(true);
        assert_eq!(controller.active_suspends(), 2);
        assert!(controller.watchdog_active());
        assert_eq!(controller.watchdog_start_stop_counts(), (1, 0));

        controller.set_suspend(false);
        controller.set_suspend(false);
        assert_eq!(controller.active_suspends(), 0);
        assert!(!controller.watchdog_active());
    }

    #[test]
    fn concurrent_balanced_requests_leave_no_watchdog_behind() {
        let (controller, _resetter) = build_controller(None);
        let controller = Arc::new(controller);

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let controller = Arc::clone(&controller);
                thread::spawn(move || {
                    controller.set_suspend(true);
                    controller.set_suspend(false);
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(controller.active_suspends(), 0);
        assert!(!controller.watchdog_active());
        // The number of lifecycle pairs depends on interleaving; the
        // property is that starts and stops balance and nothing leaks.
        let (starts, stops) = controller.watchdog_start_stop_counts();
        assert_eq!(starts, stops);
        assert!(starts >= 1);
    }

    #[test]
    #[serial]
    fn wake_interval_env_override_is_applied() {
        EnvAdapter::set_var(WAKE_INTERVAL_ENV, "42");
        let controller = SuspendController::new(Arc::new(RecordingResetter::default()), None);
        assert_eq!(controller.wake_interval, Duration::from_secs(42));
        EnvAdapter::remove_var(WAKE_INTERVAL_ENV);

        let controller = SuspendController::new(Arc::new(RecordingResetter::default()), None);
        assert_eq!(controller.wake_interval, DEFAULT_WAKE_INTERVAL);
    }

    #[test]
    fn drop_stops_a_live_watchdog() {
        let resetter = Arc::new(RecordingResetter::default());
        {
            let controller = SuspendController::with_wake_interval(resetter.clone(), None, TICK);
            controller.set_suspend(true);
            resetter.wait_for_calls(1);
        }
        let after_drop = resetter.calls();
        thread::sleep(TICK * 4);
        assert_eq!(resetter.calls(), after_drop);
    }
}
