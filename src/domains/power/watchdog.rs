use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};
use nix::sys::signal::{SigSet, SigmaskHow, pthread_sigmask};
use parking_lot::{Condvar, Mutex};

use crate::utils::fatal::fatal_os;

use super::waker::IdleResetter;

/// Cooperative stop latch shared between the controller and the watchdog
/// thread. The thread sleeps on the condvar, so a stop request interrupts
/// the wait instead of burning out the full interval.
struct StopLatch {
    stopped: Mutex<bool>,
    wakeup: Condvar,
}

impl StopLatch {
    fn new() -> Self {
        Self {
            stopped: Mutex::new(false),
            wakeup: Condvar::new(),
        }
    }

    /// Wait up to `timeout` for a stop request. Returns true once stop has
    /// been requested, whether it arrived before or during the wait.
    fn wait(&self, timeout: Duration) -> bool {
        let mut stopped = self.stopped.lock();
        if *stopped {
            return true;
        }
        self.wakeup.wait_for(&mut stopped, timeout);
        *stopped
    }

    fn trip(&self) {
        *self.stopped.lock() = true;
        self.wakeup.notify_all();
    }
}

/// Exclusive handle to a running watchdog thread.
pub struct WatchdogHandle {
    latch: Arc<StopLatch>,
    thread: JoinHandle<()>,
}

impl WatchdogHandle {
    /// Request cancellation and join the thread. Once this returns, no
    /// further idle-reset invocation can occur. Consuming `self` makes a
    /// second stop unrepresentable.
    pub fn stop(self) {
        self.latch.trip();
        if self.thread.join().is_err() {
            warn!("watchdog thread panicked before it could be joined");
        }
    }
}

/// Spawn the watchdog thread.
///
/// The new thread must not receive signal delivery meant for other threads,
/// so the spawning thread masks everything first and the thread inherits an
/// all-blocked mask; the spawner's own mask is restored right after the
/// spawn. Mask or thread-creation failures invalidate the concurrency
/// invariants and abort the process.
pub fn start(resetter: Arc<dyn IdleResetter>, interval: Duration) -> WatchdogHandle {
    let latch = Arc::new(StopLatch::new());
    let thread_latch = Arc::clone(&latch);

    let mut previous = SigSet::empty();
    if let Err(e) = pthread_sigmask(
        SigmaskHow::SIG_SETMASK,
        Some(&SigSet::all()),
        Some(&mut previous),
    ) {
        fatal_os("masking signals before watchdog spawn", e);
    }

    let spawned = thread::Builder::new()
        .name("wachwerk-watchdog".into())
        .spawn(move || run(resetter, thread_latch, interval));

    if let Err(e) = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&previous), None) {
        fatal_os("restoring signal mask after watchdog spawn", e);
    }

    let thread = match spawned {
        Ok(handle) => handle,
        Err(e) => fatal_os("spawning watchdog thread", e),
    };

    WatchdogHandle { latch, thread }
}

fn run(resetter: Arc<dyn IdleResetter>, latch: Arc<StopLatch>, interval: Duration) {
    loop {
        debug!("resetting idle timer");
        if let Err(e) = resetter.reset_idle_timer() {
            warn!("idle reset failed, watchdog keeps running: {e}");
        }
        if latch.wait(interval) {
            break;
        }
    }
    debug!("watchdog thread exiting");
}
