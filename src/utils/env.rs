use std::sync::Mutex;
use std::time::Duration;

static ENV_LOCK: Mutex<()> = Mutex::new(());

pub struct EnvAdapter;

impl EnvAdapter {
    pub fn set_var(key: &str, value: &str) {
        let _guard = ENV_LOCK.lock().expect("env adapter mutex poisoned");
        unsafe {
            std::env::set_var(key, value);
        }
    }

    pub fn remove_var(key: &str) {
        let _guard = ENV_LOCK.lock().expect("env adapter mutex poisoned");
        unsafe {
            std::env::remove_var(key);
        }
    }
}

/// Read a positive whole-second duration from the environment.
///
/// Returns `None` when the variable is unset. Unparseable or zero values are
/// logged and treated as unset so a bad override can never stall or spin the
/// watchdog.
pub fn duration_secs_from_env(key: &str) -> Option<Duration> {
    let raw = std::env::var(key).ok()?;
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => {
            log::warn!("ignoring invalid {key}={raw}; expected a positive number of seconds");
            None
        }
    }
}
