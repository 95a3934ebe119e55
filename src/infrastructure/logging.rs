use env_logger::Env;

/// Initialize the process-wide logger from `WACHWERK_LOG`.
///
/// Idempotent: the embedding process may already own the global logger, in
/// which case this is a no-op.
pub fn init() {
    let _ = env_logger::Builder::from_env(Env::new().filter_or("WACHWERK_LOG", "info"))
        .format_timestamp_millis()
        .try_init();
}
