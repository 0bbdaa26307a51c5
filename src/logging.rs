use env_logger::Env;

/// Initialise stderr logging at `info`, overridable through `RUST_LOG`.
///
/// stdout is reserved for machine-readable output, so nothing here writes to it.
pub fn init() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .format_target(false)
        .init();
}
