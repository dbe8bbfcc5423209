use tracing_subscriber::EnvFilter;

/// JSON lines on stdout for CloudWatch. Lambda stamps each line itself, so
/// the subscriber timestamp is dropped. `RUST_LOG` overrides the `info`
/// default; `debug` adds the rendered SQL.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(false)
        .with_target(false)
        .with_ansi(false)
        .without_time()
        .init();
}
