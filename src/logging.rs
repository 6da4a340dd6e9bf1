/// Install the global tracing subscriber.
///
/// `MAPLEFILE_LOG` overrides the default filter and `MAPLEFILE_LOG_JSON`
/// switches to JSON lines. Diagnostics go to stderr; stdout stays free for
/// command output. Calling this more than once is harmless; later calls
/// leave the first subscriber in place, which keeps test binaries from
/// fighting over the global default.
pub fn init_logging() {
    let filter = std::env::var("MAPLEFILE_LOG")
        .unwrap_or_else(|_| "maplefile=info,sqlx=warn".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339());

    if std::env::var_os("MAPLEFILE_LOG_JSON").is_some() {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}
