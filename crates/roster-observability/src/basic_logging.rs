use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default directives when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,tower_http=warn,hyper=warn,tonic=warn,h2=warn,sqlx=warn";

/// Console-only logging, used when observability is off.
///
/// # Configuration
///
/// - **Filtering**: `RUST_LOG`, falling back to [`DEFAULT_FILTER`]
/// - **Format**: compact, with file and line numbers
pub fn init_basic_console_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let console_layer = fmt::layer()
        .compact()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(true)
        .with_line_number(true)
        .with_filter(env_filter);

    // A second call (tests) leaves the first subscriber in place.
    let _ = tracing_subscriber::registry().with(console_layer).try_init();

    eprintln!("ℹ️  Observability disabled - console logging only");
}
