use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Single-line human-readable records.
    Compact,
    /// JSON lines, for runs whose logs are collected by another tool.
    Json,
}

/// `RUST_LOG` wins when set; otherwise this crate logs at info, or debug
/// with `verbose`.
fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("excess_mortality=debug,info")
        } else {
            EnvFilter::new("excess_mortality=info")
        }
    })
}

pub fn init_logger(format: LogFormat, verbose: bool) {
    let layer = tracing_subscriber::fmt::layer()
        .with_target(verbose)
        .with_file(false)
        .with_line_number(false);

    let registry = tracing_subscriber::registry().with(default_filter(verbose));
    match format {
        LogFormat::Compact => registry.with(layer.compact()).init(),
        LogFormat::Json => registry.with(layer.json()).init(),
    }
}
