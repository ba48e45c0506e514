use tracing_subscriber::prelude::*;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
};

fn default_directive(verbose: bool) -> &'static str {
    if verbose { "negproc_rs=debug,negproc=debug,info" } else { "info" }
}

/// Installs the global subscriber on stderr.
///
/// `RUST_LOG` takes precedence; otherwise `verbose` raises this crate to
/// `debug`. Span close events (with their busy time) are only printed at
/// debug level, where they double as a per-stage profile.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    let span_events = if filter.to_string().contains("debug") {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_timer(fmt::time::uptime())
        .with_span_events(span_events);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
