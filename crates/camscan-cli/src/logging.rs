//! Tracing setup. Logs go to stderr so stdout stays machine-readable.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// HTTP stack crates kept at `warn` unless `RUST_LOG` says otherwise.
const NOISY_MODULES: &[&str] = &["hyper", "hyper_util", "reqwest", "h2", "rustls"];

fn build_filter(log_level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::new(default_directives(log_level))
}

fn default_directives(log_level: &str) -> String {
    let mut directives = format!("warn,camscan={log_level}");
    for module in NOISY_MODULES {
        directives.push_str(&format!(",{module}=warn"));
    }
    directives
}

pub fn init_logging(log_level: &str) {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false);

    let _ = tracing_subscriber::registry()
        .with(build_filter(log_level))
        .with(fmt_layer)
        .try_init();
}
