use std::sync::OnceLock;

static JSON_MODE: OnceLock<bool> = OnceLock::new();

/// Set once from the global `--json` flag.
pub fn set_json_mode(v: bool) {
    let _ = JSON_MODE.set(v);
}

/// True when `--json` was passed or `DIVMINDER_OUTPUT_FORMAT=json`.
pub fn json_mode() -> bool {
    *JSON_MODE.get().unwrap_or(&false)
        || matches!(std::env::var("DIVMINDER_OUTPUT_FORMAT").as_deref(), Ok("json"))
}

pub fn logs_are_json() -> bool {
    matches!(std::env::var("DIVMINDER_LOG_FORMAT").as_deref(), Ok("json"))
}

/// Initialize tracing/logging according to RUST_LOG and DIVMINDER_LOG_FORMAT.
/// - Defaults to `info` if `RUST_LOG` is unset
/// - Supports `DIVMINDER_LOG_FORMAT=json` for JSON logs
/// Logs always go to stderr so stdout stays clean for envelopes.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let builder = tracing_subscriber::registry().with(filter);

    if logs_are_json() {
        let _ = builder.with(fmt_layer.json().flatten_event(true)).try_init();
    } else {
        let _ = builder.with(fmt_layer.compact()).try_init();
    }
}
