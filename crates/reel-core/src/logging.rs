#![forbid(unsafe_code)]

//! Logging setup.
//!
//! The controller logs through `tracing`. Hosts that want output install a
//! subscriber; with the `tracing-json` feature, [`init`] installs a `fmt`
//! subscriber filtered by `RUST_LOG` (falling back to `default_filter`).

/// Target used by every controller log event.
pub const LOG_TARGET: &str = "reel";

/// Output format for [`init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Install a global subscriber. Returns `false` if one was already set.
#[cfg(feature = "tracing-json")]
pub fn init(default_filter: &str, format: LogFormat) -> bool {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    }
}
