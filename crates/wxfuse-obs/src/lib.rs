//! Logging setup shared by wxfuse binaries
//!
//! Output is JSON by default so aggregated records logged by the daemon
//! stay machine readable. Set `WXFUSE_LOG_FORMAT=compact` for a terminal.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset: debug for wxfuse crates, info elsewhere
pub const DEFAULT_FILTER: &str = "info,wxfuse_aggregate=debug,wxfuse_daily=debug,wxfuse_daemon=debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

impl LogFormat {
    /// Parse a `WXFUSE_LOG_FORMAT` value; unknown values fall back to JSON
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("compact") => LogFormat::Compact,
            _ => LogFormat::Json,
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber and log which service started.
///
/// Calling it a second time in one process is a no-op.
pub fn init(service_name: &str) {
    let format = LogFormat::from_env_value(std::env::var("WXFUSE_LOG_FORMAT").ok().as_deref());

    let (json, compact) = match format {
        LogFormat::Json => (Some(fmt::layer().json().with_current_span(true)), None),
        LogFormat::Compact => (None, Some(fmt::layer().compact())),
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter())
        .with(json)
        .with(compact)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(service = %service_name, ?format, "Logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_selection() {
        assert_eq!(LogFormat::from_env_value(None), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value(Some(" Compact ")), LogFormat::Compact);
        assert_eq!(LogFormat::from_env_value(Some("yaml")), LogFormat::Json);
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init("wxfuse-test");
        init("wxfuse-test");
    }
}
