//! Structured logging shared by the receiver and the aggregator.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or unparseable. The Kafka client
/// logs every metadata refresh at info.
pub const DEFAULT_FILTER: &str = "info,rskafka=warn";

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    /// One JSON object per line, with source locations.
    Json,
}

impl LogFormat {
    /// `1` or `true` (any case) selects JSON; anything else is text.
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag.map(str::trim) {
            Some(v) if v == "1" || v.eq_ignore_ascii_case("true") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

fn env_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber.
///
/// Returns false when a subscriber was already installed, which happens
/// when tests in one binary each call this.
pub fn init_tracing(service: &'static str, directives: Option<&str>, format: LogFormat) -> bool {
    let filter = env_filter(directives);
    let shown = filter.to_string();

    let installed = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init(),
    };

    if installed.is_ok() {
        tracing::info!(service, filter = %shown, format = ?format, "Logging initialized");
    }
    installed.is_ok()
}

/// Reads `RUST_LOG` and `LOG_JSON` and installs the subscriber.
pub fn init_tracing_from_env(service: &'static str) {
    let directives = std::env::var("RUST_LOG").ok();
    let flag = std::env::var("LOG_JSON").ok();

    init_tracing(
        service,
        directives.as_deref(),
        LogFormat::from_flag(flag.as_deref()),
    );
}
