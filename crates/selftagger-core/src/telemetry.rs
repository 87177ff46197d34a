//! Log output for the `selftagger` binary.
//!
//! Text lines by default; newline-delimited JSON when
//! `SELFTAGGER_LOG_FORMAT=json`, which keeps the `event` fields from
//! [`crate::obs`] machine-readable. `RUST_LOG` overrides the level.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_FORMAT_ENV: &str = "SELFTAGGER_LOG_FORMAT";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Anything other than `json` (any case) is text.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }

    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV)
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }
}

/// Whether `SELFTAGGER_LOG_FORMAT` asks for JSON lines.
pub fn json_requested() -> bool {
    LogFormat::from_env() == LogFormat::Json
}

/// Install the global subscriber. Only the first call in a process has any
/// effect.
pub fn init_tracing(json: bool, level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    // Exactly one of the two layers is present.
    let json_layer = json.then(|| fmt::layer().with_target(false).json());
    let text_layer = (!json).then(|| fmt::layer().with_target(false));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init();
}
