//! Structured JSON logging shared by every inventory process.

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Noisy dependencies held at warn unless `RUST_LOG` says otherwise
const QUIET_TARGETS: [&str; 3] = ["tokio_postgres", "deadpool_postgres", "hyper"];

#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub log_level: String,
}

impl TelemetryConfig {
    /// Filter directives applied when `RUST_LOG` is unset
    pub fn filter_directives(&self) -> String {
        QUIET_TARGETS
            .iter()
            .fold(self.log_level.clone(), |directives, target| {
                format!("{},{}=warn", directives, target)
            })
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "inventory".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.filter_directives())?,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_span_list(true)
                .with_current_span(true),
        )
        .try_init()?;

    tracing::info!(service = %config.service_name, level = %config.log_level, "logging ready");
    Ok(())
}
