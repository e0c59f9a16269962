use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::core::config::TelemetrySettings;

/// Directives appended to `APP_LOG_LEVEL` when `RUST_LOG` is unset.
const DEPENDENCY_LEVELS: &[&str] = &["sqlx=warn", "hyper=info", "reqwest=info"];

pub(crate) fn init_tracing(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => default_filter(&settings.log_level)?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    if settings.json {
        registry.with(fmt::layer().json().with_current_span(true)).try_init()?;
    } else {
        registry.with(fmt::layer().compact().with_target(false)).try_init()?;
    }
    Ok(())
}

fn default_filter(level: &str) -> anyhow::Result<EnvFilter> {
    let mut directives = vec![level.to_string()];
    directives.extend(DEPENDENCY_LEVELS.iter().map(|directive| directive.to_string()));

    EnvFilter::try_new(directives.join(","))
        .with_context(|| format!("invalid APP_LOG_LEVEL {level:?}"))
}
