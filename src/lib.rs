pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::core::config::Settings;
use crate::core::redis::RedisHandle;
use crate::core::state::AppState;
use crate::services::qa_generation::GeminiQaGenerator;
use crate::services::scoring::HttpAnswerScorer;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    core::telemetry::init_tracing(settings.telemetry())?;
    core::metrics::init(settings.telemetry())?;

    let state = build_state(settings).await?;
    let addr = state.settings().server().addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        %addr,
        environment = state.settings().runtime().environment.as_str(),
        "saygenfix listening"
    );

    let redis = state.redis().clone();
    let served = axum::serve(listener, api::router::router(state))
        .with_graceful_shutdown(core::shutdown::shutdown_signal())
        .await;

    redis.disconnect().await;
    served?;
    Ok(())
}

async fn build_state(settings: Settings) -> anyhow::Result<AppState> {
    if settings.scoring().url_from_default {
        tracing::warn!(
            url = %settings.scoring().api_url,
            "SCORING_API_URL is not set; using the local default"
        );
    }

    let pool = db::init_pool(settings.database()).await?;
    db::run_migrations(&pool).await?;

    let redis = RedisHandle::new(settings.redis().url.clone());
    match redis.connect().await {
        Ok(()) => tracing::info!("Redis connected"),
        Err(err) => tracing::warn!(error = %err, "Redis unavailable; login rate limiting is off"),
    }

    let qa_generator = Arc::new(GeminiQaGenerator::from_settings(&settings)?);
    let scorer = Arc::new(HttpAnswerScorer::from_settings(&settings)?);
    Ok(AppState::new(settings, pool, redis, qa_generator, scorer))
}
