use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::core::config::Settings;
use crate::core::metrics::record_upstream_call;

/// One student answer as sent to the scoring service.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub(crate) struct ScoringItem {
    pub(crate) id: String,
    pub(crate) question: String,
    pub(crate) correct_answer: String,
    pub(crate) student_answer: String,
}

/// Per-answer result returned by the scoring service.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub(crate) struct EssayCorrection {
    #[serde(alias = "StudentAnswerId", alias = "studentAnswerId")]
    pub(crate) student_answer_id: String,
    #[serde(alias = "Score")]
    pub(crate) score: f64,
    #[serde(default, alias = "Feedback")]
    pub(crate) feedback: String,
    #[serde(alias = "MaxScore", alias = "maxScore")]
    pub(crate) max_score: f64,
    #[serde(default, alias = "Similarity")]
    pub(crate) similarity: f64,
}

#[async_trait]
pub(crate) trait AnswerScorer: Send + Sync {
    async fn score(&self, items: &[ScoringItem]) -> Result<Vec<EssayCorrection>>;
}

#[derive(Debug, Clone)]
pub(crate) struct HttpAnswerScorer {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpAnswerScorer {
    pub(crate) fn new(api_url: &str, api_key: &str, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, api_url: api_url.to_string(), api_key: api_key.to_string() })
    }

    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let scoring = settings.scoring();
        Self::new(&scoring.api_url, &scoring.api_key, scoring.request_timeout)
    }
}

#[async_trait]
impl AnswerScorer for HttpAnswerScorer {
    async fn score(&self, items: &[ScoringItem]) -> Result<Vec<EssayCorrection>> {
        let timer = Instant::now();
        let result = self.request(items).await;
        let elapsed = timer.elapsed().as_secs_f64();

        match &result {
            Ok(corrections) => {
                record_upstream_call("scoring", "success", elapsed);
                tracing::info!(
                    items = items.len(),
                    corrections = corrections.len(),
                    duration_seconds = elapsed,
                    "Scoring request completed"
                );
            }
            Err(err) => {
                record_upstream_call("scoring", "error", elapsed);
                tracing::warn!(error = %err, duration_seconds = elapsed, "Scoring request failed");
            }
        }

        result
    }
}

impl HttpAnswerScorer {
    async fn request(&self, items: &[ScoringItem]) -> Result<Vec<EssayCorrection>> {
        let response = self
            .client
            .post(&self.api_url)
            .header("X-Api-Key", &self.api_key)
            .json(items)
            .send()
            .await
            .context("Failed to call scoring API")?;

        let status = response.status();
        let body = response.text().await.context("Failed to read scoring API response")?;

        if status != StatusCode::OK {
            return Err(anyhow!("Scoring API returned status {status}: {body}"));
        }

        serde_json::from_str::<Vec<EssayCorrection>>(&body)
            .with_context(|| format!("Failed to parse scoring API response: {body}"))
    }
}
