use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::config::Settings;
use crate::core::metrics::record_upstream_call;

/// A question with its reference answer, as produced from the source PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct GeneratedQa {
    pub(crate) question: String,
    pub(crate) answer: String,
}

#[async_trait]
pub(crate) trait QaGenerator: Send + Sync {
    async fn generate(&self, pdf: &[u8], count: u32) -> Result<Vec<GeneratedQa>>;
}

#[derive(Debug, Clone)]
pub(crate) struct GeminiQaGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiQaGenerator {
    pub(crate) fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        timeout_seconds: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let ai = settings.ai();
        Self::new(&ai.gemini_api_key, &ai.gemini_base_url, &ai.gemini_model, ai.ai_request_timeout)
    }

    async fn request(&self, pdf: &[u8], count: u32) -> Result<Vec<GeneratedQa>> {
        let payload = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {"inline_data": {"mime_type": "application/pdf", "data": STANDARD.encode(pdf)}},
                    {"text": build_prompt(count)}
                ]
            }],
            "generationConfig": {"responseMimeType": "application/json"}
        });

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .context("Failed to call Gemini API")?;

        let status = response.status();
        let raw = response.text().await.context("Failed to read Gemini API response")?;
        if !status.is_success() {
            return Err(anyhow!("Gemini API returned status {status}: {raw}"));
        }

        let body: Value = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse Gemini API response: {raw}"))?;

        let text = collect_candidate_text(&body);
        if text.trim().is_empty() {
            bail!("Gemini response contained no text parts");
        }

        parse_qa_list(&text, count as usize)
    }
}

#[async_trait]
impl QaGenerator for GeminiQaGenerator {
    async fn generate(&self, pdf: &[u8], count: u32) -> Result<Vec<GeneratedQa>> {
        let timer = Instant::now();
        tracing::info!(pdf_bytes = pdf.len(), count, model = %self.model, "Requesting QA generation");

        let result = self.request(pdf, count).await;
        let elapsed = timer.elapsed().as_secs_f64();

        match &result {
            Ok(items) => {
                record_upstream_call("gemini", "success", elapsed);
                tracing::info!(items = items.len(), duration_seconds = elapsed, "QA generation completed");
            }
            Err(err) => {
                record_upstream_call("gemini", "error", elapsed);
                tracing::warn!(error = %err, duration_seconds = elapsed, "QA generation failed");
            }
        }

        result
    }
}

fn build_prompt(count: u32) -> String {
    format!(
        "Using only the content of this PDF document, write {count} essay questions together \
         with their answers. Keep every answer short but complete enough to serve as the \
         reference when grading a student's essay by semantic similarity. Respond with a JSON \
         array only, for example: [{{\"question\": \"What is ...?\", \"answer\": \"It is ...\"}}]. \
         Do not add markdown or any text outside the JSON. Use plain text inside every question \
         and answer value."
    )
}

/// Concatenates every text part of every candidate.
fn collect_candidate_text(body: &Value) -> String {
    let mut text = String::new();
    let candidates = body.get("candidates").and_then(|value| value.as_array());

    for candidate in candidates.into_iter().flatten() {
        let parts = candidate
            .get("content")
            .and_then(|content| content.get("parts"))
            .and_then(|parts| parts.as_array());
        for part in parts.into_iter().flatten() {
            if let Some(chunk) = part.get("text").and_then(|value| value.as_str()) {
                text.push_str(chunk);
            }
        }
    }

    text
}

/// Strips whitespace and a surrounding markdown code fence.
pub(crate) fn clean_model_output(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open.strip_suffix("```").unwrap_or(without_open).trim()
}

/// Parses the model's list, dropping blank pairs and keeping at most `limit`.
pub(crate) fn parse_qa_list(raw: &str, limit: usize) -> Result<Vec<GeneratedQa>> {
    let cleaned = clean_model_output(raw);
    let parsed: Vec<GeneratedQa> =
        serde_json::from_str(cleaned).context("Failed to parse generated QA JSON")?;

    let items: Vec<GeneratedQa> = parsed
        .into_iter()
        .map(|item| GeneratedQa {
            question: item.question.trim().to_string(),
            answer: item.answer.trim().to_string(),
        })
        .filter(|item| !item.question.is_empty() && !item.answer.is_empty())
        .take(limit)
        .collect();

    if items.is_empty() {
        bail!("Generated QA list is empty");
    }

    Ok(items)
}
