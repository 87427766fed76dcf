//! Model adapter implementations.
//!
//! Lorebook never runs a model in-process. The [`HttpModelAdapter`] calls a
//! model-server sidecar exposing the three scoring capabilities as JSON
//! endpoints; the [`DisabledAdapter`] is used when no model server is
//! configured and makes "capability unavailable" a constructed value
//! rather than a scattered null check.
//!
//! # Endpoints
//!
//! | Method | Path | Request | Response |
//! |--------|------|---------|----------|
//! | `POST` | `/answer` | `{question, context}` | `{answer, score}` |
//! | `POST` | `/embed` | `{text}` | `{embedding: [f32]}` |
//! | `POST` | `/classify` | `{text, labels}` | `{labels, scores}` |
//!
//! # Retry Strategy
//!
//! Transient failures retry with exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! Failures surface as [`AdapterError::Call`], which the aggregators treat
//! as "skip this unit" — a flaky model server degrades results, it never
//! fails a batch.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use lorebook_core::adapter::{AdapterError, AnswerSpan, LabelScore, ModelAdapter};

use crate::config::AdapterConfig;

/// A no-op adapter that reports every capability unavailable.
///
/// Used when `adapter.provider = "disabled"` in the configuration.
pub struct DisabledAdapter;

#[async_trait]
impl ModelAdapter for DisabledAdapter {
    async fn answer(&self, _question: &str, _context: &str) -> Result<AnswerSpan, AdapterError> {
        Err(AdapterError::Unavailable("question answering"))
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, AdapterError> {
        Err(AdapterError::Unavailable("embedding"))
    }

    async fn classify(
        &self,
        _text: &str,
        _labels: &[&str],
    ) -> Result<Vec<LabelScore>, AdapterError> {
        Err(AdapterError::Unavailable("zero-shot classification"))
    }
}

/// Adapter calling a model server over HTTP with retry and backoff.
pub struct HttpModelAdapter {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl HttpModelAdapter {
    /// Create an adapter from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not set or the HTTP client
    /// cannot be constructed.
    pub fn new(config: &AdapterConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("adapter.base_url required for http provider"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
        })
    }

    /// POST `body` to `path`, retrying transient failures.
    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, AdapterError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self.client.post(&url).json(body).send().await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response
                            .json()
                            .await
                            .map_err(|e| AdapterError::Call(e.to_string()));
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(AdapterError::Call(format!(
                            "model server error {}: {}",
                            status, body_text
                        )));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    return Err(AdapterError::Call(format!(
                        "model server error {}: {}",
                        status, body_text
                    )));
                }
                Err(e) => {
                    last_err = Some(AdapterError::Call(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| AdapterError::Call("model call failed after retries".into())))
    }
}

#[async_trait]
impl ModelAdapter for HttpModelAdapter {
    async fn answer(&self, question: &str, context: &str) -> Result<AnswerSpan, AdapterError> {
        let body = json!({ "question": question, "context": context });
        let json = self.post_json("/answer", &body).await?;

        let text = json
            .get("answer")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AdapterError::Call("invalid answer response: missing answer".into()))?
            .to_string();
        let score = json
            .get("score")
            .and_then(|v| v.as_f64())
            .ok_or_else(|| AdapterError::Call("invalid answer response: missing score".into()))?
            as f32;

        Ok(AnswerSpan { text, score })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AdapterError> {
        let body = json!({ "text": text });
        let json = self.post_json("/embed", &body).await?;

        let embedding = json
            .get("embedding")
            .and_then(|v| v.as_array())
            .ok_or_else(|| AdapterError::Call("invalid embed response: missing embedding".into()))?;

        Ok(embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect())
    }

    async fn classify(&self, text: &str, labels: &[&str]) -> Result<Vec<LabelScore>, AdapterError> {
        let body = json!({ "text": text, "labels": labels });
        let json = self.post_json("/classify", &body).await?;

        let names = json
            .get("labels")
            .and_then(|v| v.as_array())
            .ok_or_else(|| AdapterError::Call("invalid classify response: missing labels".into()))?;
        let scores = json
            .get("scores")
            .and_then(|v| v.as_array())
            .ok_or_else(|| AdapterError::Call("invalid classify response: missing scores".into()))?;

        if names.len() != scores.len() || names.len() != labels.len() {
            return Err(AdapterError::Call(format!(
                "invalid classify response: expected {} labels, got {}",
                labels.len(),
                names.len().min(scores.len())
            )));
        }

        Ok(names
            .iter()
            .zip(scores.iter())
            .map(|(l, s)| LabelScore {
                label: l.as_str().unwrap_or_default().to_string(),
                score: s.as_f64().unwrap_or(0.0) as f32,
            })
            .collect())
    }
}

/// Create the appropriate [`ModelAdapter`] based on configuration.
///
/// | Config Value | Adapter |
/// |-------------|---------|
/// | `"disabled"` | [`DisabledAdapter`] |
/// | `"http"` | [`HttpModelAdapter`] |
pub fn create_adapter(config: &AdapterConfig) -> Result<Box<dyn ModelAdapter>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledAdapter)),
        "http" => Ok(Box::new(HttpModelAdapter::new(config)?)),
        other => anyhow::bail!("Unknown adapter provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_adapter_reports_unavailable() {
        let adapter = DisabledAdapter;
        assert!(matches!(
            adapter.answer("q", "ctx").await,
            Err(AdapterError::Unavailable(_))
        ));
        assert!(matches!(
            adapter.embed("text").await,
            Err(AdapterError::Unavailable(_))
        ));
        assert!(matches!(
            adapter.classify("text", &["a"]).await,
            Err(AdapterError::Unavailable(_))
        ));
    }

    #[test]
    fn test_http_adapter_requires_base_url() {
        let config = AdapterConfig {
            provider: "http".to_string(),
            ..AdapterConfig::default()
        };
        assert!(HttpModelAdapter::new(&config).is_err());
    }

    #[test]
    fn test_create_adapter_rejects_unknown_provider() {
        let config = AdapterConfig {
            provider: "onnx".to_string(),
            ..AdapterConfig::default()
        };
        assert!(create_adapter(&config).is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = AdapterConfig {
            provider: "http".to_string(),
            base_url: Some("http://127.0.0.1:8090/".to_string()),
            ..AdapterConfig::default()
        };
        let adapter = HttpModelAdapter::new(&config).unwrap();
        assert_eq!(adapter.base_url, "http://127.0.0.1:8090");
    }
}
