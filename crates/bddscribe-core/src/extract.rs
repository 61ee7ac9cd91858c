//! LLM extraction boundary: one HTML chunk in, one untrusted record out.
//!
//! The contract is strict: `extract` must never fail. Any internal error —
//! transport, timeout, a completion that is not JSON, missing fields —
//! degrades to the empty record with a warning, because the upstream model
//! is inherently noisy and a single bad chunk must not abort the run.

// Internal imports (std, crate)
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::record::RawEndpointRecord;

// External imports (alphabetized)
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};

/// Approximate USD cost per token, per model. Unknown models use the
/// fallback rate.
const COST_PER_TOKEN: &[(&str, f64)] = &[("gpt-3.5-turbo", 0.000002), ("gpt-4", 0.00003)];
const FALLBACK_COST_PER_TOKEN: f64 = 0.00001;

const SYSTEM_PROMPT: &str = "You are an API documentation analyzer. Extract structured endpoint \
                             information from Swagger UI HTML and return only valid JSON without \
                             any additional text.";

/// Accumulated extraction-call accounting for the tracker.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct UsageReport {
    pub calls: u64,
    pub total_tokens: u64,
    pub estimated_cost_usd: f64,
}

/// Converts one HTML fragment into an unvalidated endpoint record.
///
/// Implementations are stateless per call and independently retryable; the
/// pipeline fans calls out concurrently and folds results in input order.
#[async_trait]
pub trait ChunkExtractor: Send + Sync {
    /// Extract a record from one chunk. Never fails: any internal failure
    /// yields `RawEndpointRecord::empty()`.
    async fn extract(&self, chunk_html: &str) -> RawEndpointRecord;

    /// Accounting snapshot for run metrics. Defaults to zeros for
    /// implementations with nothing to report.
    fn usage(&self) -> UsageReport {
        UsageReport::default()
    }
}

/// Extractor backed by an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiExtractor {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    timeout: Duration,
    calls: AtomicU64,
    total_tokens: AtomicU64,
}

impl OpenAiExtractor {
    pub const DEFAULT_API_BASE: &'static str = "https://api.openai.com/v1";

    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: Self::DEFAULT_API_BASE.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            timeout: Duration::from_secs(60),
            calls: AtomicU64::new(0),
            total_tokens: AtomicU64::new(0),
        }
    }

    /// Point at a non-default API base (proxy, Azure, local server).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn complete(&self, chunk_html: &str) -> Result<RawEndpointRecord> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": build_prompt(chunk_html)},
            ],
            "max_tokens": 2000,
            "temperature": 0.0,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::extract(format!("Completion request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::extract(format!(
                "Completion request failed: HTTP {}",
                response.status()
            )));
        }

        let value: JsonValue = response
            .json()
            .await
            .map_err(|e| Error::extract(format!("Completion response was not JSON: {}", e)))?;

        self.calls.fetch_add(1, Ordering::Relaxed);
        if let Some(tokens) = value
            .get("usage")
            .and_then(|u| u.get("total_tokens"))
            .and_then(JsonValue::as_u64)
        {
            self.total_tokens.fetch_add(tokens, Ordering::Relaxed);
        }

        let content = value
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(JsonValue::as_str)
            .ok_or_else(|| Error::extract("Completion carried no message content"))?;

        let parsed: JsonValue = serde_json::from_str(strip_code_fences(content).as_str())
            .map_err(|e| Error::extract(format!("Invalid JSON from model: {}", e)))?;

        Ok(RawEndpointRecord::from_llm_json(&parsed))
    }
}

#[async_trait]
impl ChunkExtractor for OpenAiExtractor {
    async fn extract(&self, chunk_html: &str) -> RawEndpointRecord {
        log::debug!("Processing HTML chunk ({} bytes) with LLM", chunk_html.len());
        match self.complete(chunk_html).await {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Skipping chunk after extraction failure: {}", e);
                RawEndpointRecord::empty()
            }
        }
    }

    fn usage(&self) -> UsageReport {
        let calls = self.calls.load(Ordering::Relaxed);
        let total_tokens = self.total_tokens.load(Ordering::Relaxed);
        UsageReport {
            calls,
            total_tokens,
            estimated_cost_usd: total_tokens as f64 * cost_per_token(&self.model),
        }
    }
}

fn cost_per_token(model: &str) -> f64 {
    COST_PER_TOKEN
        .iter()
        .find(|(m, _)| *m == model)
        .map(|(_, rate)| *rate)
        .unwrap_or(FALLBACK_COST_PER_TOKEN)
}

/// Models wrap JSON in Markdown fences despite instructions; strip them.
fn strip_code_fences(content: &str) -> String {
    content
        .trim()
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string()
}

fn build_prompt(chunk_html: &str) -> String {
    format!(
        r#"Extract the API endpoint described by this Swagger UI HTML fragment.

Return a JSON object with this structure:
{{
    "path": "string",
    "method": "string (GET/POST/PUT/PATCH/DELETE)",
    "parameters": [
        {{
            "name": "string",
            "in": "path|query|header|cookie",
            "required": true,
            "type": "string",
            "description": "string"
        }}
    ],
    "requestBody": {{
        "required": true,
        "content": {{ "application/json": {{ "schema": {{}} }} }}
    }},
    "responses": {{
        "200": {{ "description": "string", "content": {{}} }}
    }}
}}

Guidelines:
1. Use the exact path and method shown in the fragment
2. Omit requestBody when the operation has none
3. Include every documented status code under responses
4. Return only the JSON object, no surrounding text

HTML:
{}"#,
        chunk_html
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(
            strip_code_fences("```json\n{\"path\": \"/a\"}\n```"),
            "{\"path\": \"/a\"}"
        );
        assert_eq!(strip_code_fences("{\"path\": \"/a\"}"), "{\"path\": \"/a\"}");
    }

    #[test]
    fn test_prompt_embeds_fragment() {
        let prompt = build_prompt("<div>GET /Books</div>");
        assert!(prompt.contains("<div>GET /Books</div>"));
        assert!(prompt.contains("\"responses\""));
    }

    #[test]
    fn test_cost_table() {
        assert_eq!(cost_per_token("gpt-4"), 0.00003);
        assert_eq!(cost_per_token("some-unknown-model"), FALLBACK_COST_PER_TOKEN);
    }

    #[test]
    fn test_usage_starts_at_zero() {
        let extractor = OpenAiExtractor::new("key", "gpt-3.5-turbo");
        let usage = extractor.usage();
        assert_eq!(usage.calls, 0);
        assert_eq!(usage.total_tokens, 0);
        assert_eq!(usage.estimated_cost_usd, 0.0);
    }
}
