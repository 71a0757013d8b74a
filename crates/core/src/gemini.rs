//! # Gemini Completion Client
//!
//! Issues the single external `generateContent` call and classifies
//! every way it can fail into the pipeline's error taxonomy. One
//! attempt per request; retry policy, if any, belongs to callers.

use crate::error::SolveError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Default generation model
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default API host; overridable for tests
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Overall deadline for one completion call
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Seam for the external text-generation call.
///
/// The orchestrator depends on this trait rather than the concrete
/// client so tests can substitute scripted completions and failures.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate a completion for the composed prompt
    async fn complete(&self, prompt: &str) -> Result<String, SolveError>;
}

/// Configuration for the Gemini endpoint
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Provider credential; absence fails requests, not startup
    pub api_key: Option<String>,
    /// Model name, e.g. "gemini-1.5-flash"
    pub model: String,
    /// API host, normally [`DEFAULT_BASE_URL`]
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl GeminiConfig {
    /// Load configuration from `GEMINI_API_KEY` and `STEPWISE_MODEL`
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            model: std::env::var("STEPWISE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the API host (mock servers in tests)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// HTTP client for the Gemini `generateContent` endpoint
pub struct GeminiClient {
    config: GeminiConfig,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { config, http })
    }

    fn endpoint(&self, api_key: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
            api_key
        )
    }

    /// Request body with near-deterministic generation settings and
    /// permissive safety thresholds
    fn request_body(prompt: &str) -> serde_json::Value {
        json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0.1,
                "topP": 0.8,
                "maxOutputTokens": 1500,
                "candidateCount": 1
            },
            "safetySettings": [
                { "category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_NONE" },
                { "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_NONE" },
                { "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": "BLOCK_NONE" },
                { "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_NONE" }
            ]
        })
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, SolveError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| SolveError::Configuration("GEMINI_API_KEY not set".to_string()))?;

        let response = self
            .http
            .post(self.endpoint(api_key))
            .json(&Self::request_body(prompt))
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SolveError::RateLimited);
        }
        if !status.is_success() {
            return Err(SolveError::Upstream(format!(
                "provider returned HTTP {}",
                status
            )));
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| SolveError::Upstream(format!("malformed provider response: {}", e)))?;

        extract_candidate_text(payload)
    }
}

fn classify_transport_error(err: reqwest::Error) -> SolveError {
    if err.is_timeout() {
        SolveError::Timeout
    } else {
        SolveError::Upstream(err.to_string())
    }
}

/// Classify a decoded provider payload into text or a failure kind.
///
/// Safety blocks are checked before emptiness so a blocked candidate
/// with no text surfaces as `SafetyBlocked` rather than
/// `EmptyCompletion`.
fn extract_candidate_text(payload: GenerateContentResponse) -> Result<String, SolveError> {
    let candidate = payload
        .candidates
        .into_iter()
        .next()
        .ok_or(SolveError::EmptyCompletion)?;

    if candidate.finish_reason.as_deref() == Some("SAFETY") {
        return Err(SolveError::SafetyBlocked);
    }

    candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .find_map(|p| p.text)
        .filter(|t| !t.trim().is_empty())
        .ok_or(SolveError::EmptyCompletion)
}

// === Wire types ===

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_extracts_candidate_text() {
        let payload = payload(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "**Step 1:** Identify the force." }] },
                "finishReason": "STOP"
            }]
        }));
        assert_eq!(
            extract_candidate_text(payload).unwrap(),
            "**Step 1:** Identify the force."
        );
    }

    #[test]
    fn test_no_candidates_is_empty_completion() {
        let err = extract_candidate_text(payload(json!({}))).unwrap_err();
        assert!(matches!(err, SolveError::EmptyCompletion));
    }

    #[test]
    fn test_blank_text_is_empty_completion() {
        let payload = payload(json!({
            "candidates": [{ "content": { "parts": [{ "text": "   " }] } }]
        }));
        assert!(matches!(
            extract_candidate_text(payload).unwrap_err(),
            SolveError::EmptyCompletion
        ));
    }

    #[test]
    fn test_safety_block_wins_over_missing_text() {
        let payload = payload(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }));
        assert!(matches!(
            extract_candidate_text(payload).unwrap_err(),
            SolveError::SafetyBlocked
        ));
    }

    #[test]
    fn test_endpoint_shape() {
        let client = GeminiClient::new(GeminiConfig {
            api_key: Some("k".to_string()),
            ..GeminiConfig::default()
        })
        .unwrap();
        assert_eq!(
            client.endpoint("k"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent?key=k"
        );
    }

    #[test]
    fn test_request_body_generation_config() {
        let body = GeminiClient::request_body("prompt");
        assert_eq!(body["generationConfig"]["temperature"], 0.1);
        assert_eq!(body["generationConfig"]["candidateCount"], 1);
        assert_eq!(body["safetySettings"].as_array().unwrap().len(), 4);
    }
}
