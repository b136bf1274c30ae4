use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::utils::{AppConfig, AppError};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A generative text model: prompt in, text out.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn ask(&self, prompt: &str) -> Result<String, AppError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Gemini `generateContent` REST client
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model: model.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        if config.gemini_api_key.is_none() {
            log::warn!("⚠️  GEMINI_API_KEY not set - AI endpoints will return fallback payloads");
        }
        Self::new(config.gemini_api_key.clone(), config.gemini_model.clone())
    }
}

#[async_trait]
impl TextModel for GeminiClient {
    async fn ask(&self, prompt: &str) -> Result<String, AppError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Unavailable("GEMINI_API_KEY not configured".to_string()))?;

        log::debug!("🤖 Sending prompt to Gemini ({} chars)", prompt.len());

        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_API_BASE,
            self.model,
            urlencoding::encode(api_key)
        );

        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::UpstreamError(format!("Failed to reach Gemini: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamError(format!(
                "Gemini API error: {}",
                response.status()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::UpstreamError(format!("Failed to parse Gemini response: {}", e)))?;

        parsed
            .into_text()
            .ok_or_else(|| AppError::UpstreamError("Gemini returned no text".to_string()))
    }
}
