//! Generative text model boundary and the Gemini client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::ItineraryError;
use crate::config::GenerationConfig;
use crate::error::CollaboratorError;
use crate::http;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// A text generation service
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Raw model output for `prompt`
    async fn generate(&self, prompt: &str) -> Result<String, CollaboratorError>;
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
    model: String,
    json_mode: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationSettings>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationSettings {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate
    fn into_text(self) -> Result<String, CollaboratorError> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(CollaboratorError::InvalidResponse(format!(
                "Model returned no output: {reason}"
            )));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        if text.trim().is_empty() {
            return Err(CollaboratorError::InvalidResponse(
                "Model returned an empty candidate".into(),
            ));
        }
        Ok(text)
    }
}

impl GeminiClient {
    pub fn from_config(config: &GenerationConfig) -> crate::Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ItineraryError::config("generation.api_key is not set"))?;

        Ok(Self {
            client: http::build_client(Duration::from_secs(u64::from(config.timeout_seconds)))?,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            json_mode: config.json_mode,
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String, CollaboratorError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = GenerateRequest {
            contents: [Content {
                parts: [RequestPart { text: prompt }],
            }],
            generation_config: self.json_mode.then_some(GenerationSettings {
                response_mime_type: "application/json",
            }),
        };
        let body = serde_json::to_vec(&request)
            .map_err(|e| CollaboratorError::InvalidResponse(format!("Failed to encode request: {e}")))?;

        let response = http::send(
            self.client
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .header(API_KEY_HEADER, &self.api_key)
                .body(body),
        )
        .await?;
        let reply: GenerateResponse = http::read_json(response).await?;
        let text = reply.into_text()?;

        debug!(chars = text.len(), "Model reply received");
        Ok(text)
    }
}
