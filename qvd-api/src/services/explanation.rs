//! Explanation generation
//!
//! Explanations are synthesized by a text-generation model. The reconciler and
//! the standalone endpoint only see the [`ExplanationGenerator`] trait; the
//! production implementation is [`GeminiClient`], which talks to the Gemini
//! `generateContent` REST endpoint.

use async_trait::async_trait;
use qvd_common::config::GeminiConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("qvd-api/", env!("CARGO_PKG_VERSION"));
/// Longest error body kept from a failed API response
const MAX_ERROR_BODY: usize = 500;

/// Text-generation failures
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Model returned no text")]
    EmptyResponse,
}

/// Anything that turns a prompt into explanation text
#[async_trait]
pub trait ExplanationGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Wording variants for explanation prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStyle {
    /// On-demand generation from the editor: plain text, bounded length
    Standalone,
    /// Regeneration after an edit moved the correct answer
    AfterEdit,
}

/// Question, choices and the index of the correct one
#[derive(Debug, Clone, Copy)]
pub struct ExplanationPrompt<'a> {
    question_text: &'a str,
    choices: &'a [String],
    correct_index: usize,
}

impl<'a> ExplanationPrompt<'a> {
    /// `None` when the question is blank, there are no choices, or the index is out of range
    pub fn new(question_text: &'a str, choices: &'a [String], correct_index: usize) -> Option<Self> {
        if question_text.trim().is_empty() || choices.is_empty() || correct_index >= choices.len() {
            return None;
        }
        Some(Self {
            question_text,
            choices,
            correct_index,
        })
    }

    pub fn correct_answer(&self) -> &str {
        &self.choices[self.correct_index]
    }

    pub fn render(&self, style: PromptStyle) -> String {
        let choices_text = enumerate_choices(self.choices);
        match style {
            PromptStyle::Standalone => format!(
                "Generate a concise explanation for why '{}' is the correct answer without \
                 referring to index numbers or using any formatting like bold/italic, and \
                 within 300 tokens, to the following question: {}\nChoices:\n{}",
                self.correct_answer(),
                self.question_text,
                choices_text
            ),
            PromptStyle::AfterEdit => format!(
                "Generate a concise explanation (3-4 sentences) for why '{}' is the correct \
                 answer without referring to index numbers, for the following question: {}\n\
                 Choices:\n{}",
                self.correct_answer(),
                self.question_text,
                choices_text
            ),
        }
    }
}

/// "1. first\n2. second\n..."
pub fn enumerate_choices(choices: &[String]) -> String {
    choices
        .iter()
        .enumerate()
        .map(|(i, choice)| format!("{}. {}", i + 1, choice))
        .collect::<Vec<_>>()
        .join("\n")
}

// ----------------------------------------------------------------------------
// Gemini REST client
// ----------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
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

/// Gemini API client
pub struct GeminiClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self, GenerationError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );

        Ok(Self {
            http_client,
            endpoint,
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ExplanationGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        tracing::debug!(prompt_len = prompt.len(), "Requesting explanation from Gemini");

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = clip_error_body(response.text().await.unwrap_or_default());
            tracing::warn!(status = status.as_u16(), "Gemini request failed");
            return Err(GenerationError::Api(status.as_u16(), message));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        extract_text(parsed)
    }
}

/// Concatenate the text parts of the first candidate
fn extract_text(response: GenerateContentResponse) -> Result<String, GenerationError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        Err(GenerationError::EmptyResponse)
    } else {
        Ok(text.to_string())
    }
}

/// Cut an upstream error body to at most `MAX_ERROR_BODY` bytes on a char boundary
fn clip_error_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}
