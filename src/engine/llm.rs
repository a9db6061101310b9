//! Optional LLM chat engine — OpenAI-compatible chat completions.
//!
//! Any transport, status, or decode failure falls back to the rule-based
//! engine, so callers never observe an error.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};

use async_trait::async_trait;

use super::mock::MockChatEngine;
use super::{BotReply, ChatEngine};
use crate::error::LlmError;

/// System prompt framing the assistant for farming queries.
pub const SYSTEM_PROMPT: &str = "You are KrishiBot, an AI assistant for farmers in India. You help with:\n1. Weather information and farming advice\n2. Government schemes and subsidies\n3. Plant protection and pest management\n4. General farming guidance\n\nKeep responses concise, practical, and farmer-friendly. Use simple language and provide actionable advice.";

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// LLM-backed chat engine with rule-based fallback.
pub struct LlmChatEngine {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: SecretString,
    fallback: MockChatEngine,
}

impl LlmChatEngine {
    pub fn new(
        base_url: String,
        model: String,
        api_key: SecretString,
        fallback: MockChatEngine,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            fallback,
        }
    }

    fn request_body(&self, text: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": text }
            ],
            "max_tokens": 500,
            "temperature": 0.7
        })
    }

    async fn complete(&self, text: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.request_body(text))
            .send()
            .await
            .map_err(|source| LlmError::Request {
                base_url: self.base_url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
            });
        }

        let parsed: ChatCompletionResponse =
            response.json().await.map_err(|source| LlmError::Request {
                base_url: self.base_url.clone(),
                source,
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse {
                reason: "no choices in completion".to_string(),
            })
    }

    /// Quick replies keyed off the user's wording, since the LLM reply itself
    /// is free-form.
    fn contextual_quick_replies(text: &str) -> Vec<String> {
        let text = text.to_lowercase();
        let contains_any = |keywords: &[&str]| keywords.iter().any(|k| text.contains(k));

        if contains_any(&["weather", "rain", "temperature"]) {
            vec![
                "7-Day Forecast".into(),
                "Weather Alerts".into(),
                "Farming Tips".into(),
            ]
        } else if contains_any(&["scheme", "subsidy", "loan"]) {
            vec![
                "PM-KISAN".into(),
                "Crop Insurance".into(),
                "Credit Schemes".into(),
            ]
        } else if contains_any(&["pest", "disease", "crop"]) {
            vec![
                "Diagnose Problem".into(),
                "Organic Solutions".into(),
                "Prevention Tips".into(),
            ]
        } else {
            vec![
                "Weather".into(),
                "Schemes".into(),
                "Plant Protection".into(),
                "Help".into(),
            ]
        }
    }
}

#[async_trait]
impl ChatEngine for LlmChatEngine {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn respond(&self, text: &str) -> BotReply {
        match self.complete(text).await {
            Ok(content) => {
                debug!(chars = content.len(), "LLM reply received");
                BotReply {
                    text: content,
                    quick_replies: Self::contextual_quick_replies(text),
                }
            }
            Err(e) => {
                warn!(error = %e, "LLM request failed, falling back to mock engine");
                self.fallback.respond(text).await
            }
        }
    }
}
