//! Chat completion client
//!
//! Single-turn calls against an OpenAI-compatible `/chat/completions`
//! endpoint. No retries: one prompt, one reply.

use crate::config::OpenAiConfig;
use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERVICE: &str = "openai";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

/// Client for a text-completion service
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl ChatClient {
    /// Create a new client
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    /// Model name sent with every request
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send one user message and return the text of the first choice
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'));

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Completion request failed");
                AppError::unavailable(SERVICE, e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), "Completion rejected");
            return Err(AppError::unavailable(
                SERVICE,
                format!("API error {}: {}", status, body),
            ));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            AppError::unavailable(SERVICE, format!("Failed to parse response: {}", e))
        })?;

        first_content(chat_response)
    }
}

fn first_content(response: ChatResponse) -> Result<String> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| AppError::AiNoContent {
            message: "No content found".to_string(),
        })?;

    if content.trim().is_empty() {
        return Err(AppError::AiNoContent {
            message: "Completion content is blank".to_string(),
        });
    }

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn decode(value: serde_json::Value) -> ChatResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_first_choice_content_returned() {
        let response = decode(json!({
            "choices": [
                { "message": { "role": "assistant", "content": "[\"p1\"]" } },
                { "message": { "role": "assistant", "content": "[\"p2\"]" } }
            ]
        }));
        assert_eq!(assert_ok!(first_content(response)), "[\"p1\"]");
    }

    #[test]
    fn test_null_content_is_no_content() {
        let response = decode(json!({
            "choices": [ { "message": { "role": "assistant", "content": null } } ]
        }));
        let err = assert_err!(first_content(response));
        assert!(matches!(err, AppError::AiNoContent { .. }));
    }

    #[test]
    fn test_missing_choices_is_no_content() {
        let err = assert_err!(first_content(decode(json!({}))));
        assert!(matches!(err, AppError::AiNoContent { .. }));
    }

    #[test]
    fn test_blank_content_is_no_content() {
        let response = decode(json!({
            "choices": [ { "message": { "content": "  \n" } } ]
        }));
        assert!(matches!(
            first_content(response),
            Err(AppError::AiNoContent { .. })
        ));
    }

    #[test]
    fn test_client_debug_hides_api_key() {
        let client = assert_ok!(ChatClient::new(OpenAiConfig {
            api_key: "sk-live-secret".into(),
            ..OpenAiConfig::default()
        }));
        let rendered = format!("{:?}", client);
        assert!(!rendered.contains("sk-live-secret"));
        assert!(rendered.contains("gpt-4o-mini"));
    }

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage { role: "user", content: "rank these" }],
            max_tokens: 256,
            temperature: 0.0,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["max_tokens"], 256);
    }
}
