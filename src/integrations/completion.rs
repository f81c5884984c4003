//! Completion service client.
//!
//! Covers the two call shapes the pipeline needs: plain text completion
//! for query reformulation and chat completion for answer generation.
//! Both target deployment-scoped endpoints with an api-key header.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::messages::ChatMessage;
use crate::{Error, Result};

const COMPLETIONS_API_VERSION: &str = "2022-12-01";
const CHAT_API_VERSION: &str = "2023-03-15-preview";

/// Completion service client.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl CompletionClient {
    /// Create client for one service endpoint.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let base_url = endpoint.into();
        let api_key = api_key.into();

        if base_url.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "completion endpoint is empty".to_string(),
            ));
        }

        let http = Client::builder()
            .user_agent("docchat/0.1.0")
            .build()
            .map_err(|e| Error::InvalidArgument(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Plain text completion; returns the first choice's text.
    pub async fn completion(
        &self,
        deployment: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
        stop: &[&str],
    ) -> Result<String> {
        let request = CompletionRequest {
            prompt,
            temperature,
            max_tokens,
            n: 1,
            stop,
        };

        let url = format!(
            "{}/openai/deployments/{}/completions?api-version={}",
            self.base_url, deployment, COMPLETIONS_API_VERSION
        );

        let text = self.post(&url, &request).await?;

        let completion_response: CompletionResponse = serde_json::from_str(&text)
            .map_err(|e| Error::CompletionError(format!("invalid response: {}", e)))?;

        completion_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| Error::CompletionError("empty completion response".to_string()))
    }

    /// Chat completion; returns the first choice's message content.
    pub async fn chat_completion(
        &self,
        deployment: &str,
        model: &str,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
        stop: &[&str],
    ) -> Result<String> {
        let request = ChatCompletionRequest {
            model,
            messages,
            temperature,
            max_tokens,
            n: 1,
            stop,
        };

        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.base_url, deployment, CHAT_API_VERSION
        );

        let text = self.post(&url, &request).await?;

        let chat_response: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| Error::CompletionError(format!("invalid response: {}", e)))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.map(|m| m.content))
            .ok_or_else(|| Error::CompletionError("empty chat completion response".to_string()))
    }

    async fn post<T: Serialize>(&self, url: &str, request: &T) -> Result<String> {
        let response = self
            .http
            .post(url)
            .header("api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::CompletionError(format!("request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::CompletionError(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Error::CompletionError(format!("{}: {}", status, text)));
        }

        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    temperature: f32,
    max_tokens: u32,
    n: u32,
    stop: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    n: u32,
    stop: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: Option<ChatMessage>,
}
