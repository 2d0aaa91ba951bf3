// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Chat client for model-based extraction via OpenAI-compatible API

use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

#[derive(serde::Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(serde::Serialize)]
struct ChatMessage {
    role: String,
    content: serde_json::Value,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(serde::Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Client for a chat-completion model with image input support
pub struct ChatClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl ChatClient {
    /// Create a new chat client
    pub fn new(endpoint: &str, api_key: Option<String>, model: &str, timeout_ms: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One completion round trip: system instruction, user text and an
    /// optional PNG image embedded as a data URL. Returns the raw reply
    /// text; callers parse it defensively.
    pub async fn complete(
        &self,
        system: &str,
        user_text: &str,
        image_png: Option<&[u8]>,
    ) -> Result<String> {
        let mut content = vec![serde_json::json!({ "type": "text", "text": user_text })];
        if let Some(png) = image_png {
            let data_url = format!("data:image/png;base64,{}", STANDARD.encode(png));
            content.push(serde_json::json!({
                "type": "image_url",
                "image_url": { "url": data_url }
            }));
        }

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: serde_json::Value::String(system.to_string()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: serde_json::Value::Array(content),
                },
            ],
            max_tokens: 512,
            temperature: 0.1,
        };

        let mut builder = self
            .client
            .post(format!("{}/v1/chat/completions", self.endpoint))
            .json(&request);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?.error_for_status()?;
        let chat_response: ChatResponse = response.json().await?;

        let text = chat_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();
        debug!(model = %self.model, reply_len = text.len(), "chat completion received");

        Ok(text)
    }
}
