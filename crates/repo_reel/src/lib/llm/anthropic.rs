use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::ProviderError,
    llm::{prompt::Prompt, TextProvider},
};

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AnthropicClient {
    const API_VERSION: &str = "2023-06-01";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com/v1".into(),
            model: "claude-3-haiku-20240307".into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<String>,
}

impl MessagesResponse {
    pub fn into_text(self) -> Option<String> {
        let text = self
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

#[async_trait]
impl TextProvider for AnthropicClient {
    fn id(&self) -> &str {
        "anthropic"
    }

    async fn generate(&self, prompt: &Prompt, max_tokens: u32) -> Result<String, ProviderError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "system": prompt.system,
            "messages": [
                {
                    "role": "user",
                    "content": prompt.user
                }
            ]
        });

        let resp = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", Self::API_VERSION)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, message));
        }

        resp.json::<MessagesResponse>()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?
            .into_text()
            .ok_or_else(|| ProviderError::Malformed("message had no text content".into()))
    }
}
