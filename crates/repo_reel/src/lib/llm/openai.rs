use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::ProviderError,
    llm::{prompt::Prompt, TextProvider},
};

/// Client for any service speaking the OpenAI chat-completions protocol.
///
/// Groq, Together and the Hugging Face router expose the same endpoint shape,
/// so they are configured through the named constructors rather than
/// separate types.
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: Client,
    id: String,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAIClient {
    const TEMPERATURE: f32 = 0.7;

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            id: "openai".into(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
        }
    }

    pub fn groq(api_key: impl Into<String>) -> Self {
        Self::new(api_key)
            .with_id("groq")
            .with_base_url("https://api.groq.com/openai/v1")
            .with_model("llama3-8b-8192")
    }

    pub fn together(api_key: impl Into<String>) -> Self {
        Self::new(api_key)
            .with_id("together")
            .with_base_url("https://api.together.xyz/v1")
            .with_model("meta-llama/Llama-3-8b-chat-hf")
    }

    pub fn huggingface(api_key: impl Into<String>) -> Self {
        Self::new(api_key)
            .with_id("huggingface")
            .with_base_url("https://router.huggingface.co/v1")
            .with_model("meta-llama/Llama-3.1-8B-Instruct")
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub async fn send_completion_request(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<CompletionResponse, ProviderError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "temperature": Self::TEMPERATURE,
            "messages": [
                {
                    "role": "system",
                    "content": system
                },
                {
                    "role": "user",
                    "content": user
                }
            ]
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(provider = %self.id, error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            tracing::warn!(provider = %self.id, status, "Completion request rejected");
            return Err(ProviderError::from_status(status, message));
        }

        resp.json::<CompletionResponse>()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionMessage {
    pub content: Option<String>,
}

impl CompletionResponse {
    /// Text of the first choice, if it has any
    pub fn into_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
    }
}

#[async_trait]
impl TextProvider for OpenAIClient {
    fn id(&self) -> &str {
        &self.id
    }

    async fn generate(&self, prompt: &Prompt, max_tokens: u32) -> Result<String, ProviderError> {
        self.send_completion_request(&prompt.system, &prompt.user, max_tokens)
            .await?
            .into_text()
            .ok_or_else(|| ProviderError::Malformed("completion had no content".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_text_takes_first_non_empty_choice() {
        let resp: CompletionResponse = serde_json::from_value(serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "  [0:00 - 0:10] Title: Hi \n"}, "finish_reason": "stop"}
            ]
        }))
        .unwrap();
        assert_eq!(resp.into_text().as_deref(), Some("[0:00 - 0:10] Title: Hi"));

        let empty: CompletionResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"content": null}}]
        }))
        .unwrap();
        assert!(empty.into_text().is_none());
    }

    #[test]
    fn test_named_constructors() {
        let groq = OpenAIClient::groq("key");
        assert_eq!(groq.id(), "groq");
        assert_eq!(groq.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(OpenAIClient::new("key").id(), "openai");
    }
}
