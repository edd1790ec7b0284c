pub mod anthropic;
pub mod openai;
pub mod prompt;

use std::{fmt, str::FromStr, sync::Arc};

use async_trait::async_trait;

use crate::{
    error::ProviderError,
    llm::{anthropic::AnthropicClient, openai::OpenAIClient, prompt::Prompt},
};

/// A remote text-generation service that can draft a video script.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Stable identifier used in logs and [`crate::types::ProviderAttempt`]s
    fn id(&self) -> &str;

    async fn generate(&self, prompt: &Prompt, max_tokens: u32) -> Result<String, ProviderError>;
}

/// The hosted providers the binary knows how to configure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Groq,
    OpenAI,
    Anthropic,
    Together,
    HuggingFace,
}

impl ProviderKind {
    /// Priority order used when none is configured
    pub const DEFAULT_ORDER: [ProviderKind; 5] = [
        ProviderKind::Groq,
        ProviderKind::OpenAI,
        ProviderKind::Anthropic,
        ProviderKind::Together,
        ProviderKind::HuggingFace,
    ];

    pub fn build(self, api_key: impl Into<String>) -> Arc<dyn TextProvider> {
        match self {
            ProviderKind::Groq => Arc::new(OpenAIClient::groq(api_key)),
            ProviderKind::OpenAI => Arc::new(OpenAIClient::new(api_key)),
            ProviderKind::Anthropic => Arc::new(AnthropicClient::new(api_key)),
            ProviderKind::Together => Arc::new(OpenAIClient::together(api_key)),
            ProviderKind::HuggingFace => Arc::new(OpenAIClient::huggingface(api_key)),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(ProviderKind::Groq),
            "openai" => Ok(ProviderKind::OpenAI),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "together" => Ok(ProviderKind::Together),
            "huggingface" | "hf" => Ok(ProviderKind::HuggingFace),
            other => anyhow::bail!("Unknown provider '{other}'"),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderKind::Groq => "groq",
            ProviderKind::OpenAI => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Together => "together",
            ProviderKind::HuggingFace => "huggingface",
        };
        f.write_str(s)
    }
}

/// Builds the provider chain in `order`, skipping providers without a key
pub fn provider_chain<F>(order: &[ProviderKind], mut key_for: F) -> Vec<Arc<dyn TextProvider>>
where
    F: FnMut(ProviderKind) -> Option<String>,
{
    order
        .iter()
        .filter_map(|kind| {
            let key = key_for(*kind).filter(|k| !k.trim().is_empty());
            if key.is_none() {
                tracing::debug!(provider = %kind, "No API key configured, skipping provider");
            }
            key.map(|k| kind.build(k))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!("Groq".parse::<ProviderKind>().unwrap(), ProviderKind::Groq);
        assert_eq!("hf".parse::<ProviderKind>().unwrap(), ProviderKind::HuggingFace);
        assert!("cohere".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_provider_chain_keeps_order_and_skips_missing_keys() {
        let chain = provider_chain(&ProviderKind::DEFAULT_ORDER, |kind| match kind {
            ProviderKind::OpenAI => Some("sk-test".into()),
            ProviderKind::Anthropic => Some("sk-ant".into()),
            ProviderKind::Groq => Some("  ".into()),
            _ => None,
        });

        let ids = chain.iter().map(|p| p.id()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["openai", "anthropic"]);
    }
}
