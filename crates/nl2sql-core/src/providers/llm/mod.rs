use crate::model::LlmResponse;
use async_trait::async_trait;

/// Provider-agnostic chat completion: one system preamble, one user message.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> anyhow::Result<LlmResponse>;
    fn provider_name(&self) -> &'static str;
    fn model(&self) -> &str {
        "default"
    }
}

pub mod cached;
pub mod gemini;
pub mod openai;
