pub mod claude;
pub mod ollama;
pub mod openai;

pub use claude::ClaudeClient;
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::provider::Provider;
use crate::state::ChatTurn;

/// Something that can turn a conversation into the next assistant reply
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, ProviderError>;
}

#[derive(Clone)]
pub enum Backend {
    Ollama(OllamaClient),
    Claude(ClaudeClient),
    OpenAI(OpenAIClient),
    /// Selected provider has no API key yet
    Unconfigured(Provider),
}

impl Backend {
    pub fn provider(&self) -> Provider {
        match self {
            Backend::Ollama(_) => Provider::Ollama,
            Backend::Claude(_) => Provider::Claude,
            Backend::OpenAI(_) => Provider::OpenAI,
            Backend::Unconfigured(provider) => *provider,
        }
    }
}

/// A provider backend bound to one model
#[derive(Clone)]
pub struct ChatClient {
    backend: Backend,
    model: String,
}

impl ChatClient {
    pub fn new(backend: Backend, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }

    pub fn provider(&self) -> Provider {
        self.backend.provider()
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Completion for ChatClient {
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, ProviderError> {
        match &self.backend {
            Backend::Ollama(client) => client.chat(&self.model, turns).await,
            Backend::Claude(client) => client.chat(&self.model, turns).await,
            Backend::OpenAI(client) => client.chat(&self.model, turns).await,
            Backend::Unconfigured(provider) => Err(ProviderError::MissingApiKey {
                provider: provider.label(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_backend_reports_missing_key() {
        let client = ChatClient::new(Backend::Unconfigured(Provider::Claude), "claude-3-5-haiku-20241022");
        let err = client.complete(&[ChatTurn::user("hi")]).await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingApiKey { provider: "Claude" }));
        assert_eq!(client.provider(), Provider::Claude);
    }

    #[test]
    fn test_backend_provider() {
        assert_eq!(Backend::OpenAI(OpenAIClient::new("k")).provider(), Provider::OpenAI);
        assert_eq!(
            Backend::Ollama(OllamaClient::new("http://localhost:11434")).provider(),
            Provider::Ollama
        );
    }
}
