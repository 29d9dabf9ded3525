use thiserror::Error;

/// Any failure raised by a completion provider.
///
/// Callers are expected to treat every variant the same way: show the message
/// inline and keep the session alive.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: &'static str },

    #[error("{provider} API key not configured. Press 'P' to set one up.")]
    MissingApiKey { provider: &'static str },
}

impl ProviderError {
    pub(crate) fn transport(provider: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| ProviderError::Transport { provider, source }
    }

    /// Name of the provider that produced the error
    pub fn provider(&self) -> &'static str {
        match self {
            ProviderError::Transport { provider, .. }
            | ProviderError::Api { provider, .. }
            | ProviderError::EmptyResponse { provider }
            | ProviderError::MissingApiKey { provider } => *provider,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_keeps_underlying_message() {
        let err = ProviderError::Api {
            provider: "OpenAI",
            status: 429,
            body: "You exceeded your current quota".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("429"));
        assert!(msg.contains("You exceeded your current quota"));
        assert_eq!(err.provider(), "OpenAI");
    }

    #[test]
    fn test_missing_key_mentions_provider() {
        let err = ProviderError::MissingApiKey { provider: "Claude" };
        assert!(err.to_string().starts_with("Claude API key not configured"));
    }
}
