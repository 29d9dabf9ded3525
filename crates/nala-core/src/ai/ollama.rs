use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::state::ChatTurn;

const PROVIDER: &str = "Ollama";

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaMessage {
    content: String,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    #[allow(dead_code)]
    done: bool,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Deserialize)]
struct OllamaModelsResponse {
    models: Vec<OllamaModel>,
}

/// Non-success response as an error, keeping the server's own message
async fn api_error(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ProviderError::Api {
        provider: PROVIDER,
        status,
        body: with_hint(&body),
    }
}

fn with_hint(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        "Make sure Ollama is running with: ollama serve".to_string()
    } else {
        format!("{} Make sure Ollama is running with: ollama serve", body)
    }
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn chat(&self, model: &str, turns: &[ChatTurn]) -> Result<String, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);

        let request = OllamaChatRequest {
            model,
            messages: turns,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let ollama_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;

        if ollama_response.message.content.trim().is_empty() {
            return Err(ProviderError::EmptyResponse { provider: PROVIDER });
        }
        Ok(ollama_response.message.content)
    }

    pub async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let models_response: OllamaModelsResponse = response
            .json()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;
        let model_names: Vec<String> = models_response
            .models
            .into_iter()
            .map(|model| model.name)
            .collect();

        Ok(model_names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = OllamaClient::new("http://localhost:11434/");
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_chat_request_disables_streaming() {
        let turns = vec![ChatTurn::system("sys"), ChatTurn::user("hi")];
        let json = serde_json::to_value(OllamaChatRequest {
            model: "llama3.2:latest",
            messages: &turns,
            stream: false,
        })
        .unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_error_body_is_kept_with_hint() {
        let body = with_hint(r#"{"error":"model 'llama9' not found"}"#);
        assert!(body.starts_with(r#"{"error":"model 'llama9' not found"}"#));
        assert!(body.ends_with("ollama serve"));
        assert_eq!(with_hint("  "), "Make sure Ollama is running with: ollama serve");
    }

    #[test]
    fn test_chat_response_parses() {
        let response: OllamaChatResponse = serde_json::from_str(
            r#"{"model":"llama3.2","message":{"role":"assistant","content":"Hi!"},"done":true}"#,
        )
        .unwrap();
        assert_eq!(response.message.content, "Hi!");
    }
}
