use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::state::{ChatRole, ChatTurn};

const PROVIDER: &str = "Claude";
const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

#[derive(Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<&'a ChatTurn>,
}

impl<'a> ClaudeRequest<'a> {
    /// The Messages API takes the system instruction as a separate field
    fn new(model: &'a str, turns: &'a [ChatTurn]) -> Self {
        let system = turns
            .iter()
            .find(|t| t.role() == ChatRole::System)
            .map(ChatTurn::content);
        let messages = turns
            .iter()
            .filter(|t| t.role() != ChatRole::System)
            .collect();

        Self {
            model,
            max_tokens: 4096,
            system,
            messages,
        }
    }
}

#[derive(Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
}

impl ClaudeResponse {
    fn into_text(self) -> Result<String, ProviderError> {
        let text: String = self
            .content
            .into_iter()
            .filter_map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse { provider: PROVIDER });
        }
        Ok(text)
    }
}

#[derive(Clone)]
pub struct ClaudeClient {
    client: Client,
    api_key: String,
}

impl ClaudeClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
        }
    }

    pub async fn chat(&self, model: &str, turns: &[ChatTurn]) -> Result<String, ProviderError> {
        let request = ClaudeRequest::new(model, turns);

        let response = self.client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: PROVIDER,
                status,
                body,
            });
        }

        let claude_response: ClaudeResponse = response
            .json()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;
        claude_response.into_text()
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "claude-sonnet-4-20250514".to_string(),
            "claude-3-5-sonnet-20241022".to_string(),
            "claude-3-5-haiku-20241022".to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_turn_moves_to_top_level() {
        let turns = vec![ChatTurn::system("You are NALA"), ChatTurn::user("What is a budget?")];
        let json = serde_json::to_value(ClaudeRequest::new("claude-3-5-haiku-20241022", &turns)).unwrap();

        assert_eq!(json["system"], "You are NALA");
        assert_eq!(json["max_tokens"], 4096);
        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
    }

    #[test]
    fn test_text_blocks_are_joined() {
        let response: ClaudeResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"Save "},{"type":"text","text":"early."}]}"#,
        )
        .unwrap();
        assert_eq!(response.into_text().unwrap(), "Save early.");
    }

    #[test]
    fn test_no_text_is_empty_response() {
        let response: ClaudeResponse = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert!(matches!(
            response.into_text(),
            Err(ProviderError::EmptyResponse { provider: "Claude" })
        ));
    }
}
