use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::state::ChatTurn;

const PROVIDER: &str = "OpenAI";
const CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

impl OpenAIResponse {
    fn into_text(self) -> Result<String, ProviderError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse { provider: PROVIDER })
    }
}

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
}

impl OpenAIClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
        }
    }

    /// Send the whole conversation, system turn included
    pub async fn chat(&self, model: &str, turns: &[ChatTurn]) -> Result<String, ProviderError> {
        let request = OpenAIRequest {
            model,
            messages: turns,
        };

        let response = self.client
            .post(CHAT_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
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

        let openai_response: OpenAIResponse = response
            .json()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;
        openai_response.into_text()
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "gpt-3.5-turbo".to_string(),
            "gpt-4o-mini".to_string(),
            "gpt-4o".to_string(),
            "gpt-4-turbo".to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_forwards_all_turns_with_roles() {
        let turns = vec![
            ChatTurn::system("be nice"),
            ChatTurn::user("hi"),
            ChatTurn::assistant("hello"),
        ];
        let request = OpenAIRequest {
            model: "gpt-3.5-turbo",
            messages: &turns,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][2]["content"], "hello");
    }

    #[test]
    fn test_reply_is_first_choice() {
        let response: OpenAIResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"A bond is a loan."}}]}"#,
        )
        .unwrap();
        assert_eq!(response.into_text().unwrap(), "A bond is a loan.");
    }

    #[test]
    fn test_missing_content_is_empty_response() {
        let response: OpenAIResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(matches!(
            response.into_text(),
            Err(ProviderError::EmptyResponse { .. })
        ));

        let response: OpenAIResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(response.into_text().is_err());
    }
}
