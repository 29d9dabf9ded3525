//! UI-agnostic conversation state
//!
//! A [`Conversation`] is a plain value owned by whoever drives the session.
//! The terminal UI clones it into the background task that runs a turn and
//! adopts the returned value when the task finishes.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ai::Completion;
use crate::error::ProviderError;
use crate::persona::SYSTEM_PROMPT;

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// One message in the conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    role: ChatRole,
    content: String,
}

impl ChatTurn {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    pub fn role(&self) -> ChatRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Ordered chat turns for a single session.
///
/// Always starts with exactly one system turn. Turns are only ever appended:
/// a user turn, then an assistant turn if the provider answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    turns: Vec<ChatTurn>,
    has_interacted: bool,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![ChatTurn::system(system_prompt)],
            has_interacted: false,
        }
    }

    /// Append `user_text`, ask `completer` for a reply and append it.
    ///
    /// On failure the user turn stays in place and no assistant turn is added.
    pub async fn submit<C>(&mut self, user_text: &str, completer: &C) -> Result<String, ProviderError>
    where
        C: Completion + ?Sized,
    {
        self.turns.push(ChatTurn::user(user_text));
        self.has_interacted = true;
        debug!(turns = self.turns.len(), "sending conversation to provider");

        match completer.complete(&self.turns).await {
            Ok(reply) => {
                self.turns.push(ChatTurn::assistant(reply.clone()));
                Ok(reply)
            }
            Err(err) => {
                warn!(provider = err.provider(), error = %err, "completion failed");
                Err(err)
            }
        }
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Never true: the system turn is always present
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn has_interacted(&self) -> bool {
        self.has_interacted
    }

    pub fn system_prompt(&self) -> &str {
        self.turns[0].content()
    }

    /// Turns after the system instruction
    pub fn exchanges(&self) -> &[ChatTurn] {
        &self.turns[1..]
    }

    /// Content of the most recent assistant turn
    pub fn last_reply(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|turn| turn.role == ChatRole::Assistant)
            .map(ChatTurn::content)
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(SYSTEM_PROMPT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with canned answers and remembers how many turns it was sent
    struct Scripted {
        replies: Mutex<Vec<Result<String, ProviderError>>>,
        seen: Mutex<Vec<usize>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, ProviderError>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Completion for Scripted {
        async fn complete(&self, turns: &[ChatTurn]) -> Result<String, ProviderError> {
            self.seen.lock().unwrap().push(turns.len());
            self.replies.lock().unwrap().remove(0)
        }
    }

    fn quota_error() -> ProviderError {
        ProviderError::Api {
            provider: "OpenAI",
            status: 429,
            body: "quota exceeded".to_string(),
        }
    }

    #[test]
    fn test_new_conversation_has_only_system_turn() {
        let convo = Conversation::new("be brief");
        assert_eq!(convo.len(), 1);
        assert_eq!(convo.turns()[0].role(), ChatRole::System);
        assert_eq!(convo.system_prompt(), "be brief");
        assert!(!convo.has_interacted());
        assert!(convo.exchanges().is_empty());
        assert!(convo.last_reply().is_none());
    }

    #[test]
    fn test_default_uses_persona_prompt() {
        let convo = Conversation::default();
        assert!(convo.system_prompt().starts_with("You are NALA"));
    }

    #[tokio::test]
    async fn test_submit_success_appends_user_and_assistant() {
        let completer = Scripted::new(vec![Ok("A stock is a small piece of a company.".into())]);
        let mut convo = Conversation::new("sys");

        let reply = convo.submit("What is a stock?", &completer).await.unwrap();

        assert_eq!(reply, "A stock is a small piece of a company.");
        assert_eq!(convo.len(), 3);
        assert!(convo.has_interacted());
        assert_eq!(convo.turns()[1], ChatTurn::user("What is a stock?"));
        assert_eq!(convo.turns()[2].role(), ChatRole::Assistant);
        assert_eq!(convo.last_reply(), Some(reply.as_str()));
        // Provider saw system + user
        assert_eq!(*completer.seen.lock().unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_submit_failure_keeps_user_turn_only() {
        let completer = Scripted::new(vec![Err(quota_error())]);
        let mut convo = Conversation::new("sys");

        let err = convo.submit("hello", &completer).await.unwrap_err();

        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(convo.len(), 2);
        assert_eq!(convo.turns()[1].role(), ChatRole::User);
        assert!(convo.has_interacted());
        assert!(convo.last_reply().is_none());
    }

    #[tokio::test]
    async fn test_turns_accumulate_across_submits() {
        let completer = Scripted::new(vec![
            Ok("Hi! Want to learn about money?".into()),
            Err(quota_error()),
            Ok("Sure.".into()),
        ]);
        let mut convo = Conversation::new("sys");

        convo.submit("hello", &completer).await.unwrap();
        assert!(convo.submit("yes", &completer).await.is_err());
        convo.submit("yes please", &completer).await.unwrap();

        assert_eq!(convo.len(), 6);
        assert_eq!(*completer.seen.lock().unwrap(), vec![2, 4, 5]);
        let roles: Vec<ChatRole> = convo.turns().iter().map(ChatTurn::role).collect();
        assert_eq!(
            roles,
            vec![
                ChatRole::System,
                ChatRole::User,
                ChatRole::Assistant,
                ChatRole::User,
                ChatRole::User,
                ChatRole::Assistant,
            ]
        );
    }

    #[tokio::test]
    async fn test_clone_is_independent() {
        let completer = Scripted::new(vec![Ok("reply".into())]);
        let original = Conversation::new("sys");
        let mut working = original.clone();

        working.submit("question", &completer).await.unwrap();

        assert_eq!(original.len(), 1);
        assert_eq!(working.len(), 3);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatTurn::assistant("ok")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"ok"}"#);
    }
}
