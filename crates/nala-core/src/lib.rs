pub mod ai;
pub mod annotate;
pub mod config;
pub mod error;
pub mod glossary;
pub mod persona;
pub mod provider;
pub mod state;
pub mod transcript;

// Re-export main types for convenience
pub use ai::{Backend, ChatClient, ClaudeClient, Completion, OllamaClient, OpenAIClient};
pub use annotate::{annotate, contains_markdown_table, find_terms, segments, Segment, TermMatch};
pub use config::Config;
pub use error::ProviderError;
pub use glossary::{Glossary, GlossaryEntry};
pub use provider::Provider;
pub use state::{ChatRole, ChatTurn, Conversation};
