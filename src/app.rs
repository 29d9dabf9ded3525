use nala_core::{
    find_terms, Backend, ChatClient, ClaudeClient, Config, Conversation, Glossary, OllamaClient,
    OpenAIClient, Provider, ProviderError,
};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Result of a background turn: the updated conversation plus the reply
pub type TurnOutcome = (Conversation, Result<String, ProviderError>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Chat,
    Terms,
    Input,
}

/// A glossary term that appears in the latest reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundTerm {
    pub term: String,
    pub definition: String,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,
    pub show_intro: bool,

    // Conversation
    pub conversation: Conversation,
    pub glossary: Glossary,
    pub last_error: Option<ProviderError>,
    pub pending_input: Option<String>, // user text of the turn in flight
    pub turn_task: Option<JoinHandle<TurnOutcome>>,
    pub status: Option<String>,

    // Input and chat view
    pub query_input: String,
    pub query_cursor: usize, // cursor position in query_input
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Terms panel
    pub found_terms: Vec<FoundTerm>,
    pub terms_state: ListState,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Model picker state
    pub show_model_picker: bool,
    pub available_models: Vec<String>,
    pub model_picker_state: ListState,

    // Provider state
    pub config: Config,
    pub current_provider: Provider,
    pub selected_model: String,
    pub ollama: OllamaClient,
    pub claude_client: Option<ClaudeClient>,
    pub openai_client: Option<OpenAIClient>,
    pub show_provider_picker: bool,
    pub provider_picker_state: ListState,

    // API key input state
    pub show_api_key_input: bool,
    pub api_key_input: String,
    pub api_key_input_cursor: usize,
    pub api_key_target_provider: Option<Provider>,

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub terms_area: Option<Rect>,
}

impl App {
    pub fn new(config: Config, glossary: Glossary) -> Self {
        let ollama = OllamaClient::new(config.ollama_url());
        let current_provider = config.provider();

        // Initialize API clients - env vars first, then config
        let claude_client = config
            .api_key(Provider::Claude)
            .map(|k| ClaudeClient::new(&k));
        let openai_client = config
            .api_key(Provider::OpenAI)
            .map(|k| OpenAIClient::new(&k));

        let selected_model = config
            .default_model
            .clone()
            .unwrap_or_else(|| default_model_for(current_provider));

        info!(
            provider = current_provider.as_str(),
            model = %selected_model,
            glossary_terms = glossary.len(),
            "session started"
        );

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Input,
            show_intro: true,

            conversation: Conversation::default(),
            glossary,
            last_error: None,
            pending_input: None,
            turn_task: None,
            status: None,

            query_input: String::new(),
            query_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            found_terms: Vec::new(),
            terms_state: ListState::default(),

            animation_frame: 0,

            show_model_picker: false,
            available_models: Vec::new(),
            model_picker_state: ListState::default(),

            config,
            current_provider,
            selected_model,
            ollama,
            claude_client,
            openai_client,
            show_provider_picker: false,
            provider_picker_state: ListState::default(),

            show_api_key_input: false,
            api_key_input: String::new(),
            api_key_input_cursor: 0,
            api_key_target_provider: None,

            chat_area: None,
            terms_area: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.turn_task.is_some()
    }

    /// Client for the selected provider and model
    pub fn chat_client(&self) -> ChatClient {
        let backend = match self.current_provider {
            Provider::Ollama => Backend::Ollama(self.ollama.clone()),
            Provider::Claude => self
                .claude_client
                .clone()
                .map(Backend::Claude)
                .unwrap_or(Backend::Unconfigured(Provider::Claude)),
            Provider::OpenAI => self
                .openai_client
                .clone()
                .map(Backend::OpenAI)
                .unwrap_or(Backend::Unconfigured(Provider::OpenAI)),
        };
        ChatClient::new(backend, self.selected_model.clone())
    }

    /// Send the typed question in a background task.
    ///
    /// The task works on its own copy of the conversation; [`App::poll_turn`]
    /// adopts it once the provider answers.
    pub fn start_turn(&mut self) {
        let text = self.query_input.trim().to_string();
        if text.is_empty() || self.turn_task.is_some() {
            return;
        }

        self.query_input.clear();
        self.query_cursor = 0;
        self.input_mode = InputMode::Normal;
        self.focus = FocusPane::Chat;
        self.last_error = None;
        self.status = None;
        self.pending_input = Some(text.clone());

        // Scroll to bottom so "typing..." is visible
        self.scroll_chat_to_bottom();

        let client = self.chat_client();
        info!(
            provider = client.provider().as_str(),
            model = client.model(),
            "sending question"
        );

        let mut conversation = self.conversation.clone();
        self.turn_task = Some(tokio::spawn(async move {
            let reply = conversation.submit(&text, &client).await;
            (conversation, reply)
        }));
    }

    /// Pick up the finished turn, if any
    pub async fn poll_turn(&mut self) {
        let finished = self
            .turn_task
            .as_ref()
            .map(|task| task.is_finished())
            .unwrap_or(false);
        if !finished {
            return;
        }

        if let Some(task) = self.turn_task.take() {
            match task.await {
                Ok((conversation, reply)) => self.finish_turn(conversation, reply),
                Err(err) => {
                    error!(error = %err, "turn task failed");
                    self.pending_input = None;
                    self.status = Some("Request was interrupted. Please try again.".to_string());
                }
            }
        }
    }

    pub fn finish_turn(&mut self, conversation: Conversation, reply: Result<String, ProviderError>) {
        self.conversation = conversation;
        self.pending_input = None;

        match reply {
            Ok(_) => {
                self.last_error = None;
                self.refresh_terms();
            }
            Err(err) => {
                warn!(error = %err, "showing provider error inline");
                self.last_error = Some(err);
            }
        }

        self.scroll_chat_to_bottom();
    }

    /// Rebuild the Terms panel from the latest reply, first occurrence first
    pub fn refresh_terms(&mut self) {
        self.found_terms.clear();

        if let Some(reply) = self.conversation.last_reply() {
            for found in find_terms(reply, &self.glossary) {
                if self.found_terms.iter().any(|t| t.term == found.term) {
                    continue;
                }
                self.found_terms.push(FoundTerm {
                    term: found.term.to_string(),
                    definition: found.definition.to_string(),
                });
            }
        }

        self.terms_state
            .select(if self.found_terms.is_empty() { None } else { Some(0) });
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Scroll chat to bottom so the newest message is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let count_lines = |content: &str| -> u16 {
            content
                .lines()
                .map(|line| line.chars().count() / wrap_width + 1)
                .fold(0u16, |acc, n| acc.saturating_add(u16::try_from(n).unwrap_or(u16::MAX)))
                .max(1)
        };

        let mut total_lines: u16 = 0;
        for turn in self.conversation.exchanges() {
            // Role line + content + blank line
            total_lines = total_lines
                .saturating_add(count_lines(turn.content()))
                .saturating_add(2);
        }
        if let Some(pending) = &self.pending_input {
            total_lines = total_lines.saturating_add(count_lines(pending)).saturating_add(2);
            total_lines = total_lines.saturating_add(2); // "NALA:" + "typing..."
        }
        if self.last_error.is_some() {
            total_lines = total_lines.saturating_add(2);
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    pub fn terms_nav_down(&mut self) {
        let len = self.found_terms.len();
        if len > 0 {
            let i = self.terms_state.selected().unwrap_or(0);
            self.terms_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn terms_nav_up(&mut self) {
        let i = self.terms_state.selected().unwrap_or(0);
        self.terms_state.select(Some(i.saturating_sub(1)));
    }

    pub fn export_transcript(&mut self) {
        let error = self.last_error.as_ref().map(|e| e.to_string());
        let result = transcripts_dir().and_then(|dir| {
            nala_core::transcript::export(&self.conversation, &self.glossary, error.as_deref(), &dir)
        });

        self.status = Some(match result {
            Ok(path) => format!("Saved transcript to {}", path.display()),
            Err(err) => {
                warn!(error = %err, "transcript export failed");
                format!("Could not save transcript: {}", err)
            }
        });
    }

    // Model picker methods
    pub fn model_picker_nav_down(&mut self) {
        let len = self.available_models.len();
        if len > 0 {
            let i = self.model_picker_state.selected().unwrap_or(0);
            self.model_picker_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn model_picker_nav_up(&mut self) {
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn select_model(&mut self) {
        if let Some(i) = self.model_picker_state.selected() {
            if let Some(model) = self.available_models.get(i) {
                self.selected_model = model.clone();
                self.show_model_picker = false;
                self.config.default_model = Some(model.clone());
                if let Err(err) = Config::save_default_model(&self.selected_model) {
                    warn!(error = %err, "could not save default model");
                }
            }
        }
    }

    // Provider picker methods
    pub fn provider_picker_nav_down(&mut self) {
        let len = Provider::all().len();
        if len > 0 {
            let i = self.provider_picker_state.selected().unwrap_or(0);
            self.provider_picker_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn provider_picker_nav_up(&mut self) {
        let i = self.provider_picker_state.selected().unwrap_or(0);
        self.provider_picker_state.select(Some(i.saturating_sub(1)));
    }

    /// Switch provider, pick its first model and remember the choice
    pub fn set_provider(&mut self, provider: Provider, first_model: Option<String>) {
        self.current_provider = provider;
        self.selected_model = first_model.unwrap_or_else(|| default_model_for(provider));
        self.config.provider = Some(provider.as_str().to_string());
        self.config.default_model = Some(self.selected_model.clone());
        if let Err(err) = self.config.save() {
            warn!(error = %err, "could not save provider choice");
        }
        info!(provider = provider.as_str(), model = %self.selected_model, "provider changed");
    }

    /// Store a pasted API key and switch to its provider
    pub fn save_api_key(&mut self, provider: Provider, key: &str) {
        match provider {
            Provider::Claude => self.claude_client = Some(ClaudeClient::new(key)),
            Provider::OpenAI => self.openai_client = Some(OpenAIClient::new(key)),
            Provider::Ollama => {}
        }
        self.config.set_api_key(provider, key);
        let first_model = self.get_models_for_provider(provider).into_iter().next();
        self.set_provider(provider, first_model);
    }

    pub fn get_models_for_provider(&self, provider: Provider) -> Vec<String> {
        match provider {
            Provider::Ollama => Vec::new(), // Will be fetched async
            Provider::Claude => ClaudeClient::list_models(),
            Provider::OpenAI => OpenAIClient::list_models(),
        }
    }

    /// Returns the source of the API key for a provider: "env", "config", "local" or None
    pub fn get_key_source(&self, provider: Provider) -> Option<&'static str> {
        let configured = match provider {
            Provider::Ollama => return Some("local"),
            Provider::Claude => self.claude_client.is_some(),
            Provider::OpenAI => self.openai_client.is_some(),
        };

        let in_env = provider
            .api_key_env()
            .map(|name| std::env::var(name).is_ok())
            .unwrap_or(false);

        if in_env {
            Some("env")
        } else if configured {
            Some("config")
        } else {
            None
        }
    }
}

fn default_model_for(provider: Provider) -> String {
    match provider {
        Provider::Ollama => "llama3.2:latest".to_string(),
        Provider::Claude => ClaudeClient::list_models().into_iter().next().unwrap_or_default(),
        Provider::OpenAI => OpenAIClient::list_models().into_iter().next().unwrap_or_default(),
    }
}

fn transcripts_dir() -> anyhow::Result<PathBuf> {
    Ok(Config::config_dir()?.join("transcripts"))
}
