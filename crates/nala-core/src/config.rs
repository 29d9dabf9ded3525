use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::glossary::Glossary;
use crate::provider::Provider;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub default_model: Option<String>,
    pub claude_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub ollama_url: Option<String>,
    /// Let glossary terms match with a trailing "s"
    pub plural_matching: bool,
    /// JSON glossary to use instead of the built-in one
    pub glossary_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            provider: Some(Provider::default().as_str().to_string()),
            default_model: None,
            claude_api_key: None,
            openai_api_key: None,
            ollama_url: None,
            plural_matching: true,
            glossary_path: None,
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("Invalid config file {}", config_path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    pub fn save_default_model(model: &str) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.default_model = Some(model.to_string());
        config.save()
    }

    /// `~/.config/nala` (or the platform equivalent)
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("nala"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    pub fn provider(&self) -> Provider {
        self.provider
            .as_deref()
            .and_then(Provider::from_str)
            .unwrap_or_default()
    }

    pub fn ollama_url(&self) -> &str {
        self.ollama_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL)
    }

    /// API key for `provider`: environment first, then the config file
    pub fn api_key(&self, provider: Provider) -> Option<String> {
        self.api_key_with(provider, |name| std::env::var(name).ok())
    }

    fn api_key_with(&self, provider: Provider, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        let from_env = provider
            .api_key_env()
            .and_then(|name| env(name))
            .filter(|key| !key.trim().is_empty());

        from_env.or_else(|| match provider {
            Provider::Claude => self.claude_api_key.clone(),
            Provider::OpenAI => self.openai_api_key.clone(),
            Provider::Ollama => None,
        })
    }

    pub fn set_api_key(&mut self, provider: Provider, key: &str) {
        match provider {
            Provider::Claude => self.claude_api_key = Some(key.to_string()),
            Provider::OpenAI => self.openai_api_key = Some(key.to_string()),
            Provider::Ollama => {}
        }
    }

    /// Glossary for this session: the configured file, or the built-in terms
    pub fn glossary(&self) -> Result<Glossary> {
        match &self.glossary_path {
            Some(path) => Glossary::load(path, self.plural_matching),
            None => Ok(Glossary::builtin(self.plural_matching)),
        }
    }
}
