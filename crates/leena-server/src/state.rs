use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use leena::persona::Persona;
use leena::providers::anthropic::AnthropicProvider;
use leena::providers::base::{Provider, SearchProvider};
use leena::providers::perplexity::PerplexityProvider;
use leena::relay::{ChatRelay, Sampling, SearchRelay};

use crate::configuration::Settings;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatRelay>,
    pub search: Arc<SearchRelay>,
}

impl AppState {
    pub fn new(chat: ChatRelay, search: SearchRelay) -> Self {
        Self {
            chat: Arc::new(chat),
            search: Arc::new(search),
        }
    }

    /// Build both relays on top of the configured provider clients
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let provider: Arc<dyn Provider> =
            Arc::new(AnthropicProvider::new(settings.anthropic.provider_config())?);
        let search: Arc<dyn SearchProvider> =
            Arc::new(PerplexityProvider::new(settings.search.provider_config())?);

        let relay = &settings.relay;
        let mut chat_persona = Persona::chat();
        let mut search_persona = Persona::search();
        if let Some(template) = &relay.persona_template {
            chat_persona = chat_persona.with_template(template);
            search_persona = search_persona.with_template(template);
        }

        let chat = ChatRelay::new(
            provider.clone(),
            &chat_persona,
            Sampling {
                temperature: Some(relay.temperature),
                max_tokens: Some(relay.chat_max_tokens),
            },
        )?;
        let search = SearchRelay::new(
            provider,
            search,
            &search_persona,
            Sampling {
                temperature: Some(relay.temperature),
                max_tokens: Some(relay.search_max_tokens),
            },
        )?
        .with_time_limit(Duration::from_secs(relay.max_duration_secs));

        Ok(Self::new(chat, search))
    }
}
