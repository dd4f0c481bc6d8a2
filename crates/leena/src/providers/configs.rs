use super::anthropic::{ANTHROPIC_HOST, ANTHROPIC_MODEL};
use super::perplexity::{PERPLEXITY_HOST, PERPLEXITY_MODEL};

#[derive(Clone)]
pub struct AnthropicProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
}

impl AnthropicProviderConfig {
    /// Config for the public API with the default model
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            host: ANTHROPIC_HOST.to_string(),
            api_key: api_key.into(),
            model: ANTHROPIC_MODEL.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct PerplexityProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
}

impl PerplexityProviderConfig {
    /// Config for the public API with the default online model
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            host: PERPLEXITY_HOST.to_string(),
            api_key: api_key.into(),
            model: PERPLEXITY_MODEL.to_string(),
        }
    }
}
