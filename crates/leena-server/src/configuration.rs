use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use leena::providers::anthropic::{ANTHROPIC_HOST, ANTHROPIC_MODEL};
use leena::providers::configs::{AnthropicProviderConfig, PerplexityProviderConfig};
use leena::providers::perplexity::{PERPLEXITY_HOST, PERPLEXITY_MODEL};
use serde::Deserialize;
use std::fmt;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

// Credential variables the hosted deployment already sets
const ANTHROPIC_KEY_VAR: &str = "ANTHROPIC_API_KEY";
const SEARCH_KEY_VAR: &str = "PPLX_API_KEY";

#[derive(Debug, Default, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Deserialize)]
pub struct AnthropicSettings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_anthropic_host")]
    pub host: String,
    #[serde(default = "default_anthropic_model")]
    pub model: String,
}

impl AnthropicSettings {
    pub fn provider_config(&self) -> AnthropicProviderConfig {
        AnthropicProviderConfig {
            host: self.host.clone(),
            api_key: self.api_key.clone().unwrap_or_default(),
            model: self.model.clone(),
        }
    }
}

impl fmt::Debug for AnthropicSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("host", &self.host)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Deserialize)]
pub struct SearchSettings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_search_host")]
    pub host: String,
    #[serde(default = "default_search_model")]
    pub model: String,
}

impl SearchSettings {
    pub fn provider_config(&self) -> PerplexityProviderConfig {
        PerplexityProviderConfig {
            host: self.host.clone(),
            api_key: self.api_key.clone().unwrap_or_default(),
            model: self.model.clone(),
        }
    }
}

impl fmt::Debug for SearchSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("host", &self.host)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct RelaySettings {
    #[serde(default = "default_chat_max_tokens")]
    pub chat_max_tokens: i32,
    #[serde(default = "default_search_max_tokens")]
    pub search_max_tokens: i32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,
    #[serde(default)]
    pub persona_template: Option<PathBuf>,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            chat_max_tokens: default_chat_max_tokens(),
            search_max_tokens: default_search_max_tokens(),
            temperature: default_temperature(),
            max_duration_secs: default_max_duration_secs(),
            persona_template: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub anthropic: AnthropicSettings,
    pub search: SearchSettings,
    #[serde(default)]
    pub relay: RelaySettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        // Start with default configuration
        let mut builder = Config::builder()
            // Server defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            // Provider defaults
            .set_default("anthropic.host", default_anthropic_host())?
            .set_default("anthropic.model", default_anthropic_model())?
            .set_default("search.host", default_search_host())?
            .set_default("search.model", default_search_model())?;

        // Plain credential variables sit below the prefixed ones
        if let Ok(key) = std::env::var(ANTHROPIC_KEY_VAR) {
            builder = builder.set_default("anthropic.api_key", key)?;
        }
        if let Ok(key) = std::env::var(SEARCH_KEY_VAR) {
            builder = builder.set_default("search.api_key", key)?;
        }

        let config = builder
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("LEENA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Self = match config.try_deserialize() {
            Ok(settings) => settings,
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    // Extract field name from error message "missing field `type`"
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches('`');
                    return Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    });
                } else if let config::ConfigError::NotFound(field) = &err {
                    return Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    });
                }
                return Err(ConfigError::Other(err));
            }
        };

        settings.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        let missing = |key: &Option<String>| key.as_deref().map_or(true, |k| k.trim().is_empty());

        if missing(&self.anthropic.api_key) {
            return Err(ConfigError::MissingEnvVar {
                env_var: to_env_var("anthropic.api_key"),
            });
        }
        if missing(&self.search.api_key) {
            return Err(ConfigError::MissingEnvVar {
                env_var: to_env_var("search.api_key"),
            });
        }
        Ok(self)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_anthropic_host() -> String {
    ANTHROPIC_HOST.to_string()
}

fn default_anthropic_model() -> String {
    ANTHROPIC_MODEL.to_string()
}

fn default_search_host() -> String {
    PERPLEXITY_HOST.to_string()
}

fn default_search_model() -> String {
    PERPLEXITY_MODEL.to_string()
}

fn default_chat_max_tokens() -> i32 {
    1000
}

fn default_search_max_tokens() -> i32 {
    4000
}

fn default_temperature() -> f32 {
    1.0
}

fn default_max_duration_secs() -> u64 {
    60
}
