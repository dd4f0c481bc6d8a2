use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::SearchProvider;
use super::configs::PerplexityProviderConfig;

pub const PERPLEXITY_HOST: &str = "https://api.perplexity.ai";
pub const PERPLEXITY_MODEL: &str = "llama-3-sonar-large-32k-online";

/// Web search through Perplexity's online models, which speak the OpenAI chat completions API
pub struct PerplexityProvider {
    client: Client,
    config: PerplexityProviderConfig,
}

impl PerplexityProvider {
    pub fn new(config: PerplexityProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self { client, config })
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!(
            "{}/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(anyhow!("Search server error: {}", status))
            }
            status => Err(anyhow!("Search request failed: {}", status)),
        }
    }
}

/// Extract the answer text from an OpenAI-style chat completion
pub fn completion_text(response: &Value) -> Result<String> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| anyhow!("Invalid response format from search API: missing message content"))
}

#[async_trait]
impl SearchProvider for PerplexityProvider {
    async fn search(&self, system: &str, query: &str) -> Result<String> {
        let payload = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": query}
            ]
        });

        let response = self.post(payload).await?;

        if let Some(error) = response.get("error") {
            return Err(anyhow!("Search API error: {}", error));
        }

        completion_text(&response)
    }
}
