//! The two relays between the chat UI and the model
//!
//! Both are stateless: each `reply` call makes its own sequence of outbound calls and keeps nothing.
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::errors::{RelayError, RelayResult};
use crate::models::message::{Message, ToolRequest};
use crate::models::tool::{Tool, WEB_SEARCH_TOOL};
use crate::persona::Persona;
use crate::providers::base::{Provider, SearchProvider};

/// Instructions sent to the search backend along with the model's query
pub const SEARCH_INSTRUCTIONS: &str = "Be precise and concise.";

/// Upper bound on one search relay request, covering two model calls and a search
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(60);

/// Sampling parameters for the model calls a relay makes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

impl Sampling {
    pub fn chat() -> Self {
        Self {
            temperature: Some(1.0),
            max_tokens: Some(1000),
        }
    }

    pub fn search() -> Self {
        Self {
            temperature: Some(1.0),
            max_tokens: Some(4000),
        }
    }
}

/// Return the first text segment of a model response as the reply
///
/// A response without text, or with only whitespace, is a provider failure.
pub fn reply_text(message: &Message) -> RelayResult<String> {
    match message.first_text() {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        Some(_) => Err(RelayError::ProviderFailure(
            "model response text was empty".to_string(),
        )),
        None => Err(RelayError::ProviderFailure(
            "model response contained no text segment".to_string(),
        )),
    }
}

fn ensure_conversation(messages: &[Message]) -> RelayResult<()> {
    if messages.is_empty() {
        return Err(RelayError::InvalidRequest(
            "conversation must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Forwards a conversation to the model once and returns its reply
pub struct ChatRelay {
    provider: Arc<dyn Provider>,
    system: String,
    sampling: Sampling,
}

impl ChatRelay {
    pub fn new(
        provider: Arc<dyn Provider>,
        persona: &Persona,
        sampling: Sampling,
    ) -> Result<Self, tera::Error> {
        Ok(Self {
            provider,
            system: persona.render()?,
            sampling,
        })
    }

    /// The rendered persona instructions
    pub fn system(&self) -> &str {
        &self.system
    }

    pub async fn reply(&self, messages: &[Message]) -> RelayResult<String> {
        ensure_conversation(messages)?;

        let (response, usage) = self
            .provider
            .complete(
                &self.system,
                messages,
                &[],
                self.sampling.temperature,
                self.sampling.max_tokens,
            )
            .await?;
        debug!(?usage, "chat relay received model response");

        reply_text(&response)
    }
}

/// What the model decided on its first pass
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// No search wanted, the response is the answer
    Direct(Message),
    /// The model asked for a web search in `turn`
    Search { turn: Message, request: ToolRequest },
}

impl Decision {
    /// Classify a model response; only a request naming web_search triggers a search
    pub fn from_response(response: Message) -> Self {
        let request = response
            .tool_requests()
            .find(|request| request.tool_call.name == WEB_SEARCH_TOOL)
            .cloned();

        match request {
            Some(request) => Decision::Search {
                turn: response,
                request,
            },
            None => Decision::Direct(response),
        }
    }
}

/// Forwards a conversation to the model with the web_search tool declared, running at most
/// one search on the model's behalf
pub struct SearchRelay {
    provider: Arc<dyn Provider>,
    search: Arc<dyn SearchProvider>,
    system: String,
    sampling: Sampling,
    tool: Tool,
    time_limit: Duration,
}

impl SearchRelay {
    pub fn new(
        provider: Arc<dyn Provider>,
        search: Arc<dyn SearchProvider>,
        persona: &Persona,
        sampling: Sampling,
    ) -> Result<Self, tera::Error> {
        Ok(Self {
            provider,
            search,
            system: persona.render()?,
            sampling,
            tool: Tool::web_search(),
            time_limit: DEFAULT_TIME_LIMIT,
        })
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    /// The rendered persona instructions
    pub fn system(&self) -> &str {
        &self.system
    }

    pub async fn reply(&self, messages: &[Message]) -> RelayResult<String> {
        ensure_conversation(messages)?;

        match timeout(self.time_limit, self.orchestrate(messages)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(limit = ?self.time_limit, "search relay timed out");
                Err(RelayError::Timeout(self.time_limit.as_millis() as u64))
            }
        }
    }

    async fn orchestrate(&self, messages: &[Message]) -> RelayResult<String> {
        let response = self.ask_model(messages).await?;

        let (turn, request) = match Decision::from_response(response) {
            Decision::Direct(response) => {
                debug!("model answered without searching");
                return reply_text(&response);
            }
            Decision::Search { turn, request } => (turn, request),
        };

        let query = request
            .tool_call
            .string_argument("query")
            .ok_or_else(|| {
                RelayError::ProviderFailure(format!(
                    "web_search request {} has no string query",
                    request.id
                ))
            })?;
        debug!(id = %request.id, query, "running web search");

        let results = self.search.search(SEARCH_INSTRUCTIONS, query).await?;

        // The assistant turn goes back verbatim so the tool_use id still matches
        let mut conversation = messages.to_vec();
        conversation.push(turn);
        conversation.push(Message::user().with_tool_response(request.id.as_str(), results));

        let response = self.ask_model(&conversation).await?;
        if let Some(again) = response.tool_requests().next() {
            return Err(RelayError::ToolLoopLimit(format!(
                "model requested '{}' again after a web search",
                again.tool_call.name
            )));
        }

        reply_text(&response)
    }

    async fn ask_model(&self, messages: &[Message]) -> RelayResult<Message> {
        let (response, usage) = self
            .provider
            .complete(
                &self.system,
                messages,
                std::slice::from_ref(&self.tool),
                self.sampling.temperature,
                self.sampling.max_tokens,
            )
            .await?;
        debug!(?usage, "search relay received model response");
        Ok(response)
    }
}
