//! Scripted stand-ins for the provider and the search backend
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Mutex;

use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::providers::base::{Provider, SearchProvider, Usage};

/// Everything a relay handed to the provider on one call
#[derive(Debug, Clone)]
pub struct ProviderCall {
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Vec<Tool>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

/// A mock provider that returns pre-configured responses for testing
pub struct MockProvider {
    responses: Mutex<Vec<Result<Message, String>>>,
    calls: Mutex<Vec<ProviderCall>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<Message>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    /// Like `new`, but `Err` entries make that call fail with the given message
    pub fn with_results(responses: Vec<Result<Message, String>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
        temperature: Option<f32>,
        max_tokens: Option<i32>,
    ) -> Result<(Message, Usage)> {
        self.calls.lock().unwrap().push(ProviderCall {
            system: system.to_string(),
            messages: messages.to_vec(),
            tools: tools.to_vec(),
            temperature,
            max_tokens,
        });

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(anyhow!("MockProvider has no scripted response left"));
        }
        match responses.remove(0) {
            Ok(message) => Ok((message, Usage::default())),
            Err(err) => Err(anyhow!(err)),
        }
    }
}

/// A mock search backend that answers every query the same way
pub struct MockSearch {
    result: Result<String, String>,
    queries: Mutex<Vec<(String, String)>>,
}

impl MockSearch {
    pub fn answering<S: Into<String>>(text: S) -> Self {
        Self {
            result: Ok(text.into()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing<S: Into<String>>(err: S) -> Self {
        Self {
            result: Err(err.into()),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// The (system, query) pairs received so far
    pub fn queries(&self) -> Vec<(String, String)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(&self, system: &str, query: &str) -> Result<String> {
        self.queries
            .lock()
            .unwrap()
            .push((system.to_string(), query.to_string()));
        self.result.clone().map_err(|err| anyhow!(err))
    }
}
