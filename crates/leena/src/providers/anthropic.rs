use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;

use super::base::{Provider, Usage};
use super::configs::AnthropicProviderConfig;
use crate::models::message::{Message, MessageContent};
use crate::models::tool::{Tool, ToolCall};

pub const ANTHROPIC_HOST: &str = "https://api.anthropic.com";
pub const ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20240620";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

// The API rejects requests without max_tokens
const DEFAULT_MAX_TOKENS: i32 = 1000;

pub struct AnthropicProvider {
    client: Client,
    config: AnthropicProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self { client, config })
    }

    fn get_usage(data: &Value) -> Usage {
        let usage = match data.get("usage") {
            Some(usage) => usage,
            None => return Usage::default(),
        };

        let input_tokens = usage
            .get("input_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let output_tokens = usage
            .get("output_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let total_tokens = match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        };

        Usage::new(input_tokens, output_tokens, total_tokens)
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!("{}/v1/messages", self.config.host.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(anyhow!("Server error: {}", status))
            }
            status => {
                let error_text = response.text().await?;
                Err(anyhow!(
                    "Request failed: {} - {}",
                    status,
                    error_message(&error_text)
                ))
            }
        }
    }
}

/// Pull the human readable message out of an Anthropic error body, if it has one
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.to_string())
}

/// Convert internal Message format to Anthropic's API message specification
pub fn messages_to_anthropic_spec(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            let content: Vec<Value> = message
                .content
                .iter()
                .map(MessageContent::to_block)
                .collect();
            json!({
                "role": message.role.as_str(),
                "content": content,
            })
        })
        .collect()
}

/// Convert internal Tool format to Anthropic's API tool specification
pub fn tools_to_anthropic_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "name": tool.name,
            "description": tool.description,
            "input_schema": tool.input_schema,
        }));
    }

    Ok(result)
}

/// Convert Anthropic's API response to internal Message format
///
/// Block types we have no use for (e.g. thinking) are skipped.
pub fn anthropic_response_to_message(response: &Value) -> Result<Message> {
    let blocks = response
        .get("content")
        .and_then(|c| c.as_array())
        .ok_or_else(|| anyhow!("Invalid response format from Anthropic API: missing content"))?;

    let mut message = Message::assistant();
    for block in blocks {
        match block.get("type").and_then(|t| t.as_str()) {
            Some("text") => {
                let text = block
                    .get("text")
                    .and_then(|t| t.as_str())
                    .ok_or_else(|| anyhow!("Text block without text in Anthropic response"))?;
                message = message.with_text(text);
            }
            Some("tool_use") => {
                let id = block
                    .get("id")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| anyhow!("tool_use block without id in Anthropic response"))?;
                let name = block
                    .get("name")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| anyhow!("tool_use block without name in Anthropic response"))?;
                let input = block.get("input").cloned().unwrap_or_else(|| json!({}));
                message = message.with_tool_request(id, ToolCall::new(name, input));
            }
            other => {
                tracing::debug!("Skipping Anthropic content block of type {:?}", other);
            }
        }
    }

    Ok(message)
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
        temperature: Option<f32>,
        max_tokens: Option<i32>,
    ) -> Result<(Message, Usage)> {
        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_to_anthropic_spec(messages),
            "max_tokens": max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });

        if !system.is_empty() {
            payload["system"] = json!(system);
        }
        if !tools.is_empty() {
            payload["tools"] = json!(tools_to_anthropic_spec(tools)?);
        }
        if let Some(temp) = temperature {
            payload["temperature"] = json!(temp);
        }

        let response = self.post(payload).await?;

        if response.get("type").and_then(|t| t.as_str()) == Some("error") {
            return Err(anyhow!("Anthropic API error: {}", response["error"]));
        }

        let message = anthropic_response_to_message(&response)?;
        let usage = Self::get_usage(&response);

        Ok((message, usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> AnthropicProvider {
        let config = AnthropicProviderConfig {
            host: server.uri(),
            api_key: "test_api_key".to_string(),
            model: ANTHROPIC_MODEL.to_string(),
        };
        AnthropicProvider::new(config).unwrap()
    }

    async fn setup_mock_server(response_body: Value) -> (MockServer, AnthropicProvider) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test_api_key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server);
        (mock_server, provider)
    }

    #[tokio::test]
    async fn test_complete_basic() -> Result<()> {
        let response_body = json!({
            "id": "msg_123",
            "type": "message",
            "role": "assistant",
            "content": [{
                "type": "text",
                "text": "heyy 👋 what's on your mind?"
            }],
            "model": ANTHROPIC_MODEL,
            "stop_reason": "end_turn",
            "stop_sequence": null,
            "usage": {
                "input_tokens": 12,
                "output_tokens": 15
            }
        });

        let (_, provider) = setup_mock_server(response_body).await;

        let messages = vec![Message::user().with_text("hi")];

        let (message, usage) = provider
            .complete("You're Leena.", &messages, &[], Some(1.0), Some(1000))
            .await?;

        if let MessageContent::Text(text) = &message.content[0] {
            assert_eq!(text.text, "heyy 👋 what's on your mind?");
        } else {
            panic!("Expected Text content");
        }

        assert_eq!(usage.input_tokens, Some(12));
        assert_eq!(usage.output_tokens, Some(15));
        assert_eq!(usage.total_tokens, Some(27));

        Ok(())
    }

    #[tokio::test]
    async fn test_complete_sends_system_tools_and_sampling() -> Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(body_partial_json(json!({
                "model": ANTHROPIC_MODEL,
                "system": "You're Leena.",
                "max_tokens": 4000,
                "temperature": 1.0,
                "messages": [{"role": "user", "content": [{"type": "text", "text": "hi"}]}],
                "tools": [{"name": "web_search"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "ok"}]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server);
        let (message, usage) = provider
            .complete(
                "You're Leena.",
                &[Message::user().with_text("hi")],
                &[Tool::web_search()],
                Some(1.0),
                Some(4000),
            )
            .await?;

        assert_eq!(message.first_text(), Some("ok"));
        assert_eq!(usage, Usage::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_complete_tool_request() -> Result<()> {
        let response_body = json!({
            "id": "msg_456",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "let me find something for u"},
                {
                    "type": "tool_use",
                    "id": "toolu_01A",
                    "name": "web_search",
                    "input": {"query": "panic attack coping techniques"}
                }
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 40, "output_tokens": 20}
        });

        let (_, provider) = setup_mock_server(response_body).await;
        let (message, _) = provider
            .complete(
                "",
                &[Message::user().with_text("i keep having panic attacks")],
                &[Tool::web_search()],
                None,
                None,
            )
            .await?;

        assert_eq!(message.content.len(), 2);
        let request = message.tool_requests().next().unwrap();
        assert_eq!(request.id, "toolu_01A");
        assert_eq!(request.tool_call.name, "web_search");
        assert_eq!(
            request.tool_call.arguments,
            json!({"query": "panic attack coping techniques"})
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_complete_surfaces_api_errors() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "type": "error",
                "error": {"type": "invalid_request_error", "message": "messages: roles must alternate"}
            })))
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server);
        let err = provider
            .complete("", &[Message::user().with_text("hi")], &[], None, None)
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Request failed: 400 Bad Request - messages: roles must alternate"
        );
    }

    #[tokio::test]
    async fn test_complete_overloaded() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(529))
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server);
        let err = provider
            .complete("", &[Message::user().with_text("hi")], &[], None, None)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Server error: 529"));
    }

    #[test]
    fn test_messages_to_anthropic_spec() {
        let tool_call = ToolCall::new("web_search", json!({"query": "desi therapists"}));
        let messages = vec![
            Message::user().with_text("can u find me a therapist"),
            Message::assistant().with_tool_request("toolu_1", tool_call),
            Message::user().with_tool_response("toolu_1", "Here are some options"),
        ];

        let spec = messages_to_anthropic_spec(&messages);

        assert_eq!(spec.len(), 3);
        assert_eq!(
            spec[0],
            json!({"role": "user", "content": [{"type": "text", "text": "can u find me a therapist"}]})
        );
        assert_eq!(spec[1]["role"], "assistant");
        assert_eq!(spec[1]["content"][0]["type"], "tool_use");
        assert_eq!(spec[1]["content"][0]["input"]["query"], "desi therapists");
        assert_eq!(spec[2]["content"][0]["type"], "tool_result");
        assert_eq!(spec[2]["content"][0]["tool_use_id"], spec[1]["content"][0]["id"]);
    }

    #[test]
    fn test_tools_to_anthropic_spec_duplicate() {
        let result = tools_to_anthropic_spec(&[Tool::web_search(), Tool::web_search()]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Duplicate tool name"));
    }

    #[test]
    fn test_response_without_content_is_an_error() {
        let result = anthropic_response_to_message(&json!({"id": "msg_1"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_response_skips_unknown_blocks() -> Result<()> {
        let message = anthropic_response_to_message(&json!({
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "fr tho"}
            ]
        }))?;
        assert_eq!(message.content, vec![MessageContent::text("fr tho")]);
        Ok(())
    }
}
