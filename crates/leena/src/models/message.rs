use super::content::TextContent;
use super::role::Role;
use super::tool::ToolCall;
use crate::errors::{RelayError, RelayResult};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolRequest {
    pub id: String,
    pub tool_call: ToolCall,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolResponse {
    pub id: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
/// Content passed inside a message, which can be both simple content and tool content
pub enum MessageContent {
    Text(TextContent),
    ToolRequest(ToolRequest),
    ToolResponse(ToolResponse),
}

impl MessageContent {
    pub fn text<S: Into<String>>(text: S) -> Self {
        MessageContent::Text(TextContent::new(text))
    }

    pub fn tool_request<S: Into<String>>(id: S, tool_call: ToolCall) -> Self {
        MessageContent::ToolRequest(ToolRequest {
            id: id.into(),
            tool_call,
        })
    }

    pub fn tool_response<S: Into<String>, T: Into<String>>(id: S, content: T) -> Self {
        MessageContent::ToolResponse(ToolResponse {
            id: id.into(),
            content: content.into(),
        })
    }

    pub fn as_tool_request(&self) -> Option<&ToolRequest> {
        if let MessageContent::ToolRequest(ref tool_request) = self {
            Some(tool_request)
        } else {
            None
        }
    }

    /// Get the text content if this is a TextContent variant
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(&text.text),
            _ => None,
        }
    }

    /// Convert to a typed content block, the shape shared by the browser and the provider
    pub fn to_block(&self) -> Value {
        match self {
            MessageContent::Text(text) => json!({
                "type": "text",
                "text": text.text,
            }),
            MessageContent::ToolRequest(request) => json!({
                "type": "tool_use",
                "id": request.id,
                "name": request.tool_call.name,
                "input": request.tool_call.arguments,
            }),
            MessageContent::ToolResponse(response) => json!({
                "type": "tool_result",
                "tool_use_id": response.id,
                "content": response.content,
            }),
        }
    }

    /// Parse a typed content block
    pub fn from_block(block: &Value) -> RelayResult<Self> {
        let block_type = block
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("content block is missing a string 'type'"))?;

        match block_type {
            "text" => {
                let text = required_str(block, "text")?;
                Ok(MessageContent::text(text))
            }
            "tool_use" => {
                let id = required_str(block, "id")?;
                let name = required_str(block, "name")?;
                let input = block.get("input").cloned().unwrap_or_else(|| json!({}));
                Ok(MessageContent::tool_request(id, ToolCall::new(name, input)))
            }
            "tool_result" => {
                let id = required_str(block, "tool_use_id")?;
                let content = match block.get("content") {
                    Some(Value::String(text)) => text.clone(),
                    // Structured results are a list of text blocks
                    Some(Value::Array(parts)) => parts
                        .iter()
                        .filter_map(|part| part.get("text").and_then(Value::as_str))
                        .collect::<Vec<_>>()
                        .join("\n"),
                    None | Some(Value::Null) => String::new(),
                    Some(_) => return Err(invalid("tool_result content must be text")),
                };
                Ok(MessageContent::tool_response(id, content))
            }
            other => Err(invalid(format!("unsupported content block type '{}'", other))),
        }
    }
}

fn invalid<S: Into<String>>(reason: S) -> RelayError {
    RelayError::InvalidRequest(reason.into())
}

fn required_str<'a>(value: &'a Value, key: &str) -> RelayResult<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(format!("missing string field '{}'", key)))
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
/// A message to or from an LLM
pub struct Message {
    pub role: Role,
    pub content: Vec<MessageContent>,
}

impl Message {
    /// Create a new, empty user message
    pub fn user() -> Self {
        Message {
            role: Role::User,
            content: Vec::new(),
        }
    }

    /// Create a new, empty assistant message
    pub fn assistant() -> Self {
        Message {
            role: Role::Assistant,
            content: Vec::new(),
        }
    }

    /// Add any MessageContent to the message
    pub fn with_content(mut self, content: MessageContent) -> Self {
        self.content.push(content);
        self
    }

    /// Add text content to the message
    pub fn with_text<S: Into<String>>(self, text: S) -> Self {
        self.with_content(MessageContent::text(text))
    }

    /// Add a tool request to the message
    pub fn with_tool_request<S: Into<String>>(self, id: S, tool_call: ToolCall) -> Self {
        self.with_content(MessageContent::tool_request(id, tool_call))
    }

    /// Add a tool response to the message
    pub fn with_tool_response<S: Into<String>, T: Into<String>>(self, id: S, content: T) -> Self {
        self.with_content(MessageContent::tool_response(id, content))
    }

    /// The first text segment, if the message has one
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(MessageContent::as_text)
    }

    /// All tool requests in the message, in order
    pub fn tool_requests(&self) -> impl Iterator<Item = &ToolRequest> {
        self.content.iter().filter_map(MessageContent::as_tool_request)
    }

    /// Convert a browser message `{role, content}` into a Message
    ///
    /// `content` is either plain text or an array of typed content blocks.
    pub fn from_wire(value: &Value) -> RelayResult<Self> {
        let role = required_str(value, "role")?
            .parse::<Role>()
            .map_err(invalid)?;

        let content = match value.get("content") {
            Some(Value::String(text)) => {
                let text = TextContent::new(text.as_str());
                if text.is_blank() {
                    return Err(invalid("message content is empty"));
                }
                vec![MessageContent::Text(text)]
            }
            Some(Value::Array(blocks)) => {
                if blocks.is_empty() {
                    return Err(invalid("message content is empty"));
                }
                blocks
                    .iter()
                    .map(MessageContent::from_block)
                    .collect::<RelayResult<Vec<_>>>()?
            }
            _ => return Err(invalid("message content must be a string or an array")),
        };

        Ok(Message { role, content })
    }

    /// Convert into the browser message shape
    ///
    /// A message holding a single text segment is sent as plain text, anything else as blocks.
    pub fn to_wire(&self) -> Value {
        let content = match self.content.as_slice() {
            [MessageContent::Text(text)] => json!(text.text),
            blocks => Value::Array(blocks.iter().map(MessageContent::to_block).collect()),
        };
        json!({
            "role": self.role.as_str(),
            "content": content,
        })
    }
}

/// Validate and convert the `messages` field of a relay request
pub fn messages_from_wire(messages: Option<&Value>) -> RelayResult<Vec<Message>> {
    let array = messages
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("messages must be an array"))?;

    if array.is_empty() {
        return Err(invalid("messages must not be empty"));
    }

    array
        .iter()
        .enumerate()
        .map(|(index, value)| {
            Message::from_wire(value).map_err(|err| match err {
                RelayError::InvalidRequest(reason) => {
                    invalid(format!("message {}: {}", index, reason))
                }
                other => other,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_wire_plain_text() {
        let message = Message::from_wire(&json!({"role": "user", "content": "hey leena"})).unwrap();
        assert_eq!(message, Message::user().with_text("hey leena"));
    }

    #[test]
    fn test_from_wire_structured_blocks() {
        let value = json!({
            "role": "assistant",
            "content": [
                {"type": "text", "text": "let me look that up"},
                {"type": "tool_use", "id": "toolu_01", "name": "web_search", "input": {"query": "therapists nyc"}}
            ]
        });
        let message = Message::from_wire(&value).unwrap();

        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.first_text(), Some("let me look that up"));
        let request = message.tool_requests().next().unwrap();
        assert_eq!(request.id, "toolu_01");
        assert_eq!(request.tool_call.string_argument("query"), Some("therapists nyc"));
    }

    #[test]
    fn test_from_wire_tool_result_with_text_parts() {
        let value = json!({
            "role": "user",
            "content": [{
                "type": "tool_result",
                "tool_use_id": "toolu_01",
                "content": [{"type": "text", "text": "a"}, {"type": "text", "text": "b"}]
            }]
        });
        let message = Message::from_wire(&value).unwrap();
        assert_eq!(
            message.content[0],
            MessageContent::tool_response("toolu_01", "a\nb")
        );
    }

    #[test]
    fn test_from_wire_rejects_bad_messages() {
        let cases = [
            json!({"role": "system", "content": "hi"}),
            json!({"content": "hi"}),
            json!({"role": "user"}),
            json!({"role": "user", "content": 42}),
            json!({"role": "user", "content": "   "}),
            json!({"role": "user", "content": []}),
            json!({"role": "user", "content": [{"type": "image", "source": {}}]}),
            json!({"role": "user", "content": [{"type": "text"}]}),
        ];
        for case in cases {
            let result = Message::from_wire(&case);
            assert!(
                matches!(result, Err(RelayError::InvalidRequest(_))),
                "expected invalid request for {}",
                case
            );
        }
    }

    #[test]
    fn test_messages_from_wire() {
        let payload = json!([
            {"role": "user", "content": "hi"},
            {"role": "assistant", "content": "hiii 👋"},
            {"role": "user", "content": "my parents keep asking about marriage"}
        ]);
        let messages = messages_from_wire(Some(&payload)).unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::Assistant);
    }

    #[test]
    fn test_messages_from_wire_rejects_non_sequences() {
        for payload in [None, Some(json!("hi")), Some(json!({"role": "user"})), Some(json!([]))] {
            let result = messages_from_wire(payload.as_ref());
            assert!(matches!(result, Err(RelayError::InvalidRequest(_))));
        }
    }

    #[test]
    fn test_messages_from_wire_names_bad_index() {
        let payload = json!([{"role": "user", "content": "hi"}, {"role": "bot", "content": "x"}]);
        let err = messages_from_wire(Some(&payload)).unwrap_err();
        assert_eq!(
            err,
            RelayError::InvalidRequest("message 1: unsupported role 'bot'".to_string())
        );
    }

    #[test]
    fn test_to_wire_shapes() {
        let plain = Message::assistant().with_text("no worries");
        assert_eq!(
            plain.to_wire(),
            json!({"role": "assistant", "content": "no worries"})
        );

        let tool_turn = Message::user().with_tool_response("toolu_9", "results");
        assert_eq!(
            tool_turn.to_wire(),
            json!({
                "role": "user",
                "content": [{"type": "tool_result", "tool_use_id": "toolu_9", "content": "results"}]
            })
        );
        assert_eq!(Message::from_wire(&tool_turn.to_wire()).unwrap(), tool_turn);
    }
}
