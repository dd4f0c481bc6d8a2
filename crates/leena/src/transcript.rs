//! The chat UI's view of a conversation
//!
//! Every request carries the whole history. A turn only lands in the transcript once the relay
//! has answered, so each request is the previous one plus one user and one assistant message.
use serde::Serialize;
use serde_json::{json, Value};

use crate::models::message::Message;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    messages: Vec<Message>,
}

/// A user message waiting on its reply
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTurn {
    user: Message,
    request: Vec<Message>,
}

impl PendingTurn {
    /// The conversation to post: the history followed by the new user message
    pub fn request(&self) -> &[Message] {
        &self.request
    }

    /// JSON body for the relay endpoints
    pub fn request_body(&self) -> Value {
        let messages: Vec<Value> = self.request.iter().map(Message::to_wire).collect();
        json!({ "messages": messages })
    }
}

/// Body of a successful relay response
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
pub struct ChatReply {
    pub response: String,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Start a turn from typed input; blank input sends nothing
    pub fn prepare(&self, input: &str) -> Option<PendingTurn> {
        if input.trim().is_empty() {
            return None;
        }
        let user = Message::user().with_text(input);
        let mut request = self.messages.clone();
        request.push(user.clone());
        Some(PendingTurn { user, request })
    }

    /// Record a turn the relay answered
    ///
    /// A turn that failed is never committed; dropping it leaves the transcript unchanged.
    pub fn commit(&mut self, turn: PendingTurn, reply: ChatReply) {
        self.messages.push(turn.user);
        self.messages.push(Message::assistant().with_text(reply.response));
    }
}
