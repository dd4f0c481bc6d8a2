//! These models represent the objects passed around by the relays
//!
//! There are a few related formats we need to interact with:
//! - browser chat messages, sent from the interface to the relay
//! - anthropic messages/tools, sent from the relay to the LLM
//! - openai-compatible chat completions, sent from the relay to the search provider
//!
//! We always immediately convert those data models into the internal structs using
//! to/from helpers, so the internal models are not an exact match to any of these formats.
pub mod content;
pub mod message;
pub mod role;
pub mod tool;
