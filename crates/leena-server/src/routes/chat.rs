use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use leena::models::message::{messages_from_wire, Message};
use leena::transcript::ChatReply;
use serde_json::Value;

/// Validate a relay request body into a conversation
///
/// Anything but a JSON object with a non-empty `messages` array of valid messages is a 400.
fn parse_conversation(body: Result<Json<Value>, JsonRejection>) -> Result<Vec<Message>, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        tracing::warn!("Rejected relay request body: {}", rejection);
        ApiError::bad_request()
    })?;

    messages_from_wire(body.get("messages")).map_err(|err| ApiError::from_relay(err, false))
}

// plain chat relay, no tools
async fn chat_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let messages = parse_conversation(body)?;
    tracing::info!(messages = messages.len(), "chat relay request");

    let response = state
        .chat
        .reply(&messages)
        .await
        .map_err(|err| ApiError::from_relay(err, false))?;

    Ok(Json(ChatReply { response }))
}

// relay with the web_search tool; failures echo the error string
async fn search_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let messages = parse_conversation(body)?;
    tracing::info!(messages = messages.len(), "search relay request");

    let response = state
        .search
        .reply(&messages)
        .await
        .map_err(|err| ApiError::from_relay(err, true))?;

    Ok(Json(ChatReply { response }))
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/claude",
            post(chat_handler).fallback(method_not_allowed),
        )
        .route(
            "/api/leena",
            post(search_handler).fallback(method_not_allowed),
        )
        .with_state(state)
}
