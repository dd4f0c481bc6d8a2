use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use leena::errors::RelayError;
use serde_json::json;
use thiserror::Error;

const ENV_PREFIX: &str = "LEENA";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Map a config key path like `anthropic.api_key` to the variable that sets it
pub fn to_env_var(field_path: &str) -> String {
    format!(
        "{}_{}",
        ENV_PREFIX,
        field_path.replace('.', "__").to_uppercase()
    )
}

/// Error body returned by the relay endpoints
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
    detail: Option<String>,
}

impl ApiError {
    pub fn bad_request() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: "Invalid request body",
            detail: None,
        }
    }

    pub fn method_not_allowed() -> Self {
        Self {
            status: StatusCode::METHOD_NOT_ALLOWED,
            message: "Method not allowed",
            detail: None,
        }
    }

    pub fn internal(detail: Option<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Internal server error",
            detail,
        }
    }

    /// Convert a relay failure; `expose_detail` echoes the error string to the caller
    pub fn from_relay(err: RelayError, expose_detail: bool) -> Self {
        if err.is_client_error() {
            tracing::warn!("Rejected relay request: {}", err);
            return Self::bad_request();
        }
        tracing::error!("Relay failed: {}", err);
        Self::internal(expose_detail.then(|| err.to_string()))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({ "message": self.message });
        if let Some(detail) = self.detail {
            body["error"] = json!(detail);
        }
        (self.status, Json(body)).into_response()
    }
}
