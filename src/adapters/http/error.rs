//! API error type shared by every HTTP handler.
//!
//! Application errors convert into [`ApiError`], which renders the
//! standard `{code, message}` body with a matching status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::application::handlers::{AccessError, ConversationError};
use crate::domain::foundation::AuthError;
use crate::ports::StoreError;

/// Standard error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthenticated(String),
    Forbidden(String),
    NotFound(&'static str, String),
    /// The target is in a state that does not allow the change.
    Conflict(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_, _) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::BadRequest(msg) => ErrorResponse::new("BAD_REQUEST", msg),
            ApiError::Unauthenticated(msg) => ErrorResponse::new("UNAUTHENTICATED", msg),
            ApiError::Forbidden(msg) => ErrorResponse::new("FORBIDDEN", msg),
            ApiError::NotFound(resource, id) => {
                ErrorResponse::new("NOT_FOUND", format!("{} not found: {}", resource, id))
            }
            ApiError::Conflict(msg) => ErrorResponse::new("INVALID_STATE", msg),
            ApiError::ServiceUnavailable(msg) => {
                tracing::error!("Service unavailable: {}", msg);
                ErrorResponse::new("SERVICE_UNAVAILABLE", "Service temporarily unavailable")
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ErrorResponse::new("INTERNAL_ERROR", "An internal error occurred")
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => ApiError::NotFound(entity, id),
            StoreError::Lifecycle(e) => ApiError::Conflict(e.to_string()),
            StoreError::Invalid(_) | StoreError::Database(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<ConversationError> for ApiError {
    fn from(err: ConversationError) -> Self {
        match err {
            ConversationError::NotFound(id) => ApiError::NotFound("Conversation", id.to_string()),
            ConversationError::MessageNotFound(id) => ApiError::NotFound("Message", id.to_string()),
            ConversationError::UserNotFound(id) => ApiError::NotFound("User", id.to_string()),
            ConversationError::Forbidden => ApiError::Forbidden("Not authorized".to_string()),
            ConversationError::Validation(msg) => ApiError::BadRequest(msg),
            ConversationError::Store(e) => e.into(),
            ConversationError::Scheduler(e) => ApiError::ServiceUnavailable(e.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::TokenExpired => {
                ApiError::Unauthenticated(err.to_string())
            }
            AuthError::UserNotFound | AuthError::DisallowedEmail => {
                ApiError::Forbidden(err.to_string())
            }
            AuthError::ServiceUnavailable(msg) => ApiError::ServiceUnavailable(msg),
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Auth(e) => e.into(),
            AccessError::Store(e) => e.into(),
        }
    }
}
