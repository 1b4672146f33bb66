//! POST /clerk-users-webhook - keeps the user table in sync with Clerk.
//!
//! Unauthenticated; the Svix signature is the only gate. Any verification
//! or payload problem is a bare 400 so senders learn nothing about why.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use super::error::ApiError;
use super::state::AppState;
use crate::adapters::clerk::{ClerkWebhookEvent, SvixHeaders, WebhookError};

pub async fn clerk_users_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let command = match verify_and_parse(&state, &headers, &body) {
        Ok(command) => command,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected Clerk webhook");
            return (StatusCode::BAD_REQUEST, "Error occured").into_response();
        }
    };

    let Some(command) = command else {
        return StatusCode::OK.into_response();
    };

    match state.sync_user_handler().handle(command).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

fn verify_and_parse(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Option<crate::application::handlers::SyncUserCommand>, WebhookError> {
    let svix = SvixHeaders::from_headers(headers)?;
    state.webhook.verify(&svix, body)?;
    ClerkWebhookEvent::parse(body)?.into_command()
}
