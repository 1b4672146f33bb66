//! Sign-in gate for chat routes.
//!
//! Runs after `auth_middleware`: the caller must carry a valid token, have
//! a synced user record, and own an allowed verified email. On success the
//! `UserRecord` is put into the request extensions for [`CurrentUser`].

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::super::error::ApiError;
use crate::application::handlers::UserAccessHandler;
use crate::domain::foundation::{AuthError, AuthenticatedUser};
use crate::domain::user::UserRecord;

pub type AccessState = Arc<UserAccessHandler>;

pub async fn require_access(
    State(access): State<AccessState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(identity) = request.extensions().get::<AuthenticatedUser>().cloned() else {
        return ApiError::from(AuthError::MissingToken).into_response();
    };

    match access.require_user(&identity).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            tracing::info!(user_id = %identity.id, error = %e, "Access denied");
            ApiError::from(e).into_response()
        }
    }
}

/// The signed-in, allowed caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRecord);

impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            parts
                .extensions
                .get::<UserRecord>()
                .cloned()
                .map(CurrentUser)
                .ok_or_else(|| ApiError::from(AuthError::MissingToken))
        })
    }
}
