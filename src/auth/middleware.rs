//! Session middleware
//!
//! Resolves an optional bearer token into an authenticated identity and
//! stores it in the request extensions. A request with no token continues
//! as anonymous; a request with an invalid token is rejected immediately
//! with 401. The epoch comparison against the live user row is what makes
//! a password change kill every outstanding session.

use crate::api::handlers::AppState;
use crate::auth::token::TokenPurpose;
use crate::core::error::{AtriumError, Result};
use crate::db::repository::Repository;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Authenticated identity attached to a request
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub uuid: String,
    pub screen_name: String,
    pub display_name: String,
    pub email: String,
    pub created_at: String,
    /// Role slugs, for the authorization guard
    pub roles: Vec<String>,
}

/// Session-loading middleware applied to the whole API router
pub async fn load_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer ").map(|t| t.to_string()));

    let token = match token {
        Some(t) => t,
        // Anonymous request; handlers decide whether that is acceptable
        None => return next.run(request).await,
    };

    let claims = match state.tokens.verify(&token, TokenPurpose::Session) {
        Ok(c) => c,
        Err(e) => return e.into_response(),
    };

    let user = match state.user_repo.find_by_id(&claims.sub).await {
        Ok(Some(u)) => u,
        // The embedded uuid no longer resolves; uniform rejection
        Ok(None) => return AtriumError::invalid_token().into_response(),
        Err(e) => return e.into_response(),
    };

    // Stateless revocation: a token minted before the last credential
    // change carries a stale epoch and dies here
    if user.token_epoch != claims.epoch {
        tracing::debug!(user_uuid = %user.uuid, "Rejected token with stale credential-epoch");
        return AtriumError::invalid_token().into_response();
    }

    let roles = match state.user_repo.roles_for_user(&user.uuid).await {
        Ok(roles) => roles.into_iter().map(|r| r.slug).collect(),
        Err(e) => return e.into_response(),
    };

    request.extensions_mut().insert(AuthUser {
        uuid: user.uuid,
        screen_name: user.screen_name,
        display_name: user.display_name,
        email: user.email,
        created_at: user.created_at,
        roles,
    });

    next.run(request).await
}

// Extraction in handlers. The rejection is 403, not 401: an anonymous
// request reaching a protected handler is a permission failure, while a
// *presented* bad token was already answered 401 by the middleware.
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AtriumError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AtriumError::Forbidden("Authentication required".to_string()))
    }
}
