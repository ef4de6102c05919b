//! API routes

use crate::api::handlers::admin::{
    add_group, add_organization, add_role, list_groups, list_organizations, list_roles,
    list_users, remove_group, remove_organization, remove_role, update_user, user_detail,
};
use crate::api::handlers::AppState;
use crate::auth::handlers::{
    login, me, register, request_password_reset, set_password, update_password, update_profile,
};
use crate::auth::middleware::load_session;
use axum::{
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};

/// Build the API router. The session middleware wraps everything: it
/// lets anonymous requests through untouched and rejects only presented
/// tokens that fail verification, so public endpoints can share it.
pub fn build_api_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/user", post(register))
        .route("/api/user/login", post(login))
        .route("/api/user/me", get(me))
        .route("/api/user/me/update", post(update_profile))
        .route("/api/user/me/update-password", post(update_password))
        .route("/api/user/reset-password", post(request_password_reset))
        .route("/api/user/set-password", post(set_password))
        // Admin panel
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/:uuid", get(user_detail).post(update_user))
        .route("/api/admin/users/:uuid/add/organization", post(add_organization))
        .route("/api/admin/users/:uuid/remove/organization", post(remove_organization))
        .route("/api/admin/users/:uuid/add/group", post(add_group))
        .route("/api/admin/users/:uuid/remove/group", post(remove_group))
        .route("/api/admin/users/:uuid/add/role", post(add_role))
        .route("/api/admin/users/:uuid/remove/role", post(remove_role))
        .route("/api/health", get(health_check))
        .route("/api/admin/organizations", get(list_organizations))
        .route("/api/admin/groups", get(list_groups))
        .route("/api/admin/roles", get(list_roles))
        .layer(middleware::from_fn_with_state(state.clone(), load_session))
        .with_state(state)
}

/// Health check endpoint handler
async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().timestamp(),
    }))
}
