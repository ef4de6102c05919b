//! Admin panel handlers
//!
//! User administration: listing, detail with association arrays, profile
//! edits, and org/group/role assignment. Every route requires the
//! elevated role; there is no self-service path through here.

use crate::api::extract::ValidJson;
use crate::api::handlers::AppState;
use crate::auth::guard;
use crate::auth::middleware::AuthUser;
use crate::auth::models::{UpdateProfileRequest, UserEnvelope, UserResponse};
use crate::core::error::{AtriumError, Result};
use crate::db::models::{Group, Organization, Role, User};
use crate::db::repository::Repository;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

/// `{ "data": [...] }` wrapper for the flat list endpoints
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
}

/// Full admin view of one account
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetailResponse {
    pub user: UserResponse,
    pub organizations: Vec<Organization>,
    pub groups: Vec<Group>,
    pub roles: Vec<Role>,
}

/// Body for the association endpoints: the uuid of the organization,
/// group, or role being linked or unlinked.
#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    pub uuid: String,
}

async fn load_user(state: &AppState, uuid: &str) -> Result<User> {
    state
        .user_repo
        .find_by_id(uuid)
        .await?
        .ok_or_else(|| AtriumError::NotFound("User not found".to_string()))
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<ListResponse<UserResponse>>> {
    guard::ensure_elevated(&caller)?;
    let users = state.user_repo.find_all().await?;
    Ok(Json(ListResponse {
        data: users.iter().map(UserResponse::from_user).collect(),
    }))
}

/// GET /api/admin/users/:uuid
pub async fn user_detail(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(uuid): Path<String>,
) -> Result<Json<UserDetailResponse>> {
    guard::ensure_elevated(&caller)?;
    let user = load_user(&state, &uuid).await?;
    let organizations = state.user_repo.organizations_for_user(&uuid).await?;
    let groups = state.user_repo.groups_for_user(&uuid).await?;
    let roles = state.user_repo.roles_for_user(&uuid).await?;
    Ok(Json(UserDetailResponse {
        user: UserResponse::from_user(&user),
        organizations,
        groups,
        roles,
    }))
}

/// POST /api/admin/users/:uuid. Profile edit; the target comes from the
/// path, any uuid in the body is ignored.
pub async fn update_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(uuid): Path<String>,
    ValidJson(req): ValidJson<UpdateProfileRequest>,
) -> Result<Json<UserEnvelope>> {
    guard::ensure_elevated(&caller)?;
    req.validate()?;

    let changes = crate::db::models::ProfileChanges {
        screen_name: req.screen_name.map(|n| n.trim().to_string()),
        display_name: req.display_name,
        email: req.email,
    };
    if !changes.is_empty() {
        state.user_repo.update_profile(&uuid, changes).await?;
        tracing::info!(user_uuid = %uuid, actor = %caller.uuid, "Admin updated profile");
    }

    let user = load_user(&state, &uuid).await?;
    Ok(Json(UserEnvelope {
        user: UserResponse::from_user(&user),
    }))
}

// Association management. Each endpoint checks both ends exist before
// touching the link table and answers with the refreshed detail so the
// admin UI can re-render without a second request.

async fn detail(state: &AppState, uuid: &str) -> Result<Json<UserDetailResponse>> {
    let user = load_user(state, uuid).await?;
    Ok(Json(UserDetailResponse {
        user: UserResponse::from_user(&user),
        organizations: state.user_repo.organizations_for_user(uuid).await?,
        groups: state.user_repo.groups_for_user(uuid).await?,
        roles: state.user_repo.roles_for_user(uuid).await?,
    }))
}

/// POST /api/admin/users/:uuid/add/organization
pub async fn add_organization(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(uuid): Path<String>,
    ValidJson(req): ValidJson<LinkRequest>,
) -> Result<Json<UserDetailResponse>> {
    guard::ensure_elevated(&caller)?;
    load_user(&state, &uuid).await?;
    if state.organization_repo.find_by_id(&req.uuid).await?.is_none() {
        return Err(AtriumError::NotFound("Organization not found".to_string()));
    }
    state.user_repo.add_organization(&uuid, &req.uuid).await?;
    tracing::info!(user_uuid = %uuid, organization = %req.uuid, actor = %caller.uuid, "Added organization");
    detail(&state, &uuid).await
}

/// POST /api/admin/users/:uuid/remove/organization
pub async fn remove_organization(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(uuid): Path<String>,
    ValidJson(req): ValidJson<LinkRequest>,
) -> Result<Json<UserDetailResponse>> {
    guard::ensure_elevated(&caller)?;
    load_user(&state, &uuid).await?;
    state.user_repo.remove_organization(&uuid, &req.uuid).await?;
    tracing::info!(user_uuid = %uuid, organization = %req.uuid, actor = %caller.uuid, "Removed organization");
    detail(&state, &uuid).await
}

/// POST /api/admin/users/:uuid/add/group
pub async fn add_group(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(uuid): Path<String>,
    ValidJson(req): ValidJson<LinkRequest>,
) -> Result<Json<UserDetailResponse>> {
    guard::ensure_elevated(&caller)?;
    load_user(&state, &uuid).await?;
    if state.group_repo.find_by_id(&req.uuid).await?.is_none() {
        return Err(AtriumError::NotFound("Group not found".to_string()));
    }
    state.user_repo.add_group(&uuid, &req.uuid).await?;
    tracing::info!(user_uuid = %uuid, group = %req.uuid, actor = %caller.uuid, "Added group");
    detail(&state, &uuid).await
}

/// POST /api/admin/users/:uuid/remove/group
pub async fn remove_group(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(uuid): Path<String>,
    ValidJson(req): ValidJson<LinkRequest>,
) -> Result<Json<UserDetailResponse>> {
    guard::ensure_elevated(&caller)?;
    load_user(&state, &uuid).await?;
    state.user_repo.remove_group(&uuid, &req.uuid).await?;
    tracing::info!(user_uuid = %uuid, group = %req.uuid, actor = %caller.uuid, "Removed group");
    detail(&state, &uuid).await
}

/// POST /api/admin/users/:uuid/add/role
pub async fn add_role(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(uuid): Path<String>,
    ValidJson(req): ValidJson<LinkRequest>,
) -> Result<Json<UserDetailResponse>> {
    guard::ensure_elevated(&caller)?;
    load_user(&state, &uuid).await?;
    if state.role_repo.find_by_id(&req.uuid).await?.is_none() {
        return Err(AtriumError::NotFound("Role not found".to_string()));
    }
    state.user_repo.add_role(&uuid, &req.uuid).await?;
    tracing::info!(user_uuid = %uuid, role = %req.uuid, actor = %caller.uuid, "Added role");
    detail(&state, &uuid).await
}

/// POST /api/admin/users/:uuid/remove/role
pub async fn remove_role(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(uuid): Path<String>,
    ValidJson(req): ValidJson<LinkRequest>,
) -> Result<Json<UserDetailResponse>> {
    guard::ensure_elevated(&caller)?;
    load_user(&state, &uuid).await?;
    state.user_repo.remove_role(&uuid, &req.uuid).await?;
    tracing::info!(user_uuid = %uuid, role = %req.uuid, actor = %caller.uuid, "Removed role");
    detail(&state, &uuid).await
}

/// GET /api/admin/organizations
pub async fn list_organizations(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<ListResponse<Organization>>> {
    guard::ensure_elevated(&caller)?;
    let data = state.organization_repo.find_all().await?;
    Ok(Json(ListResponse { data }))
}

/// GET /api/admin/groups
pub async fn list_groups(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<ListResponse<Group>>> {
    guard::ensure_elevated(&caller)?;
    let data = state.group_repo.find_all().await?;
    Ok(Json(ListResponse { data }))
}

/// GET /api/admin/roles
pub async fn list_roles(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<ListResponse<Role>>> {
    guard::ensure_elevated(&caller)?;
    let data = state.role_repo.find_all().await?;
    Ok(Json(ListResponse { data }))
}
