//! HTTP handlers

pub mod admin;

use crate::auth::token::TokenService;
use crate::core::config::Config;
use crate::db::repository::{
    GroupRepository, OrganizationRepository, RoleRepository, UserRepository,
};
use crate::email::Mailer;
use std::sync::Arc;

/// Shared state handed to every handler and the session middleware
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub user_repo: UserRepository,
    pub organization_repo: OrganizationRepository,
    pub group_repo: GroupRepository,
    pub role_repo: RoleRepository,
    pub tokens: TokenService,
    pub mailer: Mailer,
}

impl AppState {
    pub fn new(config: Arc<Config>, db: Arc<crate::db::DatabaseManager>) -> Self {
        let tokens = TokenService::new(config.security.jwt_secret.clone());
        let mailer = Mailer::new(config.email.clone());
        Self {
            user_repo: UserRepository::new(db.clone()),
            organization_repo: OrganizationRepository::new(db.clone()),
            group_repo: GroupRepository::new(db.clone()),
            role_repo: RoleRepository::new(db),
            tokens,
            mailer,
            config,
        }
    }
}
