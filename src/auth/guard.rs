//! Authorization guard
//!
//! One rule, applied uniformly across profile updates, password updates,
//! and the admin panels: an identity may act on its own uuid, and an
//! identity holding the elevated role may act on any uuid.

use crate::auth::middleware::AuthUser;
use crate::core::error::{AtriumError, Result};

/// Role slug that grants cross-user access
pub const ELEVATED_ROLE: &str = "admin";

/// Whether the identity holds an elevated role
pub fn is_elevated(user: &AuthUser) -> bool {
    user.roles.iter().any(|slug| slug == ELEVATED_ROLE)
}

/// Whether the identity may act on the target uuid (self-or-admin)
pub fn can_access(user: &AuthUser, target_uuid: &str) -> bool {
    user.uuid == target_uuid || is_elevated(user)
}

/// Deny with Forbidden unless self-or-admin
pub fn ensure_can_access(user: &AuthUser, target_uuid: &str) -> Result<()> {
    if can_access(user, target_uuid) {
        return Ok(());
    }

    tracing::warn!(
        user_uuid = %user.uuid,
        target_uuid = %target_uuid,
        "Access denied"
    );
    Err(AtriumError::Forbidden(
        "Insufficient permissions".to_string(),
    ))
}

/// Deny with Forbidden unless the identity holds the elevated role
pub fn ensure_elevated(user: &AuthUser) -> Result<()> {
    if is_elevated(user) {
        return Ok(());
    }

    tracing::warn!(user_uuid = %user.uuid, "Elevated access denied");
    Err(AtriumError::Forbidden(
        "Insufficient permissions".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_roles(uuid: &str, roles: &[&str]) -> AuthUser {
        AuthUser {
            uuid: uuid.to_string(),
            screen_name: "au".to_string(),
            display_name: "App User".to_string(),
            email: "app@user.com".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            roles: roles.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_self_access_allowed() {
        let user = user_with_roles("u-1", &[]);
        assert!(can_access(&user, "u-1"));
        assert!(ensure_can_access(&user, "u-1").is_ok());
    }

    #[test]
    fn test_cross_access_denied_without_role() {
        let user = user_with_roles("u-1", &["member"]);
        assert!(!can_access(&user, "u-2"));
        assert!(matches!(
            ensure_can_access(&user, "u-2"),
            Err(AtriumError::Forbidden(_))
        ));
    }

    #[test]
    fn test_elevated_role_grants_cross_access() {
        let user = user_with_roles("u-1", &["member", "admin"]);
        assert!(is_elevated(&user));
        assert!(can_access(&user, "u-2"));
        assert!(ensure_elevated(&user).is_ok());
    }

    #[test]
    fn test_ensure_elevated_denies_plain_user() {
        let user = user_with_roles("u-1", &[]);
        assert!(matches!(
            ensure_elevated(&user),
            Err(AtriumError::Forbidden(_))
        ));
    }
}
