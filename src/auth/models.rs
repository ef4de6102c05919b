//! Request and response bodies for the auth endpoints
//!
//! Everything on the wire is camelCase. Each request type carries its own
//! `validate` so handlers stay thin; validation failures surface as 422
//! with a per-field detail map.

use crate::core::error::{AtriumError, Result};
use crate::db::models::User;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

fn check_email(email: &str) -> Option<&'static str> {
    if !EMAIL_RE.is_match(email) {
        Some("Must be a valid email address")
    } else {
        None
    }
}

// Passwords are only required to be present; no length or complexity
// policy is enforced server-side.
fn check_password(password: &str) -> Option<&'static str> {
    if password.is_empty() {
        Some("Must not be empty")
    } else {
        None
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub screen_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<()> {
        let mut fields = serde_json::Map::new();
        if self.screen_name.trim().is_empty() {
            fields.insert("screenName".to_string(), json!("Must not be empty"));
        }
        if let Some(msg) = check_email(&self.email) {
            fields.insert("email".to_string(), json!(msg));
        }
        if let Some(msg) = check_password(&self.password) {
            fields.insert("password".to_string(), json!(msg));
        }
        if fields.is_empty() {
            Ok(())
        } else {
            Err(AtriumError::validation_fields(
                "Invalid registration data",
                json!(fields),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(AtriumError::validation("Email and password are required"));
        }
        Ok(())
    }
}

/// Profile update. `uuid` is the target when an admin edits another
/// account; absent, the caller edits themselves.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub screen_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<()> {
        let mut fields = serde_json::Map::new();
        if let Some(name) = &self.screen_name {
            if name.trim().is_empty() {
                fields.insert("screenName".to_string(), json!("Must not be empty"));
            }
        }
        if let Some(email) = &self.email {
            if let Some(msg) = check_email(email) {
                fields.insert("email".to_string(), json!(msg));
            }
        }
        if fields.is_empty() {
            Ok(())
        } else {
            Err(AtriumError::validation_fields(
                "Invalid profile data",
                json!(fields),
            ))
        }
    }
}

/// Password change. `password` is the caller's current password and is
/// required even for admins acting on another account.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    #[serde(default)]
    pub uuid: Option<String>,
    pub password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

impl UpdatePasswordRequest {
    pub fn validate(&self) -> Result<()> {
        if self.new_password != self.new_password_confirm {
            return Err(AtriumError::validation_fields(
                "Passwords do not match",
                json!({ "newPasswordConfirm": "Must match newPassword" }),
            ));
        }
        if let Some(msg) = check_password(&self.new_password) {
            return Err(AtriumError::validation_fields(
                "Invalid password",
                json!({ "newPassword": msg }),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
}

impl ResetPasswordRequest {
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() {
            return Err(AtriumError::validation("Email is required"));
        }
        Ok(())
    }
}

/// Completes a reset: the token came out of the emailed link.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPasswordRequest {
    pub token: String,
    pub password: String,
    pub password_confirm: String,
}

impl SetPasswordRequest {
    pub fn validate(&self) -> Result<()> {
        if self.password != self.password_confirm {
            return Err(AtriumError::validation_fields(
                "Passwords do not match",
                json!({ "passwordConfirm": "Must match password" }),
            ));
        }
        if let Some(msg) = check_password(&self.password) {
            return Err(AtriumError::validation_fields(
                "Invalid password",
                json!({ "password": msg }),
            ));
        }
        Ok(())
    }
}

/// Public view of a user; the hash and epoch never leave the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub uuid: String,
    pub screen_name: String,
    pub display_name: String,
    pub email: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            uuid: user.uuid.clone(),
            screen_name: user.screen_name.clone(),
            display_name: user.display_name.clone(),
            email: user.email.clone(),
            created_at: user.created_at.clone(),
            roles: None,
        }
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = Some(roles);
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserResponse,
    pub jwt: String,
}

/// Body of `GET /api/user/me`; always 200, anonymous callers get
/// `loggedIn: false`, authenticated callers get their profile fields
/// spread alongside the flag.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub logged_in: bool,
    #[serde(flatten)]
    pub user: Option<UserResponse>,
}

/// `{ "user": {...} }` wrapper used by the update endpoints
#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub success: bool,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(screen_name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            screen_name: screen_name.to_string(),
            display_name: None,
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_register_valid() {
        assert!(register("ada", "ada@example.com", "correct horse").validate().is_ok());
    }

    #[test]
    fn test_register_accepts_short_password() {
        // No server-side length policy; "4321" is a valid password
        assert!(register("au", "app@user.com", "4321").validate().is_ok());
    }

    #[test]
    fn test_register_rejects_bad_email_and_empty_password() {
        let err = register("ada", "not-an-email", "").validate().unwrap_err();
        match err {
            AtriumError::Validation { fields: Some(fields), .. } => {
                assert!(fields.get("email").is_some());
                assert!(fields.get("password").is_some());
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_register_rejects_blank_screen_name() {
        let err = register("   ", "ada@example.com", "correct horse")
            .validate()
            .unwrap_err();
        match err {
            AtriumError::Validation { fields: Some(fields), .. } => {
                assert!(fields.get("screenName").is_some());
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_update_profile_partial_is_valid() {
        let req = UpdateProfileRequest {
            uuid: None,
            screen_name: None,
            display_name: Some("Ada L.".to_string()),
            email: None,
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_update_profile_rejects_bad_email() {
        let req = UpdateProfileRequest {
            uuid: None,
            screen_name: None,
            display_name: None,
            email: Some("nope".to_string()),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_update_password_rejects_mismatched_confirm() {
        let req = UpdatePasswordRequest {
            uuid: None,
            password: "old password".to_string(),
            new_password: "new password".to_string(),
            new_password_confirm: "different".to_string(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_me_response_spreads_user_fields() {
        let anon = serde_json::to_value(MeResponse { logged_in: false, user: None }).unwrap();
        assert_eq!(anon, serde_json::json!({ "loggedIn": false }));

        let user = User {
            uuid: "u-1".to_string(),
            screen_name: "ada".to_string(),
            display_name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "hash".to_string(),
            token_epoch: 0,
            created_at: "2024-01-01T00:00:00Z".to_string(),
        };
        let me = serde_json::to_value(MeResponse {
            logged_in: true,
            user: Some(UserResponse::from_user(&user)),
        })
        .unwrap();
        assert_eq!(me["loggedIn"], true);
        assert_eq!(me["screenName"], "ada");
        assert!(me.get("user").is_none());
    }

    #[test]
    fn test_user_response_hides_password_hash() {
        let user = User {
            uuid: "u-1".to_string(),
            screen_name: "ada".to_string(),
            display_name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$2b$12$secret".to_string(),
            token_epoch: 3,
            created_at: "2024-01-01T00:00:00Z".to_string(),
        };
        let body = serde_json::to_string(&UserResponse::from_user(&user)).unwrap();
        assert!(!body.contains("secret"));
        assert!(!body.contains("epoch"));
        assert!(body.contains("screenName"));
    }
}
