//! Database models
//!
//! Data structures representing database tables

use serde::{Deserialize, Serialize};

/// User record in the database
///
/// `token_epoch` is the credential-epoch. Session tokens embed the epoch
/// current at issue time; a token whose epoch differs from this value is
/// rejected, which is how a password change kills every outstanding
/// session without a server-side revocation list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub uuid: String,
    pub screen_name: String,
    pub display_name: String,
    pub email: String,
    pub password_hash: String,
    pub token_epoch: i64,
    pub created_at: String,
}

/// Organization record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub uuid: String,
    pub name: String,
    pub created_at: String,
}

/// Group record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub uuid: String,
    pub name: String,
    pub created_at: String,
}

/// Role record. The slug is the stable identifier the authorization
/// guard checks ("admin" grants elevated access).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub uuid: String,
    pub name: String,
    pub slug: String,
    pub created_at: String,
}

/// Profile fields an update may change. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub screen_name: Option<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.screen_name.is_none() && self.display_name.is_none() && self.email.is_none()
    }
}
