//! Repository pattern implementation for data access layer
//!
//! This module provides the Repository pattern for abstracting database
//! operations. UserRepository is the credential store adapter: it owns
//! every read and write of the user row, including the atomic
//! password-hash-plus-epoch update.

use crate::core::error::{AtriumError, Result};
use crate::db::manager::DatabaseManager;
use crate::db::models::{Group, Organization, ProfileChanges, Role, User};
use async_trait::async_trait;
use rusqlite::OptionalExtension;
use std::sync::Arc;

/// Generic repository trait for the operations every store supports
#[async_trait]
pub trait Repository<T>: Send + Sync {
    /// Find an entity by its uuid
    async fn find_by_id(&self, uuid: &str) -> Result<Option<T>>;

    /// Find all entities
    async fn find_all(&self) -> Result<Vec<T>>;

    /// Create a new entity
    async fn create(&self, entity: &T) -> Result<()>;
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        uuid: row.get(0)?,
        screen_name: row.get(1)?,
        display_name: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        token_epoch: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const USER_COLUMNS: &str =
    "uuid, screen_name, display_name, email, password_hash, token_epoch, created_at";

/// Map a UNIQUE constraint violation to Conflict, anything else to a
/// storage error
fn map_unique_violation(e: rusqlite::Error, message: &str) -> AtriumError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            AtriumError::Conflict(message.to_string())
        }
        _ => AtriumError::DatabaseError(e),
    }
}

/// Repository for User entities
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseManager>,
}

impl UserRepository {
    /// Create a new UserRepository
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.to_string();
        self.db
            .execute(move |conn| {
                conn.query_row(
                    &format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS),
                    [&email],
                    user_from_row,
                )
                .optional()
                .map_err(AtriumError::DatabaseError)
            })
            .await
    }

    /// Find a user by screen name
    pub async fn find_by_screen_name(&self, screen_name: &str) -> Result<Option<User>> {
        let screen_name = screen_name.to_string();
        self.db
            .execute(move |conn| {
                conn.query_row(
                    &format!("SELECT {} FROM users WHERE screen_name = ?", USER_COLUMNS),
                    [&screen_name],
                    user_from_row,
                )
                .optional()
                .map_err(AtriumError::DatabaseError)
            })
            .await
    }

    /// Count total users
    pub async fn count(&self) -> Result<i64> {
        self.db
            .execute(|conn| {
                conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
                    .map_err(AtriumError::DatabaseError)
            })
            .await
    }

    /// Apply profile field changes in a single UPDATE
    pub async fn update_profile(&self, uuid: &str, changes: ProfileChanges) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let uuid = uuid.to_string();
        self.db
            .execute(move |conn| {
                let mut sets: Vec<&str> = Vec::new();
                let mut params: Vec<String> = Vec::new();

                if let Some(screen_name) = changes.screen_name {
                    sets.push("screen_name = ?");
                    params.push(screen_name);
                }
                if let Some(display_name) = changes.display_name {
                    sets.push("display_name = ?");
                    params.push(display_name);
                }
                if let Some(email) = changes.email {
                    sets.push("email = ?");
                    params.push(email);
                }

                params.push(uuid);

                let sql = format!("UPDATE users SET {} WHERE uuid = ?", sets.join(", "));
                let updated = conn
                    .execute(&sql, rusqlite::params_from_iter(params.iter()))
                    .map_err(|e| {
                        map_unique_violation(e, "email or screen name already in use")
                    })?;

                if updated == 0 {
                    return Err(AtriumError::NotFound("user not found".to_string()));
                }
                Ok(())
            })
            .await
    }

    /// Store a new password hash and bump the credential-epoch.
    ///
    /// One UPDATE statement: the hash swap and the epoch bump are atomic,
    /// so a client disconnect can never leave a new password with old
    /// sessions still valid (or vice versa).
    pub async fn update_password(&self, uuid: &str, password_hash: &str) -> Result<()> {
        let uuid = uuid.to_string();
        let password_hash = password_hash.to_string();
        self.db
            .execute(move |conn| {
                let updated = conn
                    .execute(
                        "UPDATE users SET password_hash = ?, token_epoch = token_epoch + 1 \
                         WHERE uuid = ?",
                        rusqlite::params![&password_hash, &uuid],
                    )
                    .map_err(AtriumError::DatabaseError)?;

                if updated == 0 {
                    return Err(AtriumError::NotFound("user not found".to_string()));
                }
                Ok(())
            })
            .await
    }

    /// Roles assigned to a user
    pub async fn roles_for_user(&self, uuid: &str) -> Result<Vec<Role>> {
        let uuid = uuid.to_string();
        self.db
            .execute(move |conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT r.uuid, r.name, r.slug, r.created_at FROM roles r \
                         JOIN user_roles ur ON ur.role_uuid = r.uuid \
                         WHERE ur.user_uuid = ? ORDER BY r.slug",
                    )
                    .map_err(AtriumError::DatabaseError)?;

                let roles = stmt
                    .query_map([&uuid], |row| {
                        Ok(Role {
                            uuid: row.get(0)?,
                            name: row.get(1)?,
                            slug: row.get(2)?,
                            created_at: row.get(3)?,
                        })
                    })
                    .map_err(AtriumError::DatabaseError)?
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(AtriumError::DatabaseError)?;

                Ok(roles)
            })
            .await
    }

    /// Organizations the user belongs to
    pub async fn organizations_for_user(&self, uuid: &str) -> Result<Vec<Organization>> {
        let uuid = uuid.to_string();
        self.db
            .execute(move |conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT o.uuid, o.name, o.created_at FROM organizations o \
                         JOIN user_organizations uo ON uo.organization_uuid = o.uuid \
                         WHERE uo.user_uuid = ? ORDER BY o.name",
                    )
                    .map_err(AtriumError::DatabaseError)?;

                let orgs = stmt
                    .query_map([&uuid], |row| {
                        Ok(Organization {
                            uuid: row.get(0)?,
                            name: row.get(1)?,
                            created_at: row.get(2)?,
                        })
                    })
                    .map_err(AtriumError::DatabaseError)?
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(AtriumError::DatabaseError)?;

                Ok(orgs)
            })
            .await
    }

    /// Groups the user belongs to
    pub async fn groups_for_user(&self, uuid: &str) -> Result<Vec<Group>> {
        let uuid = uuid.to_string();
        self.db
            .execute(move |conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT g.uuid, g.name, g.created_at FROM groups g \
                         JOIN user_groups ug ON ug.group_uuid = g.uuid \
                         WHERE ug.user_uuid = ? ORDER BY g.name",
                    )
                    .map_err(AtriumError::DatabaseError)?;

                let groups = stmt
                    .query_map([&uuid], |row| {
                        Ok(Group {
                            uuid: row.get(0)?,
                            name: row.get(1)?,
                            created_at: row.get(2)?,
                        })
                    })
                    .map_err(AtriumError::DatabaseError)?
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(AtriumError::DatabaseError)?;

                Ok(groups)
            })
            .await
    }

    /// Link a user to an organization (idempotent)
    pub async fn add_organization(&self, user_uuid: &str, organization_uuid: &str) -> Result<()> {
        self.link(
            "INSERT OR IGNORE INTO user_organizations (user_uuid, organization_uuid) VALUES (?, ?)",
            user_uuid,
            organization_uuid,
        )
        .await
    }

    /// Unlink a user from an organization
    pub async fn remove_organization(
        &self,
        user_uuid: &str,
        organization_uuid: &str,
    ) -> Result<()> {
        self.link(
            "DELETE FROM user_organizations WHERE user_uuid = ? AND organization_uuid = ?",
            user_uuid,
            organization_uuid,
        )
        .await
    }

    /// Link a user to a group (idempotent)
    pub async fn add_group(&self, user_uuid: &str, group_uuid: &str) -> Result<()> {
        self.link(
            "INSERT OR IGNORE INTO user_groups (user_uuid, group_uuid) VALUES (?, ?)",
            user_uuid,
            group_uuid,
        )
        .await
    }

    /// Unlink a user from a group
    pub async fn remove_group(&self, user_uuid: &str, group_uuid: &str) -> Result<()> {
        self.link(
            "DELETE FROM user_groups WHERE user_uuid = ? AND group_uuid = ?",
            user_uuid,
            group_uuid,
        )
        .await
    }

    /// Link a user to a role (idempotent)
    pub async fn add_role(&self, user_uuid: &str, role_uuid: &str) -> Result<()> {
        self.link(
            "INSERT OR IGNORE INTO user_roles (user_uuid, role_uuid) VALUES (?, ?)",
            user_uuid,
            role_uuid,
        )
        .await
    }

    /// Unlink a user from a role
    pub async fn remove_role(&self, user_uuid: &str, role_uuid: &str) -> Result<()> {
        self.link(
            "DELETE FROM user_roles WHERE user_uuid = ? AND role_uuid = ?",
            user_uuid,
            role_uuid,
        )
        .await
    }

    async fn link(&self, sql: &'static str, left: &str, right: &str) -> Result<()> {
        let left = left.to_string();
        let right = right.to_string();
        self.db
            .execute(move |conn| {
                conn.execute(sql, [&left, &right])
                    .map_err(AtriumError::DatabaseError)?;
                Ok(())
            })
            .await
    }
}

#[async_trait]
impl Repository<User> for UserRepository {
    async fn find_by_id(&self, uuid: &str) -> Result<Option<User>> {
        let uuid = uuid.to_string();
        self.db
            .execute(move |conn| {
                conn.query_row(
                    &format!("SELECT {} FROM users WHERE uuid = ?", USER_COLUMNS),
                    [&uuid],
                    user_from_row,
                )
                .optional()
                .map_err(AtriumError::DatabaseError)
            })
            .await
    }

    async fn find_all(&self) -> Result<Vec<User>> {
        self.db
            .execute(|conn| {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {} FROM users ORDER BY created_at DESC",
                        USER_COLUMNS
                    ))
                    .map_err(AtriumError::DatabaseError)?;

                let users = stmt
                    .query_map([], user_from_row)
                    .map_err(AtriumError::DatabaseError)?
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(AtriumError::DatabaseError)?;

                Ok(users)
            })
            .await
    }

    async fn create(&self, user: &User) -> Result<()> {
        let user = user.clone();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO users \
                     (uuid, screen_name, display_name, email, password_hash, token_epoch, created_at) \
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                    rusqlite::params![
                        user.uuid,
                        user.screen_name,
                        user.display_name,
                        user.email,
                        user.password_hash,
                        user.token_epoch,
                        user.created_at,
                    ],
                )
                .map_err(|e| map_unique_violation(e, "email or screen name already in use"))?;
                Ok(())
            })
            .await
    }
}

fn organization_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Organization> {
    Ok(Organization {
        uuid: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

/// Repository for Organization entities
#[derive(Clone)]
pub struct OrganizationRepository {
    db: Arc<DatabaseManager>,
}

impl OrganizationRepository {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Repository<Organization> for OrganizationRepository {
    async fn find_by_id(&self, uuid: &str) -> Result<Option<Organization>> {
        let uuid = uuid.to_string();
        self.db
            .execute(move |conn| {
                conn.query_row(
                    "SELECT uuid, name, created_at FROM organizations WHERE uuid = ?",
                    [&uuid],
                    organization_from_row,
                )
                .optional()
                .map_err(AtriumError::DatabaseError)
            })
            .await
    }

    async fn find_all(&self) -> Result<Vec<Organization>> {
        self.db
            .execute(|conn| {
                let mut stmt = conn
                    .prepare("SELECT uuid, name, created_at FROM organizations ORDER BY name")
                    .map_err(AtriumError::DatabaseError)?;

                let orgs = stmt
                    .query_map([], organization_from_row)
                    .map_err(AtriumError::DatabaseError)?
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(AtriumError::DatabaseError)?;

                Ok(orgs)
            })
            .await
    }

    async fn create(&self, org: &Organization) -> Result<()> {
        let org = org.clone();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO organizations (uuid, name, created_at) VALUES (?, ?, ?)",
                    rusqlite::params![org.uuid, org.name, org.created_at],
                )
                .map_err(|e| map_unique_violation(e, "organization already exists"))?;
                Ok(())
            })
            .await
    }
}

fn group_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        uuid: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

/// Repository for Group entities
#[derive(Clone)]
pub struct GroupRepository {
    db: Arc<DatabaseManager>,
}

impl GroupRepository {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Repository<Group> for GroupRepository {
    async fn find_by_id(&self, uuid: &str) -> Result<Option<Group>> {
        let uuid = uuid.to_string();
        self.db
            .execute(move |conn| {
                conn.query_row(
                    "SELECT uuid, name, created_at FROM groups WHERE uuid = ?",
                    [&uuid],
                    group_from_row,
                )
                .optional()
                .map_err(AtriumError::DatabaseError)
            })
            .await
    }

    async fn find_all(&self) -> Result<Vec<Group>> {
        self.db
            .execute(|conn| {
                let mut stmt = conn
                    .prepare("SELECT uuid, name, created_at FROM groups ORDER BY name")
                    .map_err(AtriumError::DatabaseError)?;

                let groups = stmt
                    .query_map([], group_from_row)
                    .map_err(AtriumError::DatabaseError)?
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(AtriumError::DatabaseError)?;

                Ok(groups)
            })
            .await
    }

    async fn create(&self, group: &Group) -> Result<()> {
        let group = group.clone();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO groups (uuid, name, created_at) VALUES (?, ?, ?)",
                    rusqlite::params![group.uuid, group.name, group.created_at],
                )
                .map_err(|e| map_unique_violation(e, "group already exists"))?;
                Ok(())
            })
            .await
    }
}

/// Repository for Role entities
#[derive(Clone)]
pub struct RoleRepository {
    db: Arc<DatabaseManager>,
}

impl RoleRepository {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    /// Find a role by its slug
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Role>> {
        let slug = slug.to_string();
        self.db
            .execute(move |conn| {
                conn.query_row(
                    "SELECT uuid, name, slug, created_at FROM roles WHERE slug = ?",
                    [&slug],
                    role_from_row,
                )
                .optional()
                .map_err(AtriumError::DatabaseError)
            })
            .await
    }
}

fn role_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Role> {
    Ok(Role {
        uuid: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        created_at: row.get(3)?,
    })
}

#[async_trait]
impl Repository<Role> for RoleRepository {
    async fn find_by_id(&self, uuid: &str) -> Result<Option<Role>> {
        let uuid = uuid.to_string();
        self.db
            .execute(move |conn| {
                conn.query_row(
                    "SELECT uuid, name, slug, created_at FROM roles WHERE uuid = ?",
                    [&uuid],
                    role_from_row,
                )
                .optional()
                .map_err(AtriumError::DatabaseError)
            })
            .await
    }

    async fn find_all(&self) -> Result<Vec<Role>> {
        self.db
            .execute(|conn| {
                let mut stmt = conn
                    .prepare("SELECT uuid, name, slug, created_at FROM roles ORDER BY slug")
                    .map_err(AtriumError::DatabaseError)?;

                let roles = stmt
                    .query_map([], role_from_row)
                    .map_err(AtriumError::DatabaseError)?
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(AtriumError::DatabaseError)?;

                Ok(roles)
            })
            .await
    }

    async fn create(&self, role: &Role) -> Result<()> {
        let role = role.clone();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO roles (uuid, name, slug, created_at) VALUES (?, ?, ?, ?)",
                    rusqlite::params![role.uuid, role.name, role.slug, role.created_at],
                )
                .map_err(|e| map_unique_violation(e, "role slug already exists"))?;
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn test_user(screen_name: &str, email: &str) -> User {
        User {
            uuid: Uuid::new_v4().to_string(),
            screen_name: screen_name.to_string(),
            display_name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: "$2b$04$invalidhashforrepotests".to_string(),
            token_epoch: 0,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    fn test_repos() -> (
        UserRepository,
        OrganizationRepository,
        RoleRepository,
        Arc<DatabaseManager>,
    ) {
        let db = Arc::new(DatabaseManager::new_in_memory().unwrap());
        (
            UserRepository::new(db.clone()),
            OrganizationRepository::new(db.clone()),
            RoleRepository::new(db.clone()),
            db,
        )
    }

    #[tokio::test]
    async fn test_create_and_lookup_user() {
        let (users, _, _, _) = test_repos();
        let user = test_user("au", "app@user.com");
        users.create(&user).await.unwrap();

        let by_id = users.find_by_id(&user.uuid).await.unwrap().unwrap();
        assert_eq!(by_id.email, "app@user.com");

        let by_email = users.find_by_email("app@user.com").await.unwrap().unwrap();
        assert_eq!(by_email.uuid, user.uuid);

        let by_screen_name = users.find_by_screen_name("au").await.unwrap().unwrap();
        assert_eq!(by_screen_name.uuid, user.uuid);

        assert!(users.find_by_email("other@user.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let (users, _, _, _) = test_repos();
        users.create(&test_user("first", "same@user.com")).await.unwrap();

        let err = users
            .create(&test_user("second", "same@user.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AtriumError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_password_bumps_epoch() {
        let (users, _, _, _) = test_repos();
        let user = test_user("au", "app@user.com");
        users.create(&user).await.unwrap();

        users.update_password(&user.uuid, "$2b$04$newhash").await.unwrap();

        let reloaded = users.find_by_id(&user.uuid).await.unwrap().unwrap();
        assert_eq!(reloaded.password_hash, "$2b$04$newhash");
        assert_eq!(reloaded.token_epoch, user.token_epoch + 1);
    }

    #[tokio::test]
    async fn test_update_password_unknown_user() {
        let (users, _, _, _) = test_repos();
        let err = users.update_password("missing", "$2b$04$x").await.unwrap_err();
        assert!(matches!(err, AtriumError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_profile_partial() {
        let (users, _, _, _) = test_repos();
        let user = test_user("au", "app@user.com");
        users.create(&user).await.unwrap();

        users
            .update_profile(
                &user.uuid,
                ProfileChanges {
                    screen_name: Some("newNick".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let reloaded = users.find_by_id(&user.uuid).await.unwrap().unwrap();
        assert_eq!(reloaded.screen_name, "newNick");
        // Untouched fields survive
        assert_eq!(reloaded.email, "app@user.com");
        assert_eq!(reloaded.display_name, "Test User");
    }

    #[tokio::test]
    async fn test_role_assignment_round_trip() {
        let (users, _, roles, _) = test_repos();
        let user = test_user("au", "app@user.com");
        users.create(&user).await.unwrap();

        let role = Role {
            uuid: Uuid::new_v4().to_string(),
            name: "Administrator".to_string(),
            slug: "admin".to_string(),
            created_at: Utc::now().to_rfc3339(),
        };
        roles.create(&role).await.unwrap();

        users.add_role(&user.uuid, &role.uuid).await.unwrap();
        // Adding twice is a no-op
        users.add_role(&user.uuid, &role.uuid).await.unwrap();

        let assigned = users.roles_for_user(&user.uuid).await.unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].slug, "admin");

        users.remove_role(&user.uuid, &role.uuid).await.unwrap();
        assert!(users.roles_for_user(&user.uuid).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_organization_membership() {
        let (users, orgs, _, _) = test_repos();
        let user = test_user("au", "app@user.com");
        users.create(&user).await.unwrap();

        let org = Organization {
            uuid: Uuid::new_v4().to_string(),
            name: "Acme".to_string(),
            created_at: Utc::now().to_rfc3339(),
        };
        orgs.create(&org).await.unwrap();

        users.add_organization(&user.uuid, &org.uuid).await.unwrap();
        let assigned = users.organizations_for_user(&user.uuid).await.unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].name, "Acme");

        users.remove_organization(&user.uuid, &org.uuid).await.unwrap();
        assert!(users
            .organizations_for_user(&user.uuid)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_role_find_by_slug() {
        let (_, _, roles, _) = test_repos();
        let role = Role {
            uuid: Uuid::new_v4().to_string(),
            name: "Administrator".to_string(),
            slug: "admin".to_string(),
            created_at: Utc::now().to_rfc3339(),
        };
        roles.create(&role).await.unwrap();

        assert!(roles.find_by_slug("admin").await.unwrap().is_some());
        assert!(roles.find_by_slug("missing").await.unwrap().is_none());
    }
}
