//! Database migrations
//!
//! Versioned schema migrations tracked in the schema_migrations table.
//! Each migration runs inside its own transaction.

use crate::core::error::{AtriumError, Result};
use rusqlite::Connection;
use tracing::{info, warn};

/// Migration version tracking table
const MIGRATION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at DATETIME DEFAULT CURRENT_TIMESTAMP
)
"#;

/// Initial schema migration (version 1)
const MIGRATION_V1: &str = r#"
-- Users table. token_epoch is the credential-epoch: bumping it
-- invalidates every previously issued session token for the user.
CREATE TABLE IF NOT EXISTS users (
    uuid TEXT PRIMARY KEY,
    screen_name TEXT UNIQUE NOT NULL,
    display_name TEXT NOT NULL DEFAULT '',
    email TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    token_epoch INTEGER NOT NULL DEFAULT 0,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS organizations (
    uuid TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS groups (
    uuid TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS roles (
    uuid TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    slug TEXT UNIQUE NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

-- Many-to-many associations driving the authorization guard
CREATE TABLE IF NOT EXISTS user_organizations (
    user_uuid TEXT NOT NULL,
    organization_uuid TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (user_uuid, organization_uuid),
    FOREIGN KEY (user_uuid) REFERENCES users(uuid) ON DELETE CASCADE,
    FOREIGN KEY (organization_uuid) REFERENCES organizations(uuid) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS user_groups (
    user_uuid TEXT NOT NULL,
    group_uuid TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (user_uuid, group_uuid),
    FOREIGN KEY (user_uuid) REFERENCES users(uuid) ON DELETE CASCADE,
    FOREIGN KEY (group_uuid) REFERENCES groups(uuid) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS user_roles (
    user_uuid TEXT NOT NULL,
    role_uuid TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (user_uuid, role_uuid),
    FOREIGN KEY (user_uuid) REFERENCES users(uuid) ON DELETE CASCADE,
    FOREIGN KEY (role_uuid) REFERENCES roles(uuid) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_user_roles_user ON user_roles(user_uuid);
CREATE INDEX IF NOT EXISTS idx_user_organizations_user ON user_organizations(user_uuid);
CREATE INDEX IF NOT EXISTS idx_user_groups_user ON user_groups(user_uuid);
"#;

/// Run all pending database migrations
///
/// Applies schema migrations in order, tracking applied versions in the
/// schema_migrations table.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(MIGRATION_TABLE)
        .map_err(AtriumError::DatabaseError)?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(AtriumError::DatabaseError)?;

    info!("Current database schema version: {}", current_version);

    if current_version < 1 {
        info!("Applying migration v1: Initial schema");
        apply_migration(conn, 1, MIGRATION_V1)?;
    }

    Ok(())
}

/// Apply a single migration
fn apply_migration(conn: &mut Connection, version: i64, sql: &str) -> Result<()> {
    let tx = conn.transaction().map_err(AtriumError::DatabaseError)?;

    tx.execute_batch(sql).map_err(|e| {
        warn!("Migration v{} failed: {}", version, e);
        AtriumError::DatabaseError(e)
    })?;

    tx.execute(
        "INSERT INTO schema_migrations (version) VALUES (?)",
        [version],
    )
    .map_err(AtriumError::DatabaseError)?;

    tx.commit().map_err(AtriumError::DatabaseError)?;

    info!("Migration v{} applied successfully", version);
    Ok(())
}
