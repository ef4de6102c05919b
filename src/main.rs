//! Atrium Backend - Rust Implementation
//!
//! Administrative web application backend with stateless JWT sessions.

use atrium::{api, core, db};

use anyhow::Result;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (handles CLI args, env vars, and config file)
    let config = match core::config::Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            // Print error to stderr since logging isn't initialized yet
            eprintln!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Initialize logging system based on configuration
    let _logger = match core::Logger::init(&config.logging) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return Err(e);
        }
    };

    info!("Configuration loaded successfully");
    info!("Starting Atrium Backend v{}", env!("CARGO_PKG_VERSION"));
    info!(
        host = %config.server.host,
        port = config.server.port,
        "Server configuration"
    );
    info!(
        path = ?config.database.path,
        "Database configuration"
    );

    // Initialize database (runs migrations)
    info!("Initializing database...");
    let db = std::sync::Arc::new(db::DatabaseManager::new(
        &config.database.path,
        config.database.connection_pool_size as u32,
        std::time::Duration::from_millis(config.database.busy_timeout),
    )?);
    info!("Database initialized successfully");

    // Ensure the elevated role and a default admin account exist
    ensure_admin_user(db.clone()).await?;

    // Initialize API server
    info!("Initializing HTTP server...");
    let config = std::sync::Arc::new(config);
    let server_url = format!("http://{}:{}", config.server.host, config.server.port);
    let server = api::ApiServer::new(config, db);

    info!("Atrium Backend initialized successfully");
    info!(url = %server_url, "Server ready - starting to serve requests");

    // Start serving (this will block until shutdown signal)
    server.serve().await?;

    Ok(())
}

/// Seed the `admin` role, and on an empty users table a default admin
/// account so the panel is reachable after first start.
async fn ensure_admin_user(db: std::sync::Arc<db::DatabaseManager>) -> Result<()> {
    use atrium::auth::password::hash_password;
    use atrium::db::models::{Role, User};
    use atrium::db::repository::{Repository, RoleRepository, UserRepository};
    use uuid::Uuid;

    let role_repo = RoleRepository::new(db.clone());
    let admin_role = match role_repo.find_by_slug("admin").await? {
        Some(role) => role,
        None => {
            info!("Creating admin role...");
            let role = Role {
                uuid: Uuid::new_v4().to_string(),
                name: "Administrator".to_string(),
                slug: "admin".to_string(),
                created_at: chrono::Utc::now().to_rfc3339(),
            };
            role_repo.create(&role).await?;
            role
        }
    };

    let user_repo = UserRepository::new(db);
    let count = user_repo.count().await?;

    if count == 0 {
        info!("No users found, creating default admin user...");
        let password_hash = hash_password("admin123")?;
        let admin_user = User {
            uuid: Uuid::new_v4().to_string(),
            screen_name: "admin".to_string(),
            display_name: "Administrator".to_string(),
            email: "admin@localhost".to_string(),
            password_hash,
            token_epoch: 0,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        user_repo.create(&admin_user).await?;
        user_repo.add_role(&admin_user.uuid, &admin_role.uuid).await?;
        info!("Default admin user created: email='admin@localhost', password='admin123'");
    }

    Ok(())
}
