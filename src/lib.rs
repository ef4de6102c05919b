//! Atrium Backend Library
//!
//! This library provides the authentication and administration core of
//! the Atrium backend: stateless JWT sessions with credential-epoch
//! revocation, user management, and the REST API surface.

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod email;

// Re-export commonly used types
pub use crate::core::Config;
pub use api::ApiServer;
pub use db::DatabaseManager;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
