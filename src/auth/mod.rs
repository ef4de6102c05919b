//! Authentication and authorization
//!
//! Stateless JWT sessions with credential-epoch revocation. Submodules:
//! password hashing, token issue/verify, the session-loading middleware,
//! the auth flow handlers, and the self-or-admin guard.

pub mod guard;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod token;

pub use middleware::AuthUser;
pub use token::{Claims, TokenPurpose, TokenService};
