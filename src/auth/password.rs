//! Password hashing and verification using bcrypt
//!
//! bcrypt embeds a per-call random salt in the output, so two hashes of
//! the same plaintext never compare equal.

use crate::core::error::{AtriumError, Result};

/// Hash a password using bcrypt with the default cost
pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AtriumError::TaskError(format!("Failed to hash password: {}", e)))
}

/// Verify a password against a stored hash.
///
/// Never fails: a malformed stored hash verifies as false rather than
/// surfacing an error to the login path.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
