//! Signed stateless session and reset tokens
//!
//! Tokens are JWTs signed with a single server-held symmetric secret.
//! Claims carry the user uuid, the credential-epoch current at issue
//! time, and a purpose tag that keeps a reset link from being replayed
//! as a login session (and vice versa). Claims are not encrypted, only
//! integrity-protected.
//!
//! Verification failures are uniform: malformed encoding, bad signature,
//! expiry, and wrong purpose all collapse into the same rejection so a
//! caller cannot probe which check failed.

use crate::core::error::{AtriumError, Result};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What a token may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    Session,
    Reset,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User uuid
    pub sub: String,
    /// Credential-epoch at issue time
    pub epoch: i64,
    pub purpose: TokenPurpose,
    /// Issued-at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds; session tokens may be issued without one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// Issues and verifies signed tokens. Stateless and safe to share.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
}

impl TokenService {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Issue a token for a user at the given credential-epoch
    pub fn issue(
        &self,
        user_uuid: &str,
        epoch: i64,
        purpose: TokenPurpose,
        ttl: Option<Duration>,
    ) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_uuid.to_string(),
            epoch,
            purpose,
            iat: now,
            exp: ttl.map(|ttl| now as u64 + ttl.as_secs()),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AtriumError::TaskError(format!("Failed to sign token: {}", e)))
    }

    /// Verify a token presented for the expected purpose.
    ///
    /// Rejects uniformly on malformed encoding, bad signature, expiry,
    /// or a purpose mismatch.
    pub fn verify(&self, token: &str, expected_purpose: TokenPurpose) -> Result<Claims> {
        let mut validation = Validation::default();
        // exp is optional on session tokens; it is still enforced when present
        validation.set_required_spec_claims::<&str>(&[]);

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|_e| AtriumError::invalid_token())?;

        if token_data.claims.purpose != expected_purpose {
            return Err(AtriumError::invalid_token());
        }

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret")
    }

    #[test]
    fn test_issue_and_verify_session() {
        let tokens = service();
        let jwt = tokens
            .issue("user-1", 0, TokenPurpose::Session, None)
            .unwrap();

        let claims = tokens.verify(&jwt, TokenPurpose::Session).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.epoch, 0);
        assert_eq!(claims.purpose, TokenPurpose::Session);
        assert!(claims.exp.is_none());
    }

    #[test]
    fn test_ttl_sets_expiry() {
        let tokens = service();
        let jwt = tokens
            .issue(
                "user-1",
                3,
                TokenPurpose::Reset,
                Some(Duration::from_secs(1800)),
            )
            .unwrap();

        let claims = tokens.verify(&jwt, TokenPurpose::Reset).unwrap();
        assert_eq!(claims.epoch, 3);
        assert!(claims.exp.unwrap() > claims.iat as u64);
    }

    #[test]
    fn test_wrong_purpose_rejected_both_ways() {
        let tokens = service();
        let session = tokens
            .issue("user-1", 0, TokenPurpose::Session, None)
            .unwrap();
        let reset = tokens
            .issue(
                "user-1",
                0,
                TokenPurpose::Reset,
                Some(Duration::from_secs(60)),
            )
            .unwrap();

        assert!(tokens.verify(&session, TokenPurpose::Reset).is_err());
        assert!(tokens.verify(&reset, TokenPurpose::Session).is_err());
    }

    #[test]
    fn test_malformed_and_tampered_rejected() {
        let tokens = service();
        assert!(tokens.verify("", TokenPurpose::Session).is_err());
        assert!(tokens.verify("Invalid", TokenPurpose::Session).is_err());

        let other = TokenService::new("other-secret");
        let forged = other.issue("user-1", 0, TokenPurpose::Session, None).unwrap();
        assert!(tokens.verify(&forged, TokenPurpose::Session).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = service();

        // Craft a token whose expiry is past the default validation leeway
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "user-1".to_string(),
            epoch: 0,
            purpose: TokenPurpose::Session,
            iat: now - 600,
            exp: Some((now - 300) as u64),
        };
        let jwt = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("test-secret".as_bytes()),
        )
        .unwrap();

        assert!(tokens.verify(&jwt, TokenPurpose::Session).is_err());
    }

    #[test]
    fn test_failures_are_indistinguishable() {
        let tokens = service();
        let expired_or_garbage = tokens.verify("garbage", TokenPurpose::Session).unwrap_err();
        let wrong_purpose_jwt = tokens
            .issue(
                "user-1",
                0,
                TokenPurpose::Reset,
                Some(Duration::from_secs(60)),
            )
            .unwrap();
        let wrong_purpose = tokens
            .verify(&wrong_purpose_jwt, TokenPurpose::Session)
            .unwrap_err();

        assert_eq!(
            expired_or_garbage.to_string(),
            wrong_purpose.to_string()
        );
    }
}
