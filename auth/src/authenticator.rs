use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::jwt::Claims;
use crate::jwt::IssuedToken;
use crate::jwt::JwtError;
use crate::jwt::JwtSettings;
use crate::jwt::TokenIssuer;
use crate::password::PasswordError;
use crate::password::PasswordHasher;

/// Credential toolkit combining password hashing and token signing.
///
/// Services hold one instance behind an `Arc` and call into it from their own
/// flows; it carries no per-request state.
pub struct Authenticator {
    password_hasher: PasswordHasher,
    token_issuer: TokenIssuer,
}

impl Authenticator {
    /// Create a new authenticator.
    ///
    /// # Arguments
    /// * `settings` - Token signing settings
    ///
    /// # Errors
    /// * `JwtError` - Settings were rejected by the token issuer
    pub fn new(settings: &JwtSettings) -> Result<Self, JwtError> {
        Ok(Self {
            password_hasher: PasswordHasher::new(),
            token_issuer: TokenIssuer::new(settings)?,
        })
    }

    /// Hash a password for storage.
    ///
    /// # Errors
    /// * `PasswordError` - Hashing operation failed
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password_hasher.hash(password)
    }

    /// Check a plaintext password against a stored hash.
    pub fn verify_password(&self, password: &str, stored_hash: &str) -> bool {
        self.password_hasher.verify(password, stored_hash)
    }

    /// Issue an access token for `subject` with the configured access lifetime.
    ///
    /// # Errors
    /// * `JwtError` - Token generation failed
    pub fn issue_access_token<T: Serialize>(
        &self,
        subject: impl ToString,
        claims: T,
    ) -> Result<IssuedToken, JwtError> {
        self.token_issuer.issue_access(subject, claims)
    }

    /// Issue a refresh token for `subject` with the configured refresh lifetime.
    ///
    /// # Errors
    /// * `JwtError` - Token generation failed
    pub fn issue_refresh_token<T: Serialize>(
        &self,
        subject: impl ToString,
        claims: T,
    ) -> Result<IssuedToken, JwtError> {
        self.token_issuer.issue_refresh(subject, claims)
    }

    /// Verify and decode a token; `None` means unauthenticated.
    pub fn validate_token<T: DeserializeOwned>(&self, token: &str) -> Option<Claims<T>> {
        self.token_issuer.verify(token)
    }
}
