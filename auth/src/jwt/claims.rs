use serde::Deserialize;
use serde::Serialize;

/// Registered JWT claims plus a service-defined payload.
///
/// Every token minted by [`super::TokenIssuer`] carries all registered fields;
/// the `custom` payload is flattened into the same JSON object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims<T> {
    /// Subject (identity identifier)
    pub sub: String,

    /// JWT ID, unique per issued token
    pub jti: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Service-specific claims
    #[serde(flatten)]
    pub custom: T,
}

impl<T> Claims<T> {
    /// Token lifetime in seconds.
    pub fn lifetime_seconds(&self) -> i64 {
        self.exp - self.iat
    }

    /// Check if token is expired at the given Unix timestamp.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        self.exp <= current_timestamp
    }
}
