use std::fmt;

use serde::Deserialize;

/// Signing configuration for issued tokens.
///
/// Loaded once at startup and handed to [`super::TokenIssuer::new`]; never read
/// from ambient state afterwards.
#[derive(Clone, Deserialize)]
pub struct JwtSettings {
    pub secret: String,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    pub issuer: String,
    pub audience: String,
    #[serde(default = "default_access_token_minutes")]
    pub access_token_minutes: i64,
    #[serde(default = "default_refresh_token_minutes")]
    pub refresh_token_minutes: i64,
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_access_token_minutes() -> i64 {
    60
}

// 14 days
fn default_refresh_token_minutes() -> i64 {
    20_160
}

impl JwtSettings {
    /// Settings with default algorithm and lifetimes.
    pub fn new(
        secret: impl Into<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            secret: secret.into(),
            algorithm: default_algorithm(),
            issuer: issuer.into(),
            audience: audience.into(),
            access_token_minutes: default_access_token_minutes(),
            refresh_token_minutes: default_refresh_token_minutes(),
        }
    }
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"***")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_token_minutes", &self.access_token_minutes)
            .field("refresh_token_minutes", &self.refresh_token_minutes)
            .finish()
    }
}
