use std::str::FromStr;

use chrono::DateTime;
use chrono::Duration;
use chrono::SubsecRound;
use chrono::Utc;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::claims::Claims;
use super::errors::JwtError;
use super::settings::JwtSettings;

/// A freshly signed token together with the registered claims it was minted with.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Compact JWS string
    pub token: String,
    pub jti: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies time-bounded tokens for a single issuer/audience pair.
///
/// Only HMAC algorithms are accepted since the key material is a shared secret.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    issuer: String,
    audience: String,
    access_token_minutes: i64,
    refresh_token_minutes: i64,
}

impl TokenIssuer {
    /// Create an issuer from immutable settings.
    ///
    /// # Errors
    /// * `UnsupportedAlgorithm` - Algorithm is unknown or not HMAC based
    /// * `InvalidSettings` - Empty secret, non-positive or unrepresentable lifetimes
    pub fn new(settings: &JwtSettings) -> Result<Self, JwtError> {
        let algorithm = Algorithm::from_str(&settings.algorithm)
            .map_err(|_| JwtError::UnsupportedAlgorithm(settings.algorithm.clone()))?;

        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(JwtError::UnsupportedAlgorithm(settings.algorithm.clone()));
        }

        if settings.secret.is_empty() {
            return Err(JwtError::InvalidSettings("secret must not be empty".to_string()));
        }

        if settings.access_token_minutes <= 0 || settings.refresh_token_minutes <= 0 {
            return Err(JwtError::InvalidSettings(
                "token lifetimes must be positive".to_string(),
            ));
        }

        let now = Utc::now();
        expiry_after(now, settings.access_token_minutes)?;
        expiry_after(now, settings.refresh_token_minutes)?;

        let secret = settings.secret.as_bytes();

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm,
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
            access_token_minutes: settings.access_token_minutes,
            refresh_token_minutes: settings.refresh_token_minutes,
        })
    }

    /// Sign a new token valid for `lifetime_minutes` from now.
    ///
    /// Every call mints a fresh random `jti` (UUID v4).
    ///
    /// # Errors
    /// * `InvalidSettings` - The expiry falls outside the representable range
    /// * `EncodingFailed` - Serialization or signing failed
    pub fn issue<T: Serialize>(
        &self,
        subject: impl ToString,
        custom: T,
        lifetime_minutes: i64,
    ) -> Result<IssuedToken, JwtError> {
        let issued_at = Utc::now().trunc_subsecs(0);
        let expires_at = expiry_after(issued_at, lifetime_minutes)?;

        let claims = Claims {
            sub: subject.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            custom,
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to sign token");
                JwtError::EncodingFailed(e.to_string())
            })?;

        tracing::debug!(jti = %claims.jti, exp = claims.exp, "Token issued");

        Ok(IssuedToken {
            token,
            jti: claims.jti,
            issued_at,
            expires_at,
        })
    }

    /// Sign a token with the configured access lifetime.
    pub fn issue_access<T: Serialize>(
        &self,
        subject: impl ToString,
        custom: T,
    ) -> Result<IssuedToken, JwtError> {
        self.issue(subject, custom, self.access_token_minutes)
    }

    /// Sign a token with the configured refresh lifetime.
    pub fn issue_refresh<T: Serialize>(
        &self,
        subject: impl ToString,
        custom: T,
    ) -> Result<IssuedToken, JwtError> {
        self.issue(subject, custom, self.refresh_token_minutes)
    }

    /// Verify signature, algorithm, issuer, audience and expiry.
    ///
    /// Returns `None` for any token that does not pass; callers treat that as
    /// unauthenticated.
    pub fn verify<T: DeserializeOwned>(&self, token: &str) -> Option<Claims<T>> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        match decode::<Claims<T>>(token, &self.decoding_key, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::warn!(error = %e, "Invalid or expired token");
                None
            }
        }
    }

    pub fn access_token_minutes(&self) -> i64 {
        self.access_token_minutes
    }
}

fn expiry_after(
    issued_at: DateTime<Utc>,
    lifetime_minutes: i64,
) -> Result<DateTime<Utc>, JwtError> {
    Duration::try_minutes(lifetime_minutes)
        .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
        .ok_or_else(|| {
            JwtError::InvalidSettings(format!(
                "token lifetime of {lifetime_minutes} minutes is out of range"
            ))
        })
}
