use thiserror::Error;

/// Error type for JWT operations.
///
/// Verification failures are not represented here: a token that does not verify
/// is reported as `None` by [`super::TokenIssuer::verify`].
#[derive(Debug, Clone, Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    EncodingFailed(String),

    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Invalid token settings: {0}")]
    InvalidSettings(String),
}
