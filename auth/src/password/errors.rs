use thiserror::Error;

/// Error type for password operations.
///
/// Only raised on cryptographic failure; a wrong password is not an error.
#[derive(Debug, Clone, Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),
}
