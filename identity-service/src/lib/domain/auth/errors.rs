use thiserror::Error;

use crate::domain::identity::errors::EmailError;
use crate::domain::identity::errors::PasswordStrengthError;
use crate::domain::identity::errors::PersonNameError;
use crate::domain::identity::errors::PhoneNumberError;
use crate::domain::identity::errors::RoleNameError;
use crate::domain::identity::errors::UsernameError;

/// Classification carried by every [`AuthError`].
///
/// Callers switch on this for status codes and log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or duplicate input, fixable by the client
    Validation,
    /// Bad credentials or unusable token
    Unauthorized,
    /// Conflicting session state
    Conflict,
    /// Referenced entity missing
    NotFound,
    /// Store, crypto or signing failure
    Internal,
}

/// Error for login request parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoginRequestError {
    #[error("Provide a valid email or username")]
    MissingIdentifier,

    #[error("Invalid password (minimum {min} characters)")]
    PasswordTooShort { min: usize },
}

/// Top-level error for credential and session operations
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    // Value object validation errors (automatically converted via #[from])
    #[error("Invalid username: {0}")]
    InvalidUsername(#[from] UsernameError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Invalid phone: {0}")]
    InvalidPhone(#[from] PhoneNumberError),

    #[error("Invalid name: {0}")]
    InvalidName(#[from] PersonNameError),

    #[error("{0}")]
    WeakPassword(#[from] PasswordStrengthError),

    #[error("{0}")]
    InvalidLogin(#[from] LoginRequestError),

    // Domain-level errors
    #[error("Email is already registered")]
    EmailAlreadyRegistered,

    #[error("Username is already registered")]
    UsernameAlreadyRegistered,

    #[error("Phone is already registered")]
    PhoneAlreadyRegistered,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("An active session already exists for this user")]
    ActiveSessionExists,

    #[error("Not found: {0}")]
    NotFound(String),

    // Infrastructure errors
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Stored role is invalid: {0}")]
    InvalidStoredRole(#[from] RoleNameError),

    #[error("Credential error: {0}")]
    Credential(String),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidUsername(_)
            | AuthError::InvalidEmail(_)
            | AuthError::InvalidPhone(_)
            | AuthError::InvalidName(_)
            | AuthError::WeakPassword(_)
            | AuthError::InvalidLogin(_)
            | AuthError::EmailAlreadyRegistered
            | AuthError::UsernameAlreadyRegistered
            | AuthError::PhoneAlreadyRegistered => ErrorKind::Validation,
            AuthError::InvalidCredentials | AuthError::InvalidToken => ErrorKind::Unauthorized,
            AuthError::ActiveSessionExists => ErrorKind::Conflict,
            AuthError::NotFound(_) => ErrorKind::NotFound,
            AuthError::DatabaseError(_)
            | AuthError::InvalidStoredRole(_)
            | AuthError::Credential(_) => ErrorKind::Internal,
        }
    }
}

impl From<auth::PasswordError> for AuthError {
    fn from(err: auth::PasswordError) -> Self {
        AuthError::Credential(err.to_string())
    }
}

impl From<auth::JwtError> for AuthError {
    fn from(err: auth::JwtError) -> Self {
        AuthError::Credential(err.to_string())
    }
}
