use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::errors::LoginRequestError;
use crate::domain::identity::models::EmailAddress;
use crate::domain::identity::models::Identity;
use crate::domain::identity::models::IdentityId;
use crate::domain::identity::models::Password;
use crate::domain::identity::models::PersonName;
use crate::domain::identity::models::PhoneNumber;
use crate::domain::identity::models::RoleId;
use crate::domain::identity::models::Username;

/// Command to register a new identity, built from validated fields.
#[derive(Debug, Clone)]
pub struct RegisterCommand {
    pub name: PersonName,
    pub lastname: PersonName,
    pub username: Username,
    pub email: EmailAddress,
    pub phone: Option<PhoneNumber>,
    pub password: Password,
}

impl RegisterCommand {
    /// Validate raw registration fields.
    ///
    /// Checked in order: name, lastname, username, email, phone (only when
    /// non-blank), password strength. Missing fields fail their own check.
    ///
    /// # Errors
    /// The first validation error encountered.
    pub fn parse(
        name: Option<&str>,
        lastname: Option<&str>,
        username: Option<&str>,
        email: Option<&str>,
        phone: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self, AuthError> {
        let name = PersonName::new(name.unwrap_or_default(), "name")?;
        let lastname = PersonName::new(lastname.unwrap_or_default(), "lastname")?;
        let username = Username::new(username.unwrap_or_default())?;
        let email = EmailAddress::new(email.unwrap_or_default())?;
        let phone = match phone.map(str::trim).filter(|p| !p.is_empty()) {
            Some(raw) => Some(PhoneNumber::new(raw)?),
            None => None,
        };
        let password = Password::new(password.unwrap_or_default())?;

        Ok(Self {
            name,
            lastname,
            username,
            email,
            phone,
            password,
        })
    }
}

/// How the login request identifies the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginIdentifier {
    Email(EmailAddress),
    Username(Username),
}

/// Command to log in with either identifier and a password.
#[derive(Clone)]
pub struct LoginCommand {
    pub identifier: LoginIdentifier,
    pub password: String,
}

impl LoginCommand {
    const MIN_PASSWORD_LENGTH: usize = 8;

    /// Resolve the login identifier leniently.
    ///
    /// Empty strings count as absent. A value in `email` that is not an email is
    /// retried as a username when no `username` was sent, and a value in
    /// `username` that is not a username is retried as an email when no `email`
    /// was sent. When both resolve, the email wins.
    ///
    /// # Errors
    /// * `MissingIdentifier` - Neither field yields a valid email or username
    /// * `PasswordTooShort` - Password absent or under 8 characters
    pub fn resolve(
        email: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self, LoginRequestError> {
        let email_raw = email.filter(|raw| !raw.is_empty());
        let username_raw = username.filter(|raw| !raw.is_empty());

        let mut clean_email = None;
        let mut clean_username = None;

        if let Some(raw) = email_raw {
            match EmailAddress::new(raw) {
                Ok(email) => clean_email = Some(email),
                Err(_) if username_raw.is_none() => clean_username = Username::new(raw).ok(),
                Err(_) => {}
            }
        }

        if let Some(raw) = username_raw {
            match Username::new(raw) {
                Ok(username) => clean_username = Some(username),
                Err(_) if email_raw.is_none() => clean_email = EmailAddress::new(raw).ok(),
                Err(_) => {}
            }
        }

        let identifier = match (clean_email, clean_username) {
            (Some(email), _) => LoginIdentifier::Email(email),
            (None, Some(username)) => LoginIdentifier::Username(username),
            (None, None) => return Err(LoginRequestError::MissingIdentifier),
        };

        let password = password
            .filter(|p| p.chars().count() >= Self::MIN_PASSWORD_LENGTH)
            .ok_or(LoginRequestError::PasswordTooShort {
                min: Self::MIN_PASSWORD_LENGTH,
            })?;

        Ok(Self {
            identifier,
            password: password.to_string(),
        })
    }
}

impl fmt::Debug for LoginCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCommand")
            .field("identifier", &self.identifier)
            .field("password", &"***")
            .finish()
    }
}

/// Identity claims carried in every access token next to the registered claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub email: String,
    pub username: String,
    pub role_id: Option<i64>,
    pub role_name: Option<String>,
}

impl From<&Identity> for AccessClaims {
    fn from(identity: &Identity) -> Self {
        Self {
            email: identity.email.as_str().to_string(),
            username: identity.username.as_str().to_string(),
            role_id: identity.role_id().map(|id| id.0),
            role_name: identity.role_name().map(|name| name.as_str().to_string()),
        }
    }
}

/// Successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub user_id: IdentityId,
    pub role_id: Option<RoleId>,
    pub access_token: String,
}

/// Result of a logout call; `success` is always true.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoutOutcome {
    pub success: bool,
    /// Whether a matching session was found in a revoked state afterwards
    pub session_revoked: bool,
}

/// Caller proven by a verified token whose session is still active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    pub identity_id: IdentityId,
    pub username: String,
    pub email: String,
    pub role_id: Option<i64>,
    pub role_name: Option<String>,
    pub jti: String,
    pub session_expires_at: DateTime<Utc>,
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: Option<&str>) -> Option<&str> {
    header_value
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
