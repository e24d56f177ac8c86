use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;

use crate::domain::identity::errors::EmailError;
use crate::domain::identity::errors::PasswordStrengthError;
use crate::domain::identity::errors::PersonNameError;
use crate::domain::identity::errors::PhoneNumberError;
use crate::domain::identity::errors::RoleNameError;
use crate::domain::identity::errors::UsernameError;

/// Registered principal.
///
/// The password is only ever held as a PHC hash.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: IdentityId,
    pub name: PersonName,
    pub lastname: PersonName,
    pub username: Username,
    pub email: EmailAddress,
    pub phone: Option<PhoneNumber>,
    pub password_hash: String,
    pub role: Option<Role>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    pub fn role_id(&self) -> Option<RoleId> {
        self.role.as_ref().map(|role| role.id)
    }

    pub fn role_name(&self) -> Option<RoleName> {
        self.role.as_ref().map(|role| role.name)
    }
}

/// Identity row to insert; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub name: PersonName,
    pub lastname: PersonName,
    pub username: Username,
    pub email: EmailAddress,
    pub phone: Option<PhoneNumber>,
    pub password_hash: String,
    pub role_id: Option<RoleId>,
}

/// Store-assigned identity identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityId(pub i64);

impl IdentityId {
    /// Parse an identity ID from its decimal form (as carried in token `sub`).
    pub fn from_string(s: &str) -> Option<Self> {
        s.parse::<i64>().ok().map(IdentityId)
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoleId(pub i64);

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Role {
    pub id: RoleId,
    pub name: RoleName,
}

/// Closed set of authorization tiers, seeded at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleName {
    SuperAdmin,
    Admin,
    Member,
    Guest,
    Invited,
}

impl RoleName {
    pub const ALL: [RoleName; 5] = [
        RoleName::SuperAdmin,
        RoleName::Admin,
        RoleName::Member,
        RoleName::Guest,
        RoleName::Invited,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::SuperAdmin => "super_admin",
            RoleName::Admin => "admin",
            RoleName::Member => "member",
            RoleName::Guest => "guest",
            RoleName::Invited => "invited",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RoleName::SuperAdmin => "Super admin: full control",
            RoleName::Admin => "Admin: limited control",
            RoleName::Member => "Member: can interact",
            RoleName::Guest => "Guest: read only",
            RoleName::Invited => "Invited: no access until promoted by an administrator",
        }
    }
}

impl FromStr for RoleName {
    type Err = RoleNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoleName::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| RoleNameError::Unknown(s.to_string()))
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Username value type
///
/// Trimmed, 3-20 characters drawn from ASCII letters, digits, `.`, `_` and `-`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    const MIN_LENGTH: usize = 3;
    const MAX_LENGTH: usize = 20;

    /// Create a new valid username.
    ///
    /// # Errors
    /// * `TooShort` - Username shorter than 3 characters
    /// * `TooLong` - Username longer than 20 characters
    /// * `InvalidCharacters` - Contains anything but letters, digits, `.`, `_`, `-`
    pub fn new(username: impl AsRef<str>) -> Result<Self, UsernameError> {
        let username = username.as_ref().trim().to_string();
        let username = Self::with_valid_length(username)?;
        let username = Self::with_valid_chars(username)?;
        Ok(Self(username))
    }

    fn with_valid_length(username: String) -> Result<String, UsernameError> {
        let length = username.chars().count();
        if length < Self::MIN_LENGTH {
            Err(UsernameError::TooShort {
                min: Self::MIN_LENGTH,
                actual: length,
            })
        } else if length > Self::MAX_LENGTH {
            Err(UsernameError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            })
        } else {
            Ok(username)
        }
    }

    fn with_valid_chars(username: String) -> Result<String, UsernameError> {
        if username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            Ok(username)
        } else {
            Err(UsernameError::InvalidCharacters)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// Trimmed and lowercased. Must have a `local@domain.tld` shape and parse as an
/// RFC 5322 address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated email address.
    ///
    /// # Errors
    /// * `InvalidFormat` - Not a `local@domain.tld` address
    pub fn new(email: impl AsRef<str>) -> Result<Self, EmailError> {
        let email = email.as_ref().trim().to_lowercase();

        if !Self::has_basic_shape(&email) {
            return Err(EmailError::InvalidFormat(email));
        }

        email_address::EmailAddress::from_str(&email)
            .map(|_| EmailAddress(email))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    fn has_basic_shape(email: &str) -> bool {
        if email.chars().any(char::is_whitespace) {
            return false;
        }

        let Some((local, domain)) = email.split_once('@') else {
            return false;
        };

        if local.is_empty() || domain.contains('@') {
            return false;
        }

        domain
            .char_indices()
            .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Phone number: 6-15 ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    const MIN_DIGITS: usize = 6;
    const MAX_DIGITS: usize = 15;

    pub fn new(phone: impl AsRef<str>) -> Result<Self, PhoneNumberError> {
        let phone = phone.as_ref().trim();
        let valid_length = (Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&phone.len());

        if valid_length && phone.chars().all(|c| c.is_ascii_digit()) {
            Ok(Self(phone.to_string()))
        } else {
            Err(PhoneNumberError::InvalidFormat)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// First name or last name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonName(String);

impl PersonName {
    const MIN_LENGTH: usize = 2;
    const MAX_LENGTH: usize = 50;

    /// Create a trimmed name; `field` names the input in error messages.
    pub fn new(name: impl AsRef<str>, field: &'static str) -> Result<Self, PersonNameError> {
        let name = name.as_ref().trim();
        let length = name.chars().count();

        if length < Self::MIN_LENGTH {
            Err(PersonNameError::TooShort {
                field,
                min: Self::MIN_LENGTH,
                actual: length,
            })
        } else if length > Self::MAX_LENGTH {
            Err(PersonNameError::TooLong {
                field,
                max: Self::MAX_LENGTH,
                actual: length,
            })
        } else {
            Ok(Self(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Plaintext password that passed the strength policy.
///
/// Never printed; `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    const MIN_LENGTH: usize = 8;
    const SYMBOLS: &'static str = "!@#$%^&*(),.?\":{}|<>-";

    /// Check a candidate password against the strength policy.
    ///
    /// # Errors
    /// The first failed rule, in order: length, uppercase, lowercase, digit,
    /// symbol, sequential digits.
    pub fn new(password: impl Into<String>) -> Result<Self, PasswordStrengthError> {
        let password = password.into();

        if password.chars().count() < Self::MIN_LENGTH {
            return Err(PasswordStrengthError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }
        if !password.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(PasswordStrengthError::MissingUppercase);
        }
        if !password.chars().any(|c| c.is_ascii_lowercase()) {
            return Err(PasswordStrengthError::MissingLowercase);
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(PasswordStrengthError::MissingDigit);
        }
        if !password.chars().any(|c| Self::SYMBOLS.contains(c)) {
            return Err(PasswordStrengthError::MissingSymbol);
        }
        if Self::has_sequential_digits(&password) {
            return Err(PasswordStrengthError::SequentialDigits);
        }

        Ok(Self(password))
    }

    /// Three adjacent digits stepping by +1 or -1 ("123", "987").
    fn has_sequential_digits(password: &str) -> bool {
        let chars: Vec<char> = password.chars().collect();

        chars.windows(3).any(|window| {
            let digits: Option<Vec<i32>> = window
                .iter()
                .map(|c| c.to_digit(10).map(|d| d as i32))
                .collect();

            match digits.as_deref() {
                Some([a, b, c]) => {
                    let (first, second) = (b - a, c - b);
                    first == second && first.abs() == 1
                }
                _ => false,
            }
        })
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_accepts_allowed_characters() {
        assert_eq!(Username::new("john_doe-1").unwrap().as_str(), "john_doe-1");
        assert_eq!(Username::new("  j.doe  ").unwrap().as_str(), "j.doe");
        assert!(Username::new("abc").is_ok());
        assert!(Username::new("a".repeat(20)).is_ok());
    }

    #[test]
    fn test_username_rejects_bad_input() {
        assert_eq!(
            Username::new("jo"),
            Err(UsernameError::TooShort { min: 3, actual: 2 })
        );
        assert_eq!(
            Username::new("a".repeat(21)),
            Err(UsernameError::TooLong {
                max: 20,
                actual: 21
            })
        );
        assert_eq!(
            Username::new("john doe"),
            Err(UsernameError::InvalidCharacters)
        );
        assert_eq!(
            Username::new("john@doe.com"),
            Err(UsernameError::InvalidCharacters)
        );
        assert_eq!(Username::new("jöhn"), Err(UsernameError::InvalidCharacters));
    }

    #[test]
    fn test_email_is_normalized() {
        let email = EmailAddress::new("  John.Doe@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "john.doe@example.com");
    }

    #[test]
    fn test_email_rejects_bad_shapes() {
        for raw in [
            "john_doe",
            "john@",
            "@example.com",
            "john@example",
            "john@.com",
            "john@example.",
            "john doe@example.com",
            "john@@example.com",
            "",
        ] {
            assert!(EmailAddress::new(raw).is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn test_phone_number() {
        assert_eq!(PhoneNumber::new(" 600123456 ").unwrap().as_str(), "600123456");
        assert!(PhoneNumber::new("123456").is_ok());
        assert!(PhoneNumber::new("123456789012345").is_ok());
        assert!(PhoneNumber::new("12345").is_err());
        assert!(PhoneNumber::new("1234567890123456").is_err());
        assert!(PhoneNumber::new("+34600123456").is_err());
        assert!(PhoneNumber::new("600 123 456").is_err());
    }

    #[test]
    fn test_person_name() {
        assert_eq!(PersonName::new("  Juan ", "name").unwrap().as_str(), "Juan");
        assert!(matches!(
            PersonName::new(" J ", "name"),
            Err(PersonNameError::TooShort { field: "name", .. })
        ));
        assert!(PersonName::new("x".repeat(51), "lastname").is_err());
    }

    #[test]
    fn test_password_strength_accepts_strong_password() {
        assert!(Password::new("Abcdef1!").is_ok());
        assert!(Password::new("Abc135xy!").is_ok());
        assert!(Password::new("Abc1-2-3x").is_ok());
    }

    #[test]
    fn test_password_strength_rules() {
        assert_eq!(
            Password::new("Ab1!"),
            Err(PasswordStrengthError::TooShort { min: 8 })
        );
        assert_eq!(
            Password::new("abcdefgh"),
            Err(PasswordStrengthError::MissingUppercase)
        );
        assert_eq!(
            Password::new("ABCDEFG1!"),
            Err(PasswordStrengthError::MissingLowercase)
        );
        assert_eq!(
            Password::new("Abcdefgh!"),
            Err(PasswordStrengthError::MissingDigit)
        );
        assert_eq!(
            Password::new("Abcdefg1"),
            Err(PasswordStrengthError::MissingSymbol)
        );
    }

    #[test]
    fn test_password_rejects_sequential_digit_runs() {
        assert_eq!(
            Password::new("Abc12312!"),
            Err(PasswordStrengthError::SequentialDigits)
        );
        assert_eq!(
            Password::new("Abc98712!"),
            Err(PasswordStrengthError::SequentialDigits)
        );
        assert_eq!(
            Password::new("x!A7890y"),
            Err(PasswordStrengthError::SequentialDigits)
        );
        assert!(Password::new("Abc1357!").is_ok());
        assert!(Password::new("Abc1211!").is_ok());
    }

    #[test]
    fn test_password_debug_is_redacted() {
        let password = Password::new("Abcdef1!").unwrap();
        assert_eq!(format!("{password:?}"), "Password(***)");
    }

    #[test]
    fn test_role_name_round_trip() {
        for role in RoleName::ALL {
            assert_eq!(role.as_str().parse::<RoleName>(), Ok(role));
        }
        assert!("root".parse::<RoleName>().is_err());
    }
}
