//! Credential primitives for the identity service
//!
//! - Password hashing (Argon2id, PHC strings)
//! - Signed, time-bounded tokens with a unique `jti` per token
//! - The [`Authenticator`] facade combining both
//!
//! The service defines its own claim payloads and persistence; this crate only
//! knows how to hash, sign and verify.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("Abcdef1!").unwrap();
//! assert!(hasher.verify("Abcdef1!", &hash));
//! assert!(!hasher.verify("abcdef1!", &hash));
//! ```
//!
//! ## Tokens
//! ```
//! use auth::{Claims, JwtSettings, TokenIssuer};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Profile {
//!     username: String,
//! }
//!
//! let settings = JwtSettings::new("secret_key_at_least_32_bytes_long!", "api", "client");
//! let issuer = TokenIssuer::new(&settings).unwrap();
//!
//! let issued = issuer
//!     .issue(42, Profile { username: "alice".to_string() }, 30)
//!     .unwrap();
//! let claims: Claims<Profile> = issuer.verify(&issued.token).unwrap();
//! assert_eq!(claims.jti, issued.jti);
//! assert_eq!(claims.exp - claims.iat, 30 * 60);
//! ```

pub mod authenticator;
pub mod jwt;
pub mod password;

pub use authenticator::Authenticator;
pub use jwt::Claims;
pub use jwt::IssuedToken;
pub use jwt::JwtError;
pub use jwt::JwtSettings;
pub use jwt::TokenIssuer;
pub use password::PasswordError;
pub use password::PasswordHasher;
