use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::models::AuthenticatedIdentity;
use crate::domain::auth::models::LoginCommand;
use crate::domain::auth::models::LoginOutcome;
use crate::domain::auth::models::LogoutOutcome;
use crate::domain::auth::models::RegisterCommand;
use crate::domain::identity::models::EmailAddress;
use crate::domain::identity::models::Identity;
use crate::domain::identity::models::IdentityId;
use crate::domain::identity::models::NewIdentity;
use crate::domain::identity::models::PhoneNumber;
use crate::domain::identity::models::Role;
use crate::domain::identity::models::RoleName;
use crate::domain::identity::models::Username;
use crate::domain::session::models::NewSession;
use crate::domain::session::models::Session;

/// Port for the register/login/logout flows.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Register a new identity with the default role.
    ///
    /// # Errors
    /// * `EmailAlreadyRegistered` / `UsernameAlreadyRegistered` / `PhoneAlreadyRegistered`
    /// * `Credential` - Password hashing failed
    /// * `DatabaseError` - Database operation failed
    async fn register(&self, command: RegisterCommand) -> Result<Identity, AuthError>;

    /// Verify credentials, open the single allowed session and mint an access token.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown identity or wrong password (indistinguishable)
    /// * `ActiveSessionExists` - The identity already has an active session
    /// * `Credential` - Token signing failed
    /// * `DatabaseError` - Database operation failed
    async fn login(&self, command: LoginCommand) -> Result<LoginOutcome, AuthError>;

    /// Revoke the session behind the bearer token, if any.
    ///
    /// Infallible from the caller's point of view: missing, invalid or expired
    /// tokens and ledger failures all still report success.
    async fn logout(&self, authorization: Option<&str>) -> LogoutOutcome;

    /// Resolve a bearer token into its identity, requiring an active session.
    ///
    /// # Errors
    /// * `InvalidToken` - Token does not verify or its session is revoked/expired
    /// * `DatabaseError` - Database operation failed
    async fn authenticate(&self, token: &str) -> Result<AuthenticatedIdentity, AuthError>;
}

/// Persistence operations for identities, roles and sessions.
#[async_trait]
pub trait AuthRepository: Send + Sync + 'static {
    /// Retrieve identity (with role) by identifier.
    async fn find_identity_by_id(&self, id: IdentityId) -> Result<Option<Identity>, AuthError>;

    /// Retrieve identity (with role) by normalized email.
    async fn find_identity_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<Identity>, AuthError>;

    /// Retrieve identity (with role) by username.
    async fn find_identity_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<Identity>, AuthError>;

    async fn email_exists(&self, email: &EmailAddress) -> Result<bool, AuthError>;

    async fn username_exists(&self, username: &Username) -> Result<bool, AuthError>;

    async fn phone_exists(&self, phone: &PhoneNumber) -> Result<bool, AuthError>;

    /// Persist a new identity.
    ///
    /// # Errors
    /// * `EmailAlreadyRegistered` / `UsernameAlreadyRegistered` / `PhoneAlreadyRegistered` -
    ///   Unique constraint hit
    /// * `DatabaseError` - Database operation failed
    async fn create_identity(&self, identity: NewIdentity) -> Result<Identity, AuthError>;

    async fn find_role_by_name(&self, name: RoleName) -> Result<Option<Role>, AuthError>;

    /// Insert the role or refresh its description.
    async fn upsert_role(&self, name: RoleName, description: &str) -> Result<Role, AuthError>;

    /// Newest session of the identity that is unrevoked and expires after `now`.
    async fn find_active_session(
        &self,
        identity_id: IdentityId,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, AuthError>;

    async fn find_session_by_jti(&self, jti: &str) -> Result<Option<Session>, AuthError>;

    /// Insert a session iff the identity has no active session at `now`.
    ///
    /// The check and the insert are one atomic step; `created_at` is stamped
    /// by the store inside that step.
    ///
    /// # Errors
    /// * `NotFound` - Identity does not exist
    /// * `ActiveSessionExists` - Identity already has an active session
    /// * `DatabaseError` - Database operation failed
    async fn create_session(
        &self,
        session: NewSession,
        now: DateTime<Utc>,
    ) -> Result<Session, AuthError>;

    /// Stamp `revoked_at` on the session if it is not revoked yet.
    ///
    /// # Returns
    /// The session as stored after the call, `None` if no session has this jti
    async fn revoke_session(
        &self,
        jti: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<Option<Session>, AuthError>;
}
