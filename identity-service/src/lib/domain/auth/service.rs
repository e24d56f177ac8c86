use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::models::bearer_token;
use crate::domain::auth::models::AccessClaims;
use crate::domain::auth::models::AuthenticatedIdentity;
use crate::domain::auth::models::LoginCommand;
use crate::domain::auth::models::LoginIdentifier;
use crate::domain::auth::models::LoginOutcome;
use crate::domain::auth::models::LogoutOutcome;
use crate::domain::auth::models::RegisterCommand;
use crate::domain::auth::ports::AuthRepository;
use crate::domain::auth::ports::AuthServicePort;
use crate::domain::identity::models::Identity;
use crate::domain::identity::models::IdentityId;
use crate::domain::identity::models::NewIdentity;
use crate::domain::identity::models::RoleName;
use crate::domain::session::ledger::SessionLedger;

/// Domain service implementation for the credential and session flows.
///
/// Concrete implementation of AuthServicePort with dependency injection.
pub struct AuthService<R>
where
    R: AuthRepository,
{
    repository: Arc<R>,
    authenticator: Arc<auth::Authenticator>,
    sessions: SessionLedger<R>,
}

impl<R> AuthService<R>
where
    R: AuthRepository,
{
    /// Create a new auth service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - Identity, role and session persistence
    /// * `authenticator` - Password hashing and token signing
    pub fn new(repository: Arc<R>, authenticator: Arc<auth::Authenticator>) -> Self {
        Self {
            sessions: SessionLedger::new(Arc::clone(&repository)),
            repository,
            authenticator,
        }
    }

    async fn find_identity(
        &self,
        identifier: &LoginIdentifier,
    ) -> Result<Option<Identity>, AuthError> {
        match identifier {
            LoginIdentifier::Email(email) => self.repository.find_identity_by_email(email).await,
            LoginIdentifier::Username(username) => {
                self.repository.find_identity_by_username(username).await
            }
        }
    }

    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let authenticator = Arc::clone(&self.authenticator);
        tokio::task::spawn_blocking(move || authenticator.hash_password(&password))
            .await
            .map_err(|e| AuthError::Credential(format!("Hashing task failed: {}", e)))?
            .map_err(AuthError::from)
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool, AuthError> {
        let authenticator = Arc::clone(&self.authenticator);
        tokio::task::spawn_blocking(move || authenticator.verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::Credential(format!("Verification task failed: {}", e)))
    }
}

#[async_trait]
impl<R> AuthServicePort for AuthService<R>
where
    R: AuthRepository,
{
    async fn register(&self, command: RegisterCommand) -> Result<Identity, AuthError> {
        if self.repository.email_exists(&command.email).await? {
            return Err(AuthError::EmailAlreadyRegistered);
        }

        if self.repository.username_exists(&command.username).await? {
            return Err(AuthError::UsernameAlreadyRegistered);
        }

        if let Some(phone) = &command.phone {
            if self.repository.phone_exists(phone).await? {
                return Err(AuthError::PhoneAlreadyRegistered);
            }
        }

        let role_id = match self.repository.find_role_by_name(RoleName::Member).await? {
            Some(role) => Some(role.id),
            None => {
                tracing::warn!(
                    role = RoleName::Member.as_str(),
                    "Default role missing, registering without role"
                );
                None
            }
        };

        let password_hash = self
            .hash_password(command.password.expose().to_string())
            .await?;

        let identity = self
            .repository
            .create_identity(NewIdentity {
                name: command.name,
                lastname: command.lastname,
                username: command.username,
                email: command.email,
                phone: command.phone,
                password_hash,
                role_id,
            })
            .await?;

        tracing::info!(
            identity_id = %identity.id,
            username = %identity.username,
            "Identity registered"
        );

        Ok(identity)
    }

    async fn login(&self, command: LoginCommand) -> Result<LoginOutcome, AuthError> {
        let LoginCommand {
            identifier,
            password,
        } = command;

        let Some(identity) = self.find_identity(&identifier).await? else {
            tracing::warn!(identifier = ?identifier, "Login failed: unknown identity");
            return Err(AuthError::InvalidCredentials);
        };

        if !self
            .verify_password(password, identity.password_hash.clone())
            .await?
        {
            tracing::warn!(identity_id = %identity.id, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        if self.sessions.find_active_session(identity.id).await?.is_some() {
            tracing::warn!(identity_id = %identity.id, "Login rejected: session already active");
            return Err(AuthError::ActiveSessionExists);
        }

        let issued = self
            .authenticator
            .issue_access_token(identity.id, AccessClaims::from(&identity))?;

        match self
            .sessions
            .create_session(identity.id, &issued.jti, issued.expires_at)
            .await
        {
            Ok(_) => {}
            Err(AuthError::ActiveSessionExists) => {
                tracing::warn!(
                    identity_id = %identity.id,
                    "Login rejected: concurrent login opened a session first"
                );
                return Err(AuthError::ActiveSessionExists);
            }
            Err(e) => {
                tracing::error!(
                    identity_id = %identity.id,
                    error = %e,
                    "Failed to record session, returning token anyway"
                );
            }
        }

        tracing::info!(identity_id = %identity.id, "Login succeeded");

        Ok(LoginOutcome {
            user_id: identity.id,
            role_id: identity.role_id(),
            access_token: issued.token,
        })
    }

    async fn logout(&self, authorization: Option<&str>) -> LogoutOutcome {
        let revoked = |session_revoked| LogoutOutcome {
            success: true,
            session_revoked,
        };

        let Some(token) = bearer_token(authorization) else {
            tracing::debug!("Logout without bearer token");
            return revoked(false);
        };

        let Some(claims) = self.authenticator.validate_token::<AccessClaims>(token) else {
            tracing::debug!("Logout with invalid or expired token");
            return revoked(false);
        };

        match self.sessions.revoke_by_session_token(&claims.jti).await {
            Ok(found) => revoked(found),
            Err(e) => {
                tracing::error!(subject = %claims.sub, error = %e, "Failed to revoke session");
                revoked(false)
            }
        }
    }

    async fn authenticate(&self, token: &str) -> Result<AuthenticatedIdentity, AuthError> {
        let claims = self
            .authenticator
            .validate_token::<AccessClaims>(token)
            .ok_or(AuthError::InvalidToken)?;

        let identity_id = IdentityId::from_string(&claims.sub).ok_or(AuthError::InvalidToken)?;

        let session = self
            .sessions
            .find_by_session_token(&claims.jti)
            .await?
            .filter(|session| session.identity_id == identity_id)
            .filter(|session| session.is_active(Utc::now()))
            .ok_or_else(|| {
                tracing::warn!(identity_id = %identity_id, "Token session is revoked or expired");
                AuthError::InvalidToken
            })?;

        Ok(AuthenticatedIdentity {
            identity_id,
            username: claims.custom.username,
            email: claims.custom.email,
            role_id: claims.custom.role_id,
            role_name: claims.custom.role_name,
            jti: claims.jti,
            session_expires_at: session.expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use chrono::Duration;
    use mockall::mock;

    use super::*;
    use crate::domain::identity::models::EmailAddress;
    use crate::domain::identity::models::PersonName;
    use crate::domain::identity::models::PhoneNumber;
    use crate::domain::identity::models::Role;
    use crate::domain::identity::models::RoleId;
    use crate::domain::identity::models::Username;
    use crate::domain::session::models::NewSession;
    use crate::domain::session::models::Session;
    use crate::domain::session::models::SessionId;
    use crate::outbound::repositories::memory::InMemoryAuthRepository;

    mock! {
        pub TestAuthRepository {}

        #[async_trait]
        impl AuthRepository for TestAuthRepository {
            async fn find_identity_by_id(&self, id: IdentityId) -> Result<Option<Identity>, AuthError>;
            async fn find_identity_by_email(&self, email: &EmailAddress) -> Result<Option<Identity>, AuthError>;
            async fn find_identity_by_username(&self, username: &Username) -> Result<Option<Identity>, AuthError>;
            async fn email_exists(&self, email: &EmailAddress) -> Result<bool, AuthError>;
            async fn username_exists(&self, username: &Username) -> Result<bool, AuthError>;
            async fn phone_exists(&self, phone: &PhoneNumber) -> Result<bool, AuthError>;
            async fn create_identity(&self, identity: NewIdentity) -> Result<Identity, AuthError>;
            async fn find_role_by_name(&self, name: RoleName) -> Result<Option<Role>, AuthError>;
            async fn upsert_role(&self, name: RoleName, description: &str) -> Result<Role, AuthError>;
            async fn find_active_session(&self, identity_id: IdentityId, now: DateTime<Utc>) -> Result<Option<Session>, AuthError>;
            async fn find_session_by_jti(&self, jti: &str) -> Result<Option<Session>, AuthError>;
            async fn create_session(&self, session: NewSession, now: DateTime<Utc>) -> Result<Session, AuthError>;
            async fn revoke_session(&self, jti: &str, revoked_at: DateTime<Utc>) -> Result<Option<Session>, AuthError>;
        }
    }

    const PASSWORD: &str = "MiPassw0rd!";

    fn authenticator() -> Arc<auth::Authenticator> {
        let settings = auth::JwtSettings::new(
            "test_secret_key_at_least_32_bytes_long",
            "identity-service",
            "identity-clients",
        );
        Arc::new(auth::Authenticator::new(&settings).unwrap())
    }

    fn member_role() -> Role {
        Role {
            id: RoleId(3),
            name: RoleName::Member,
        }
    }

    fn register_command() -> RegisterCommand {
        RegisterCommand::parse(
            Some("Juan"),
            Some("Perez"),
            Some("juanperez"),
            Some("juan@example.com"),
            Some("600123456"),
            Some(PASSWORD),
        )
        .unwrap()
    }

    fn stored_identity(password_hash: String) -> Identity {
        let now = Utc::now();
        Identity {
            id: IdentityId(7),
            name: PersonName::new("Juan", "name").unwrap(),
            lastname: PersonName::new("Perez", "lastname").unwrap(),
            username: Username::new("juanperez").unwrap(),
            email: EmailAddress::new("juan@example.com").unwrap(),
            phone: None,
            password_hash,
            role: Some(member_role()),
            created_at: now,
            updated_at: now,
        }
    }

    fn session_for(new_session: &NewSession) -> Session {
        Session {
            id: SessionId(1),
            identity_id: new_session.identity_id,
            jti: new_session.jti.clone(),
            created_at: Utc::now(),
            expires_at: new_session.expires_at,
            revoked_at: None,
        }
    }

    fn login_command() -> LoginCommand {
        LoginCommand::resolve(Some("juan@example.com"), None, Some(PASSWORD)).unwrap()
    }

    fn expect_registration_lookups(repository: &mut MockTestAuthRepository) {
        repository
            .expect_email_exists()
            .times(1)
            .returning(|_| Ok(false));
        repository
            .expect_username_exists()
            .times(1)
            .returning(|_| Ok(false));
        repository
            .expect_phone_exists()
            .times(1)
            .returning(|_| Ok(false));
    }

    #[tokio::test]
    async fn test_register_success() {
        let mut repository = MockTestAuthRepository::new();
        expect_registration_lookups(&mut repository);

        repository
            .expect_find_role_by_name()
            .withf(|name| *name == RoleName::Member)
            .times(1)
            .returning(|_| Ok(Some(member_role())));

        repository
            .expect_create_identity()
            .withf(|identity| {
                identity.username.as_str() == "juanperez"
                    && identity.role_id == Some(RoleId(3))
                    && identity.password_hash.starts_with("$argon2")
            })
            .times(1)
            .returning(|new_identity| {
                let now = Utc::now();
                Ok(Identity {
                    id: IdentityId(1),
                    name: new_identity.name,
                    lastname: new_identity.lastname,
                    username: new_identity.username,
                    email: new_identity.email,
                    phone: new_identity.phone,
                    password_hash: new_identity.password_hash,
                    role: Some(member_role()),
                    created_at: now,
                    updated_at: now,
                })
            });

        let service = AuthService::new(Arc::new(repository), authenticator());

        let identity = service.register(register_command()).await.unwrap();
        assert_eq!(identity.id, IdentityId(1));
        assert_eq!(identity.phone.unwrap().as_str(), "600123456");
        assert_ne!(identity.password_hash, PASSWORD);
    }

    #[tokio::test]
    async fn test_register_without_member_role() {
        let mut repository = MockTestAuthRepository::new();
        expect_registration_lookups(&mut repository);

        repository
            .expect_find_role_by_name()
            .times(1)
            .returning(|_| Ok(None));

        repository
            .expect_create_identity()
            .withf(|identity| identity.role_id.is_none())
            .times(1)
            .returning(|new_identity| {
                let now = Utc::now();
                Ok(Identity {
                    id: IdentityId(1),
                    name: new_identity.name,
                    lastname: new_identity.lastname,
                    username: new_identity.username,
                    email: new_identity.email,
                    phone: new_identity.phone,
                    password_hash: new_identity.password_hash,
                    role: None,
                    created_at: now,
                    updated_at: now,
                })
            });

        let service = AuthService::new(Arc::new(repository), authenticator());

        let identity = service.register(register_command()).await.unwrap();
        assert!(identity.role.is_none());
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let mut repository = MockTestAuthRepository::new();

        repository
            .expect_email_exists()
            .times(1)
            .returning(|_| Ok(true));
        repository.expect_username_exists().times(0);
        repository.expect_create_identity().times(0);

        let service = AuthService::new(Arc::new(repository), authenticator());

        let result = service.register(register_command()).await;
        assert!(matches!(result, Err(AuthError::EmailAlreadyRegistered)));
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let mut repository = MockTestAuthRepository::new();

        repository
            .expect_email_exists()
            .times(1)
            .returning(|_| Ok(false));
        repository
            .expect_username_exists()
            .times(1)
            .returning(|_| Ok(true));
        repository.expect_create_identity().times(0);

        let service = AuthService::new(Arc::new(repository), authenticator());

        let result = service.register(register_command()).await;
        let err = result.unwrap_err();
        assert!(matches!(err, AuthError::UsernameAlreadyRegistered));
        assert_eq!(err.to_string(), "Username is already registered");
    }

    #[tokio::test]
    async fn test_register_duplicate_phone() {
        let mut repository = MockTestAuthRepository::new();

        repository
            .expect_email_exists()
            .times(1)
            .returning(|_| Ok(false));
        repository
            .expect_username_exists()
            .times(1)
            .returning(|_| Ok(false));
        repository
            .expect_phone_exists()
            .times(1)
            .returning(|_| Ok(true));
        repository.expect_create_identity().times(0);

        let service = AuthService::new(Arc::new(repository), authenticator());

        let result = service.register(register_command()).await;
        assert!(matches!(result, Err(AuthError::PhoneAlreadyRegistered)));
    }

    #[tokio::test]
    async fn test_login_success_opens_session() {
        let authenticator = authenticator();
        let hash = authenticator.hash_password(PASSWORD).unwrap();
        let identity = stored_identity(hash);

        let mut repository = MockTestAuthRepository::new();
        let returned = identity.clone();
        repository
            .expect_find_identity_by_email()
            .withf(|email| email.as_str() == "juan@example.com")
            .times(1)
            .returning(move |_| Ok(Some(returned.clone())));
        repository
            .expect_find_active_session()
            .times(1)
            .returning(|_, _| Ok(None));
        repository
            .expect_create_session()
            .withf(|session, _| session.identity_id == IdentityId(7) && !session.jti.is_empty())
            .times(1)
            .returning(|session, _| Ok(session_for(&session)));

        let service = AuthService::new(Arc::new(repository), Arc::clone(&authenticator));

        let outcome = service.login(login_command()).await.unwrap();
        assert_eq!(outcome.user_id, IdentityId(7));
        assert_eq!(outcome.role_id, Some(RoleId(3)));

        let claims = authenticator
            .validate_token::<AccessClaims>(&outcome.access_token)
            .unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.custom.username, "juanperez");
        assert_eq!(claims.custom.role_name.as_deref(), Some("member"));
    }

    #[tokio::test]
    async fn test_login_unknown_and_wrong_password_are_indistinguishable() {
        let authenticator = authenticator();
        let hash = authenticator.hash_password(PASSWORD).unwrap();
        let identity = stored_identity(hash);

        let mut unknown_repository = MockTestAuthRepository::new();
        unknown_repository
            .expect_find_identity_by_email()
            .times(1)
            .returning(|_| Ok(None));
        unknown_repository.expect_create_session().times(0);

        let mut known_repository = MockTestAuthRepository::new();
        known_repository
            .expect_find_identity_by_email()
            .times(1)
            .returning(move |_| Ok(Some(identity.clone())));
        known_repository.expect_create_session().times(0);

        let unknown = AuthService::new(Arc::new(unknown_repository), Arc::clone(&authenticator))
            .login(login_command())
            .await
            .unwrap_err();

        let wrong_password =
            LoginCommand::resolve(Some("juan@example.com"), None, Some("Wr0ngPass!")).unwrap();
        let wrong = AuthService::new(Arc::new(known_repository), authenticator)
            .login(wrong_password)
            .await
            .unwrap_err();

        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(unknown.kind(), wrong.kind());
    }

    #[tokio::test]
    async fn test_login_by_username() {
        let authenticator = authenticator();
        let hash = authenticator.hash_password(PASSWORD).unwrap();
        let identity = stored_identity(hash);

        let mut repository = MockTestAuthRepository::new();
        repository.expect_find_identity_by_email().times(0);
        repository
            .expect_find_identity_by_username()
            .withf(|username| username.as_str() == "juanperez")
            .times(1)
            .returning(move |_| Ok(Some(identity.clone())));
        repository
            .expect_find_active_session()
            .returning(|_, _| Ok(None));
        repository
            .expect_create_session()
            .returning(|session, _| Ok(session_for(&session)));

        let service = AuthService::new(Arc::new(repository), authenticator);

        // Username sent in the email field falls back to the username lookup.
        let command = LoginCommand::resolve(Some("juanperez"), None, Some(PASSWORD)).unwrap();
        assert!(service.login(command).await.is_ok());
    }

    #[tokio::test]
    async fn test_login_rejected_with_active_session() {
        let authenticator = authenticator();
        let hash = authenticator.hash_password(PASSWORD).unwrap();
        let identity = stored_identity(hash);

        let mut repository = MockTestAuthRepository::new();
        repository
            .expect_find_identity_by_email()
            .returning(move |_| Ok(Some(identity.clone())));
        repository
            .expect_find_active_session()
            .times(1)
            .returning(|identity_id, _| {
                Ok(Some(session_for(&NewSession {
                    identity_id,
                    jti: "existing".to_string(),
                    expires_at: Utc::now() + Duration::minutes(30),
                })))
            });
        repository.expect_create_session().times(0);

        let service = AuthService::new(Arc::new(repository), authenticator);

        let result = service.login(login_command()).await;
        assert!(matches!(result, Err(AuthError::ActiveSessionExists)));
    }

    #[tokio::test]
    async fn test_login_lost_race_is_conflict() {
        let authenticator = authenticator();
        let hash = authenticator.hash_password(PASSWORD).unwrap();
        let identity = stored_identity(hash);

        let mut repository = MockTestAuthRepository::new();
        repository
            .expect_find_identity_by_email()
            .returning(move |_| Ok(Some(identity.clone())));
        repository
            .expect_find_active_session()
            .returning(|_, _| Ok(None));
        repository
            .expect_create_session()
            .times(1)
            .returning(|_, _| Err(AuthError::ActiveSessionExists));

        let service = AuthService::new(Arc::new(repository), authenticator);

        let result = service.login(login_command()).await;
        assert!(matches!(result, Err(AuthError::ActiveSessionExists)));
    }

    #[tokio::test]
    async fn test_login_session_store_failure_still_returns_token() {
        let authenticator = authenticator();
        let hash = authenticator.hash_password(PASSWORD).unwrap();
        let identity = stored_identity(hash);

        let mut repository = MockTestAuthRepository::new();
        repository
            .expect_find_identity_by_email()
            .returning(move |_| Ok(Some(identity.clone())));
        repository
            .expect_find_active_session()
            .returning(|_, _| Ok(None));
        repository
            .expect_create_session()
            .times(1)
            .returning(|_, _| Err(AuthError::DatabaseError("connection reset".to_string())));

        let service = AuthService::new(Arc::new(repository), authenticator);

        let outcome = service.login(login_command()).await.unwrap();
        assert!(!outcome.access_token.is_empty());
    }

    #[tokio::test]
    async fn test_logout_without_token_succeeds() {
        let mut repository = MockTestAuthRepository::new();
        repository.expect_revoke_session().times(0);

        let service = AuthService::new(Arc::new(repository), authenticator());

        for header in [None, Some("Basic abc"), Some("Bearer "), Some("Bearer not-a-jwt")] {
            let outcome = service.logout(header).await;
            assert!(outcome.success);
            assert!(!outcome.session_revoked);
        }
    }

    #[tokio::test]
    async fn test_logout_revokes_session_by_jti() {
        let authenticator = authenticator();
        let identity = stored_identity("$argon2id$unused".to_string());
        let issued = authenticator
            .issue_access_token(identity.id, AccessClaims::from(&identity))
            .unwrap();
        let jti = issued.jti.clone();

        let mut repository = MockTestAuthRepository::new();
        repository
            .expect_revoke_session()
            .withf(move |candidate, _| candidate == jti)
            .times(1)
            .returning(|jti, revoked_at| {
                Ok(Some(Session {
                    id: SessionId(1),
                    identity_id: IdentityId(7),
                    jti: jti.to_string(),
                    created_at: revoked_at,
                    expires_at: revoked_at + Duration::minutes(60),
                    revoked_at: Some(revoked_at),
                }))
            });

        let service = AuthService::new(Arc::new(repository), authenticator);

        let header = format!("Bearer {}", issued.token);
        let outcome = service.logout(Some(&header)).await;
        assert!(outcome.success);
        assert!(outcome.session_revoked);
    }

    #[tokio::test]
    async fn test_logout_store_failure_still_succeeds() {
        let authenticator = authenticator();
        let identity = stored_identity("$argon2id$unused".to_string());
        let issued = authenticator
            .issue_access_token(identity.id, AccessClaims::from(&identity))
            .unwrap();

        let mut repository = MockTestAuthRepository::new();
        repository
            .expect_revoke_session()
            .times(1)
            .returning(|_, _| Err(AuthError::DatabaseError("down".to_string())));

        let service = AuthService::new(Arc::new(repository), authenticator);

        let header = format!("Bearer {}", issued.token);
        let outcome = service.logout(Some(&header)).await;
        assert!(outcome.success);
        assert!(!outcome.session_revoked);
    }

    #[tokio::test]
    async fn test_authenticate_requires_active_session() {
        let authenticator = authenticator();
        let identity = stored_identity("$argon2id$unused".to_string());
        let issued = authenticator
            .issue_access_token(identity.id, AccessClaims::from(&identity))
            .unwrap();
        let expires_at = issued.expires_at;

        let mut repository = MockTestAuthRepository::new();
        let mut revoked = false;
        repository
            .expect_find_session_by_jti()
            .times(2)
            .returning(move |jti| {
                let now = Utc::now();
                let session = Session {
                    id: SessionId(1),
                    identity_id: IdentityId(7),
                    jti: jti.to_string(),
                    created_at: now,
                    expires_at,
                    revoked_at: revoked.then_some(now),
                };
                revoked = true;
                Ok(Some(session))
            });

        let service = AuthService::new(Arc::new(repository), authenticator);

        let authenticated = service.authenticate(&issued.token).await.unwrap();
        assert_eq!(authenticated.identity_id, IdentityId(7));
        assert_eq!(authenticated.username, "juanperez");
        assert_eq!(authenticated.jti, issued.jti);
        assert_eq!(authenticated.session_expires_at, expires_at);

        let result = service.authenticate(&issued.token).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_authenticate_rejects_invalid_token() {
        let mut repository = MockTestAuthRepository::new();
        repository.expect_find_session_by_jti().times(0);

        let service = AuthService::new(Arc::new(repository), authenticator());

        let result = service.authenticate("not.a.jwt").await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_concurrent_logins_open_exactly_one_session() {
        let repository = Arc::new(InMemoryAuthRepository::new());
        let service = Arc::new(AuthService::new(Arc::clone(&repository), authenticator()));

        let identity = service.register(register_command()).await.unwrap();

        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.login(login_command()).await })
            })
            .collect();

        let mut succeeded = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(e) => assert!(matches!(e, AuthError::ActiveSessionExists)),
            }
        }

        assert_eq!(succeeded, 1);
        assert_eq!(repository.session_count(identity.id).await, 1);
    }

    #[tokio::test]
    async fn test_full_lifecycle_against_memory_store() {
        let repository = Arc::new(InMemoryAuthRepository::new());
        let service = AuthService::new(Arc::clone(&repository), authenticator());

        service.register(register_command()).await.unwrap();

        let first = service.login(login_command()).await.unwrap();
        let second = service.login(login_command()).await;
        assert!(matches!(second, Err(AuthError::ActiveSessionExists)));

        let header = format!("Bearer {}", first.access_token);
        assert!(service.logout(Some(&header)).await.session_revoked);
        assert!(service.logout(Some(&header)).await.success);
        assert!(matches!(
            service.authenticate(&first.access_token).await,
            Err(AuthError::InvalidToken)
        ));

        let again = service.login(login_command()).await.unwrap();
        assert!(service.authenticate(&again.access_token).await.is_ok());
        assert_eq!(repository.session_count(first.user_id).await, 2);
    }
}
