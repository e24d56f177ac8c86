use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::ports::AuthRepository;
use crate::domain::identity::models::EmailAddress;
use crate::domain::identity::models::Identity;
use crate::domain::identity::models::IdentityId;
use crate::domain::identity::models::NewIdentity;
use crate::domain::identity::models::PhoneNumber;
use crate::domain::identity::models::Role;
use crate::domain::identity::models::RoleId;
use crate::domain::identity::models::RoleName;
use crate::domain::identity::models::Username;
use crate::domain::session::models::NewSession;
use crate::domain::session::models::Session;
use crate::domain::session::models::SessionId;

#[derive(Default)]
struct Store {
    identities: Vec<Identity>,
    roles: Vec<(Role, String)>,
    sessions: Vec<Session>,
    next_identity_id: i64,
    next_role_id: i64,
    next_session_id: i64,
}

impl Store {
    fn role(&self, id: RoleId) -> Option<Role> {
        self.roles
            .iter()
            .map(|(role, _)| *role)
            .find(|role| role.id == id)
    }

    fn has_active_session(&self, identity_id: IdentityId, now: DateTime<Utc>) -> bool {
        self.sessions
            .iter()
            .any(|session| session.identity_id == identity_id && session.is_active(now))
    }
}

/// Process-local [`AuthRepository`] for tests and database-less runs.
///
/// Every operation takes the store lock once, so `create_session` checks and
/// inserts under a single write guard.
#[derive(Default)]
pub struct InMemoryAuthRepository {
    store: RwLock<Store>,
}

impl InMemoryAuthRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of session rows ever recorded for the identity, revoked ones included.
    pub async fn session_count(&self, identity_id: IdentityId) -> usize {
        self.store
            .read()
            .await
            .sessions
            .iter()
            .filter(|session| session.identity_id == identity_id)
            .count()
    }
}

#[async_trait]
impl AuthRepository for InMemoryAuthRepository {
    async fn find_identity_by_id(&self, id: IdentityId) -> Result<Option<Identity>, AuthError> {
        let store = self.store.read().await;
        Ok(store.identities.iter().find(|i| i.id == id).cloned())
    }

    async fn find_identity_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<Identity>, AuthError> {
        let store = self.store.read().await;
        Ok(store.identities.iter().find(|i| &i.email == email).cloned())
    }

    async fn find_identity_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<Identity>, AuthError> {
        let store = self.store.read().await;
        Ok(store
            .identities
            .iter()
            .find(|i| &i.username == username)
            .cloned())
    }

    async fn email_exists(&self, email: &EmailAddress) -> Result<bool, AuthError> {
        let store = self.store.read().await;
        Ok(store.identities.iter().any(|i| &i.email == email))
    }

    async fn username_exists(&self, username: &Username) -> Result<bool, AuthError> {
        let store = self.store.read().await;
        Ok(store.identities.iter().any(|i| &i.username == username))
    }

    async fn phone_exists(&self, phone: &PhoneNumber) -> Result<bool, AuthError> {
        let store = self.store.read().await;
        Ok(store.identities.iter().any(|i| i.phone.as_ref() == Some(phone)))
    }

    async fn create_identity(&self, identity: NewIdentity) -> Result<Identity, AuthError> {
        let mut store = self.store.write().await;

        if store.identities.iter().any(|i| i.email == identity.email) {
            return Err(AuthError::EmailAlreadyRegistered);
        }
        if store.identities.iter().any(|i| i.username == identity.username) {
            return Err(AuthError::UsernameAlreadyRegistered);
        }
        if identity.phone.is_some()
            && store.identities.iter().any(|i| i.phone == identity.phone)
        {
            return Err(AuthError::PhoneAlreadyRegistered);
        }

        let role = match identity.role_id {
            Some(role_id) => Some(store.role(role_id).ok_or_else(|| {
                AuthError::DatabaseError(format!("role {} does not exist", role_id))
            })?),
            None => None,
        };

        store.next_identity_id += 1;
        let now = Utc::now();
        let created = Identity {
            id: IdentityId(store.next_identity_id),
            name: identity.name,
            lastname: identity.lastname,
            username: identity.username,
            email: identity.email,
            phone: identity.phone,
            password_hash: identity.password_hash,
            role,
            created_at: now,
            updated_at: now,
        };
        store.identities.push(created.clone());

        Ok(created)
    }

    async fn find_role_by_name(&self, name: RoleName) -> Result<Option<Role>, AuthError> {
        let store = self.store.read().await;
        Ok(store
            .roles
            .iter()
            .map(|(role, _)| *role)
            .find(|role| role.name == name))
    }

    async fn upsert_role(&self, name: RoleName, description: &str) -> Result<Role, AuthError> {
        let mut store = self.store.write().await;

        if let Some((role, stored_description)) =
            store.roles.iter_mut().find(|(role, _)| role.name == name)
        {
            *stored_description = description.to_string();
            return Ok(*role);
        }

        store.next_role_id += 1;
        let role = Role {
            id: RoleId(store.next_role_id),
            name,
        };
        store.roles.push((role, description.to_string()));

        Ok(role)
    }

    async fn find_active_session(
        &self,
        identity_id: IdentityId,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, AuthError> {
        let store = self.store.read().await;
        Ok(store
            .sessions
            .iter()
            .filter(|s| s.identity_id == identity_id && s.is_active(now))
            .max_by_key(|s| (s.created_at, s.id.0))
            .cloned())
    }

    async fn find_session_by_jti(&self, jti: &str) -> Result<Option<Session>, AuthError> {
        let store = self.store.read().await;
        Ok(store.sessions.iter().find(|s| s.jti == jti).cloned())
    }

    async fn create_session(
        &self,
        session: NewSession,
        now: DateTime<Utc>,
    ) -> Result<Session, AuthError> {
        let mut store = self.store.write().await;

        if !store.identities.iter().any(|i| i.id == session.identity_id) {
            return Err(AuthError::NotFound(format!(
                "identity {}",
                session.identity_id
            )));
        }
        if store.has_active_session(session.identity_id, now) {
            return Err(AuthError::ActiveSessionExists);
        }
        if store.sessions.iter().any(|s| s.jti == session.jti) {
            return Err(AuthError::DatabaseError(format!(
                "duplicate session jti {}",
                session.jti
            )));
        }

        store.next_session_id += 1;
        let created = Session {
            id: SessionId(store.next_session_id),
            identity_id: session.identity_id,
            jti: session.jti,
            created_at: Utc::now(),
            expires_at: session.expires_at,
            revoked_at: None,
        };
        store.sessions.push(created.clone());

        Ok(created)
    }

    async fn revoke_session(
        &self,
        jti: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<Option<Session>, AuthError> {
        let mut store = self.store.write().await;

        Ok(store
            .sessions
            .iter_mut()
            .find(|s| s.jti == jti)
            .map(|session| {
                if session.revoked_at.is_none() {
                    session.revoked_at = Some(revoked_at);
                }
                session.clone()
            }))
    }
}
