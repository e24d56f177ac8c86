use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::ports::AuthRepository;
use crate::domain::identity::models::IdentityId;
use crate::domain::session::models::NewSession;
use crate::domain::session::models::Session;

/// Tracks the single active session each identity may hold.
///
/// Sessions are keyed by the `jti` of the token they were opened with.
pub struct SessionLedger<R>
where
    R: AuthRepository,
{
    repository: Arc<R>,
}

impl<R> SessionLedger<R>
where
    R: AuthRepository,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Newest unrevoked session of the identity expiring strictly in the future.
    pub async fn find_active_session(
        &self,
        identity_id: IdentityId,
    ) -> Result<Option<Session>, AuthError> {
        let session = self
            .repository
            .find_active_session(identity_id, Utc::now())
            .await?;

        tracing::debug!(
            identity_id = %identity_id,
            found = session.is_some(),
            "Active session lookup"
        );

        Ok(session)
    }

    /// Open a session for the identity, bound to `jti`.
    ///
    /// # Errors
    /// * `NotFound` - Identity does not exist
    /// * `ActiveSessionExists` - Another session is still active
    /// * `DatabaseError` - Database operation failed
    pub async fn create_session(
        &self,
        identity_id: IdentityId,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, AuthError> {
        let session = self
            .repository
            .create_session(
                NewSession {
                    identity_id,
                    jti: jti.to_string(),
                    expires_at,
                },
                Utc::now(),
            )
            .await?;

        tracing::info!(
            session_id = %session.id,
            identity_id = %identity_id,
            expires_at = %session.expires_at,
            "Session created"
        );

        Ok(session)
    }

    pub async fn find_by_session_token(&self, jti: &str) -> Result<Option<Session>, AuthError> {
        self.repository.find_session_by_jti(jti).await
    }

    /// Revoke the session opened with `jti`.
    ///
    /// # Returns
    /// `false` when no session has this jti; `true` when the session is revoked
    /// after the call, including when it already was.
    pub async fn revoke_by_session_token(&self, jti: &str) -> Result<bool, AuthError> {
        match self.repository.revoke_session(jti, Utc::now()).await? {
            Some(session) => {
                tracing::info!(session_id = %session.id, "Session revoked");
                Ok(true)
            }
            None => {
                tracing::warn!("No session found to revoke");
                Ok(false)
            }
        }
    }
}
