use std::fmt;

use chrono::DateTime;
use chrono::Utc;

use crate::domain::identity::models::IdentityId;

/// One login, bound to the token it was issued with through `jti`.
///
/// Rows are never deleted; logout only stamps `revoked_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub identity_id: IdentityId,
    pub jti: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Not revoked and expiring strictly after `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Session row to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub identity_id: IdentityId,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn session(expires_in: Duration, revoked: bool) -> Session {
        let now = Utc::now();
        Session {
            id: SessionId(1),
            identity_id: IdentityId(1),
            jti: "jti".to_string(),
            created_at: now,
            expires_at: now + expires_in,
            revoked_at: revoked.then_some(now),
        }
    }

    #[test]
    fn test_is_active() {
        let now = Utc::now();

        assert!(session(Duration::minutes(5), false).is_active(now));
        assert!(!session(Duration::minutes(5), true).is_active(now));
        assert!(!session(Duration::minutes(-5), false).is_active(now));
    }

    #[test]
    fn test_expiry_boundary_is_inactive() {
        let s = session(Duration::minutes(5), false);
        assert!(!s.is_active(s.expires_at));
    }
}
