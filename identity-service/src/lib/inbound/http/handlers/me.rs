use axum::http::StatusCode;
use axum::Extension;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use super::ApiSuccess;
use crate::domain::auth::models::AuthenticatedIdentity;

/// Caller resolved by the session middleware.
pub async fn me(Extension(identity): Extension<AuthenticatedIdentity>) -> ApiSuccess<MeResponseData> {
    ApiSuccess::new(StatusCode::OK, identity.into())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeResponseData {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub role_id: Option<i64>,
    pub role_name: Option<String>,
    pub session_expires_at: DateTime<Utc>,
}

impl From<AuthenticatedIdentity> for MeResponseData {
    fn from(identity: AuthenticatedIdentity) -> Self {
        Self {
            user_id: identity.identity_id.0,
            username: identity.username,
            email: identity.email,
            role_id: identity.role_id,
            role_name: identity.role_name,
            session_expires_at: identity.session_expires_at,
        }
    }
}
