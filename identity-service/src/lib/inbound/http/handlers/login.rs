use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Value;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::auth::errors::AuthError;
use crate::domain::auth::models::LoginCommand;
use crate::domain::auth::models::LoginOutcome;
use crate::domain::auth::ports::AuthServicePort;
use crate::inbound::http::router::AppState;

pub async fn login<S: AuthServicePort>(
    State(state): State<AppState<S>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<ApiSuccess<LoginResponseData>, ApiError> {
    let Json(body) = payload?;

    let command = LoginCommand::resolve(
        body.email.as_deref(),
        body.username.as_deref(),
        body.password.as_deref(),
    )
    .map_err(|e| ApiError::from(AuthError::from(e)))?;

    state
        .auth_service
        .login(command)
        .await
        .map_err(ApiError::from)
        .map(|outcome| ApiSuccess::new(StatusCode::OK, outcome.into()))
}

/// Either `email` or `username` identifies the account; see [`LoginCommand::resolve`].
///
/// Fields that are not JSON strings count as absent.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "string_or_absent")]
    email: Option<String>,
    #[serde(default, deserialize_with = "string_or_absent")]
    username: Option<String>,
    #[serde(default, deserialize_with = "string_or_absent")]
    password: Option<String>,
}

fn string_or_absent<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResponseData {
    pub user_id: i64,
    pub role_id: Option<i64>,
    pub access_token: String,
}

impl From<LoginOutcome> for LoginResponseData {
    fn from(outcome: LoginOutcome) -> Self {
        Self {
            user_id: outcome.user_id.0,
            role_id: outcome.role_id.map(|id| id.0),
            access_token: outcome.access_token,
        }
    }
}
