use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::auth::models::RegisterCommand;
use crate::domain::auth::ports::AuthServicePort;
use crate::domain::identity::models::Identity;
use crate::inbound::http::router::AppState;

pub async fn register<S: AuthServicePort>(
    State(state): State<AppState<S>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<ApiSuccess<RegisterResponseData>, ApiError> {
    let Json(body) = payload?;

    state
        .auth_service
        .register(body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|ref identity| {
            ApiSuccess::new(
                StatusCode::CREATED,
                RegisterResponseData {
                    user: identity.into(),
                },
            )
        })
}

/// HTTP request body for registration (raw JSON); missing fields fail validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegisterRequest {
    name: Option<String>,
    lastname: Option<String>,
    username: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    password: Option<String>,
}

impl RegisterRequest {
    fn try_into_command(self) -> Result<RegisterCommand, ApiError> {
        RegisterCommand::parse(
            self.name.as_deref(),
            self.lastname.as_deref(),
            self.username.as_deref(),
            self.email.as_deref(),
            self.phone.as_deref(),
            self.password.as_deref(),
        )
        .map_err(ApiError::from)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterResponseData {
    pub user: PublicIdentity,
}

/// Identity as exposed to clients; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicIdentity {
    pub id: i64,
    pub name: String,
    pub lastname: String,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: PublicRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicRole {
    pub id: Option<i64>,
    pub name: Option<String>,
}

impl From<&Identity> for PublicIdentity {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.0,
            name: identity.name.as_str().to_string(),
            lastname: identity.lastname.as_str().to_string(),
            username: identity.username.as_str().to_string(),
            email: identity.email.as_str().to_string(),
            phone: identity.phone.as_ref().map(|p| p.as_str().to_string()),
            role: PublicRole {
                id: identity.role_id().map(|id| id.0),
                name: identity.role_name().map(|name| name.as_str().to_string()),
            },
        }
    }
}
