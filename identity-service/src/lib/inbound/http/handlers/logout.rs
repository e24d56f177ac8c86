use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use serde::Serialize;

use super::ApiSuccess;
use crate::domain::auth::ports::AuthServicePort;
use crate::inbound::http::router::AppState;

/// Always answers 200 `{success: true}`, whatever the state of the token.
pub async fn logout<S: AuthServicePort>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> ApiSuccess<LogoutResponseData> {
    let authorization = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let outcome = state.auth_service.logout(authorization).await;

    ApiSuccess::new(
        StatusCode::OK,
        LogoutResponseData {
            success: outcome.success,
        },
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogoutResponseData {
    pub success: bool,
}
