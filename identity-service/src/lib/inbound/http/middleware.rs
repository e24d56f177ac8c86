use axum::extract::Request;
use axum::extract::State;
use axum::middleware::Next;
use axum::response::Response;

use super::handlers::ApiError;
use crate::domain::auth::errors::AuthError;
use crate::domain::auth::models::bearer_token;
use crate::domain::auth::ports::AuthServicePort;
use crate::inbound::http::router::AppState;

/// Middleware that requires a verified bearer token backed by an active session.
///
/// On success the [`AuthenticatedIdentity`](crate::domain::auth::models::AuthenticatedIdentity)
/// is added to the request extensions.
pub async fn require_session<S: AuthServicePort>(
    State(state): State<AppState<S>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = {
        let header = req
            .headers()
            .get(http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        bearer_token(header).map(str::to_string)
    }
    .ok_or_else(|| {
        tracing::debug!("Missing or malformed Authorization header");
        ApiError::from(AuthError::InvalidToken)
    })?;

    let identity = state.auth_service.authenticate(&token).await?;

    tracing::debug!(identity_id = %identity.identity_id, "Request authenticated");
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
