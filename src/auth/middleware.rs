use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::error::ExchangeError;
use crate::gateway::state::AppState;

/// Require `Authorization: Bearer <jwt>` and attach the caller's
/// [`AuthenticatedClient`](super::AuthenticatedClient) to the request.
pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ExchangeError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ExchangeError::forbidden("missing authorization header"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ExchangeError::forbidden("invalid authorization scheme"))?;

    match state.jwt.validate(token.trim()) {
        Ok(client) => {
            request.extensions_mut().insert(client);
            Ok(next.run(request).await)
        }
        Err(e) => {
            tracing::debug!("[AUTH] rejected token: {}", e);
            Err(ExchangeError::forbidden("invalid or expired token"))
        }
    }
}
