use axum::{
    Extension,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use keepsake_types::api::Claims;
use keepsake_types::models::Principal;

use crate::AppState;
use crate::error::ApiError;

/// Extract and validate JWT from Authorization header, then attach the
/// caller's [`Principal`].
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    const MISSING: ApiError = ApiError::Unauthorized("Sign in first 💗");

    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(MISSING)?;

    let token = auth_header.strip_prefix("Bearer ").ok_or(MISSING)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| MISSING)?;

    let claims = token_data.claims;
    req.extensions_mut().insert(Principal {
        id: claims.sub,
        email: claims.email,
        display_name: claims.name,
    });
    Ok(next.run(req).await)
}

/// Reject principals outside the allow-list. Must run after [`require_auth`].
pub async fn require_allowed(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let decision = state.policy.decide(Some(&principal));
    if !decision.is_allowed() {
        debug!("{} {} refused: not on the allow-list", req.method(), req.uri().path());
        return Err(ApiError::Forbidden(decision.who_line()));
    }
    Ok(next.run(req).await)
}
