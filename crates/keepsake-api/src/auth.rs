use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use keepsake_core::gate::canonical_email;
use keepsake_db::is_constraint_violation;
use keepsake_types::api::{
    Claims, LoginRequest, LoginResponse, MeResponse, RegisterRequest, RegisterResponse,
};
use keepsake_types::models::Principal;

use crate::AppState;
use crate::error::{ApiError, SIGN_IN_FAILED};

const MAX_DISPLAY_NAME: usize = 64;
const EMAIL_TAKEN: &str = "That email already has an account";

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    let email = canonical_email(&req.email);
    if !looks_like_email(&email) {
        return Err(ApiError::BadRequest("That email does not look right".into()));
    }
    let display_name = req.display_name.trim().to_string();
    if display_name.chars().count() > MAX_DISPLAY_NAME {
        return Err(ApiError::BadRequest("Display name is too long".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest("Password needs at least 8 characters".into()));
    }

    // Check if email is taken
    let db = state.db.clone();
    let lookup = email.clone();
    if tokio::task::spawn_blocking(move || db.get_user_by_email(&lookup)).await??.is_some() {
        return Err(ApiError::Conflict(EMAIL_TAKEN));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();

    let user_id = Uuid::new_v4();

    let db = state.db.clone();
    let (row_email, row_name) = (email.clone(), display_name.clone());
    tokio::task::spawn_blocking(move || {
        db.create_user(&user_id.to_string(), &row_email, &row_name, &password_hash)
    })
    .await?
    .map_err(|e| {
        // lost a race with another registration for the same email
        if is_constraint_violation(&e) {
            ApiError::Conflict(EMAIL_TAKEN)
        } else {
            ApiError::Internal(e)
        }
    })?;

    let token = create_token(&state.jwt_secret, user_id, &email, &display_name)?;
    info!("registered {}", email);

    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id, token })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let db = state.db.clone();
    let email = canonical_email(&req.email);
    let user = tokio::task::spawn_blocking(move || db.get_user_by_email(&email))
        .await??
        .ok_or(ApiError::Unauthorized(SIGN_IN_FAILED))?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("stored hash for {} is unreadable: {}", user.email, e))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized(SIGN_IN_FAILED))?;

    let user_id: Uuid = user.id.parse().map_err(anyhow::Error::from)?;

    let token = create_token(&state.jwt_secret, user_id, &user.email, &user.display_name)?;

    Ok(Json(LoginResponse {
        user_id,
        display_name: user.display_name,
        email: user.email,
        token,
    }))
}

/// The gate's view of the caller: who-line, allow-list verdict and which
/// parts of the page to show.
pub async fn me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<MeResponse>, ApiError> {
    let db = state.db.clone();
    let id = principal.id.to_string();
    // the account may have been removed since the token was issued
    if tokio::task::spawn_blocking(move || db.get_user_by_id(&id)).await??.is_none() {
        return Err(ApiError::Unauthorized(SIGN_IN_FAILED));
    }

    let decision = state.policy.decide(Some(&principal));
    Ok(Json(MeResponse {
        who: decision.who_line(),
        allowed: decision.is_allowed(),
        visibility: decision.visibility(),
    }))
}

pub fn create_token(
    secret: &str,
    user_id: Uuid,
    email: &str,
    display_name: &str,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        name: display_name.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
