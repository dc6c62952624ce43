use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the gateway handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub display_name: String,
    pub email: String,
    pub token: String,
}

/// Which parts of the page a client should show. `true` means visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visibility {
    pub app_area: bool,
    pub login_button: bool,
    pub logout_button: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub who: String,
    pub allowed: bool,
    pub visibility: Visibility,
}

// -- Collections --

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddResponse<R> {
    pub record: R,
    pub status: String,
}

// -- Daily --

#[derive(Debug, Serialize, Deserialize)]
pub struct TodayResponse {
    pub day_key: String,
    pub pretty_date: String,
    pub text: String,
}

/// Rendered fragments of the dashboard page.
#[derive(Debug, Serialize, Deserialize)]
pub struct TogetherResponse {
    pub pretty_date: String,
    pub today: String,
    pub featured_letter: String,
    pub collage: String,
    pub songs: String,
}
