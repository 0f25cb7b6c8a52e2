use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for forgot-password.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

/// Request body for reset-password.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default, rename = "newPassword")]
    pub new_password: String,
}

/// Plain confirmation response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
}

/// Response for the session check on protected routes.
#[derive(Debug, Serialize)]
pub struct CheckUserResponse {
    pub message: String,
    pub username: String,
    pub userid: Uuid,
}

/// Forgot-password response. The token field is only populated when the
/// server runs with EXPOSE_RESET_TOKEN=true and is omitted from the JSON
/// otherwise.
#[derive(Debug, Serialize)]
pub struct ForgotPasswordResponse {
    pub message: String,
    #[serde(rename = "resetToken", skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
}
