use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            CheckUserResponse, ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest,
            LoginResponse, MessageResponse, RegisterRequest, ResetPasswordRequest,
        },
        jwt::AuthUser,
        services,
    },
    error::AuthError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/user/register", post(register))
        .route("/user/login", post(login))
        .route("/user/checkUser", get(check_user))
        .route("/user/forgot-password", post(forgot_password))
        .route("/user/reset-password", post(reset_password))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AuthError> {
    services::register(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User registered successfully".into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let token = services::login(&state, payload).await?;
    Ok(Json(LoginResponse {
        message: "User login successful".into(),
        token,
    }))
}

/// Identity comes straight from the verified session token; no DB read.
#[instrument(skip(user))]
pub async fn check_user(user: AuthUser) -> Json<CheckUserResponse> {
    Json(CheckUserResponse {
        message: "Valid user".into(),
        username: user.username,
        userid: user.id,
    })
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<ForgotPasswordResponse>, AuthError> {
    let issued = services::forgot_password(&state, &payload.email).await?;
    // Token only leaves the server in non-production mode.
    let reset_token = issued.filter(|_| state.config.expose_reset_token);
    Ok(Json(ForgotPasswordResponse {
        message: services::FORGOT_PASSWORD_MESSAGE.into(),
        reset_token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    services::reset_password(&state, payload).await?;
    Ok(Json(MessageResponse {
        message: "Password has been reset successfully".into(),
    }))
}
