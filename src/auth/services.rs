use axum::extract::FromRef;
use lazy_static::lazy_static;
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest, ResetPasswordRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo_types::User,
    },
    error::AuthError,
    state::AppState,
};

/// Generic forgot-password reply, identical whether or not the email exists.
pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account with that email exists, a password reset link has been sent.";

const RESET_TOKEN_BYTES: usize = 32;
const RESET_TOKEN_TTL: TimeDuration = TimeDuration::hours(1);

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Validate and create a new account. No write happens unless every
/// validation check passes.
pub async fn register(state: &AppState, mut payload: RegisterRequest) -> Result<(), AuthError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();

    if payload.username.is_empty()
        || payload.first_name.trim().is_empty()
        || payload.last_name.trim().is_empty()
        || payload.email.is_empty()
        || payload.password.is_empty()
    {
        return Err(AuthError::Validation(
            "Please provide all required fields".into(),
        ));
    }

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "register invalid email");
        return Err(AuthError::Validation(
            "Please provide a valid email address".into(),
        ));
    }

    if payload.password.len() < 8 {
        return Err(AuthError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }

    if User::email_or_username_taken(&state.db, &payload.email, &payload.username).await? {
        warn!(email = %payload.email, username = %payload.username, "register conflict");
        return Err(AuthError::Conflict);
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(
        &state.db,
        &payload.username,
        &payload.first_name,
        &payload.last_name,
        &payload.email,
        &hash,
    )
    .await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(())
}

/// Verify credentials and issue a signed session token. Unknown email and
/// wrong password take the same error path.
pub async fn login(state: &AppState, mut payload: LoginRequest) -> Result<String, AuthError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(AuthError::Validation(
            "Please provide all required fields".into(),
        ));
    }

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "login invalid email");
        return Err(AuthError::Validation(
            "Please provide a valid email address".into(),
        ));
    }

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or(AuthError::Authentication)?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AuthError::Authentication);
    }

    let keys = JwtKeys::from_ref(state);
    let token = keys.sign(user.id, &user.username)?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(token)
}

/// Issue and store a reset token for a known email; reply generically either
/// way. Returns the raw token when one was issued so the handler can expose
/// it in non-production mode.
pub async fn forgot_password(state: &AppState, email: &str) -> Result<Option<String>, AuthError> {
    let email = email.trim().to_lowercase();

    if email.is_empty() {
        return Err(AuthError::Validation(
            "Please provide an email address".into(),
        ));
    }

    if !is_valid_email(&email) {
        return Err(AuthError::Validation(
            "Please provide a valid email address".into(),
        ));
    }

    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        // Unknown email: no write, same reply.
        return Ok(None);
    };

    let token = generate_reset_token();
    let expires = OffsetDateTime::now_utc() + RESET_TOKEN_TTL;
    User::set_reset_token(&state.db, user.id, &token, expires).await?;

    state.mailer.send_password_reset(&user.email, &token).await?;

    info!(user_id = %user.id, "reset token stored");
    Ok(Some(token))
}

/// Consume a reset token: overwrite the password hash and clear the token so
/// a replay fails even before the expiry passes.
pub async fn reset_password(
    state: &AppState,
    payload: ResetPasswordRequest,
) -> Result<(), AuthError> {
    if payload.token.is_empty() || payload.new_password.is_empty() {
        return Err(AuthError::Validation(
            "Please provide reset token and new password".into(),
        ));
    }

    if payload.new_password.len() < 8 {
        return Err(AuthError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }

    let user = User::find_by_valid_reset_token(&state.db, &payload.token)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    let hash = hash_password(&payload.new_password)?;
    User::reset_password(&state.db, user.id, &hash).await?;

    info!(user_id = %user.id, "password reset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("plainaddress"));
        assert!(!is_valid_email("no@tld"));
        assert!(!is_valid_email("spaces in@x.com"));
        assert!(!is_valid_email("two@@x.com"));
    }

    #[test]
    fn reset_token_is_64_hex_chars() {
        let token = generate_reset_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn reset_tokens_are_unique() {
        assert_ne!(generate_reset_token(), generate_reset_token());
    }

    // Validation runs before any query, so these pass against the fake
    // state's lazily connecting pool.

    #[tokio::test]
    async fn register_rejects_missing_fields_before_storage() {
        let state = AppState::fake();
        let err = register(
            &state,
            RegisterRequest {
                username: "alice".into(),
                first_name: "".into(),
                last_name: "Smith".into(),
                email: "a@x.com".into(),
                password: "password1".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn register_rejects_bad_email_before_storage() {
        let state = AppState::fake();
        let err = register(
            &state,
            RegisterRequest {
                username: "alice".into(),
                first_name: "Alice".into(),
                last_name: "Smith".into(),
                email: "not-an-email".into(),
                password: "password1".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn register_rejects_short_password_before_storage() {
        let state = AppState::fake();
        let err = register(
            &state,
            RegisterRequest {
                username: "alice".into(),
                first_name: "Alice".into(),
                last_name: "Smith".into(),
                email: "a@x.com".into(),
                password: "short".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn login_rejects_bad_email_before_storage() {
        let state = AppState::fake();
        let err = login(
            &state,
            LoginRequest {
                email: "nope".into(),
                password: "password1".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn forgot_rejects_empty_email_before_storage() {
        let state = AppState::fake();
        let err = forgot_password(&state, "").await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn reset_rejects_short_password_before_storage() {
        let state = AppState::fake();
        let err = reset_password(
            &state,
            ResetPasswordRequest {
                token: "sometoken".into(),
                new_password: "short".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }
}
