use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Domain errors surfaced by the auth endpoints. Every handler returns
/// `Result<_, AuthError>`; the `IntoResponse` impl is the single place where
/// errors become HTTP.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Malformed or missing input. Always 400.
    #[error("{0}")]
    Validation(String),
    /// Duplicate email or username on registration. 409.
    #[error("User already exists")]
    Conflict,
    /// Bad login credentials. One message for unknown email and wrong
    /// password, so responses never reveal whether an account exists.
    #[error("Invalid username or password")]
    Authentication,
    /// Wrong or expired reset token; the two are indistinguishable. 400.
    #[error("Invalid or expired reset token")]
    InvalidToken,
    /// Missing, malformed or expired session token on a protected route. 401.
    #[error("{0}")]
    Unauthenticated(&'static str),
    /// Anything unexpected. Logged server-side, generic body to the caller.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Wire shape of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) | AuthError::InvalidToken => StatusCode::BAD_REQUEST,
            AuthError::Conflict => StatusCode::CONFLICT,
            AuthError::Authentication | AuthError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn category(&self) -> &'static str {
        match self {
            AuthError::Validation(_) | AuthError::InvalidToken => "Bad Request",
            AuthError::Conflict => "Conflict",
            AuthError::Authentication | AuthError::Unauthenticated(_) => "Unauthorized",
            AuthError::Internal(_) => "Internal Server Error",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match &self {
            AuthError::Internal(e) => {
                error!(error = %e, "internal error");
                "An unexpected error occurred.".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorBody {
            error: self.category().to_string(),
            message,
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: AuthError) -> (StatusCode, ErrorBody) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_maps_to_400() {
        let (status, body) =
            body_of(AuthError::Validation("Password must be at least 8 characters".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Bad Request");
        assert_eq!(body.message, "Password must be at least 8 characters");
    }

    #[tokio::test]
    async fn conflict_maps_to_409() {
        let (status, body) = body_of(AuthError::Conflict).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.error, "Conflict");
        assert_eq!(body.message, "User already exists");
    }

    #[tokio::test]
    async fn authentication_maps_to_401_with_single_message() {
        let (status, body) = body_of(AuthError::Authentication).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.error, "Unauthorized");
        assert_eq!(body.message, "Invalid username or password");
    }

    #[tokio::test]
    async fn invalid_token_maps_to_400() {
        let (status, body) = body_of(AuthError::InvalidToken).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.message, "Invalid or expired reset token");
    }

    #[tokio::test]
    async fn internal_hides_detail() {
        let (status, body) = body_of(AuthError::Internal(anyhow::anyhow!("pool timed out"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal Server Error");
        assert_eq!(body.message, "An unexpected error occurred.");
        assert!(!body.message.contains("pool"));
    }
}
