//! HTTP client for the auth endpoints. Plays the role the web frontend's
//! auth context plays: it caches the session token and the current user and
//! exposes the same operations. State only changes through these calls;
//! there is no background refresh or token renewal.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// The server answered with an `{error, message}` body.
    #[error("{message}")]
    Api {
        status: StatusCode,
        error: String,
        message: String,
    },
}

/// Identity cached after a successful session check.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionUser {
    pub userid: Uuid,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterInfo {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct MessageReply {
    message: String,
}

#[derive(Debug, Deserialize)]
struct LoginReply {
    message: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct CheckUserReply {
    message: String,
    username: String,
    userid: Uuid,
}

/// Forgot-password reply; `reset_token` is only present when the server runs
/// in its non-production token-exposure mode.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordReply {
    pub message: String,
    #[serde(rename = "resetToken")]
    pub reset_token: Option<String>,
}

pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    user: Option<SessionUser>,
}

impl AuthClient {
    /// Fresh client with no session.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: None,
            user: None,
        }
    }

    /// Resume from a previously cached token. Hydrates the current user via
    /// the session check; any failure (network, 401) drops the token and
    /// leaves the client signed out.
    pub async fn resume(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let mut client = Self::new(base_url);
        client.token = Some(token.into());
        client.hydrate().await;
        client
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn hydrate(&mut self) {
        let Some(token) = self.token.clone() else {
            self.user = None;
            return;
        };
        let result = async {
            let resp = self
                .http
                .get(self.url("/api/user/checkUser"))
                .bearer_auth(&token)
                .send()
                .await?;
            let reply: CheckUserReply = Self::parse(resp).await?;
            Ok::<_, ClientError>(SessionUser {
                userid: reply.userid,
                username: reply.username,
            })
        }
        .await;

        match result {
            Ok(user) => self.user = Some(user),
            Err(_) => {
                self.token = None;
                self.user = None;
            }
        }
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), ClientError> {
        let resp = self
            .http
            .post(self.url("/api/user/login"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        let reply: LoginReply = Self::parse(resp).await?;
        self.token = Some(reply.token);
        self.hydrate().await;
        Ok(())
    }

    pub async fn register(&self, info: &RegisterInfo) -> Result<String, ClientError> {
        let resp = self
            .http
            .post(self.url("/api/user/register"))
            .json(info)
            .send()
            .await?;
        let reply: MessageReply = Self::parse(resp).await?;
        Ok(reply.message)
    }

    /// Drops the cached session locally; sessions are stateless so there is
    /// no server call to make.
    pub fn logout(&mut self) {
        self.token = None;
        self.user = None;
    }

    pub async fn forgot_password(&self, email: &str) -> Result<ForgotPasswordReply, ClientError> {
        let resp = self
            .http
            .post(self.url("/api/user/forgot-password"))
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;
        Self::parse(resp).await
    }

    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<String, ClientError> {
        let resp = self
            .http
            .post(self.url("/api/user/reset-password"))
            .json(&serde_json::json!({ "token": token, "newPassword": new_password }))
            .send()
            .await?;
        let reply: MessageReply = Self::parse(resp).await?;
        Ok(reply.message)
    }

    /// Decode a success body, or turn an error status into `ClientError::Api`
    /// using the server's `{error, message}` shape.
    async fn parse<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json::<T>().await?);
        }
        #[derive(Deserialize)]
        struct WireError {
            error: String,
            message: String,
        }
        let wire = resp.json::<WireError>().await.unwrap_or(WireError {
            error: "Unknown".into(),
            message: format!("request failed with status {}", status),
        });
        Err(ClientError::Api {
            status,
            error: wire.error,
            message: wire.message,
        })
    }
}
