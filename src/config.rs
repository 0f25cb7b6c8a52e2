use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    /// Echo freshly issued reset tokens in the forgot-password response.
    /// Local-testing convenience; must stay off in production.
    pub expose_reset_token: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "forum-auth".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "forum-users".into()),
            ttl_days: std::env::var("JWT_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(7),
        };
        let expose_reset_token = std::env::var("EXPOSE_RESET_TOKEN")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        Ok(Self {
            database_url,
            jwt,
            expose_reset_token,
        })
    }
}
