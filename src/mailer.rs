use axum::async_trait;
use tracing::info;

/// Outbound-notification seam. Real delivery is out of scope; the trait
/// exists so a production build can plug in an SMTP or provider client
/// without touching the auth service.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, email: &str, token: &str) -> anyhow::Result<()>;
}

/// Logs the reset token instead of sending mail.
#[derive(Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(&self, email: &str, token: &str) -> anyhow::Result<()> {
        info!(email = %email, token = %token, "password reset token issued");
        Ok(())
    }
}
