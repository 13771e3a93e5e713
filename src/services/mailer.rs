//! Password reset email delivery.
//!
//! The auth service renders a [`PasswordResetEmail`] and hands it to an
//! [`EmailSender`]. Transport is pluggable; the default [`LogEmailSender`]
//! only logs the recipient so local runs never need an SMTP server.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::config::MailConfig;

#[derive(Clone, Debug)]
pub struct PasswordResetEmail {
    pub from_email: String,
    pub to_email: String,
    pub first_name: String,
    pub otp: String,
    pub ttl_minutes: i64,
    pub subject: String,
    pub body: String,
}

impl PasswordResetEmail {
    #[must_use]
    pub fn render(
        mail: &MailConfig,
        to_email: &str,
        first_name: &str,
        otp: &str,
        ttl_minutes: i64,
    ) -> Self {
        let subject = format!("{} password reset code", mail.app_name);
        let body = format!(
            "Hello {first_name},\n\n\
             Use the code below to reset your {app} password:\n\n\
             {otp}\n\n\
             The code expires in {ttl_minutes} minutes. If you did not ask for a \
             password reset you can ignore this email.\n",
            app = mail.app_name,
        );

        Self {
            from_email: mail.from_address.clone(),
            to_email: to_email.to_string(),
            first_name: first_name.to_string(),
            otp: otp.to_string(),
            ttl_minutes,
            subject,
            body,
        }
    }
}

/// Delivery abstraction. Returning `Err` is logged by the caller; it never
/// changes the forgot-password response.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &PasswordResetEmail) -> Result<()>;
}

/// Local dev sender. Logs who the mail was for, never the code.
#[derive(Clone, Debug, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &PasswordResetEmail) -> Result<()> {
        info!(
            to_email = %message.to_email,
            subject = %message.subject,
            "password reset email send stub"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_code_and_ttl() {
        let mail = MailConfig::default();
        let email = PasswordResetEmail::render(&mail, "ann@x.com", "Ann", "042917", 10);

        assert_eq!(email.to_email, "ann@x.com");
        assert_eq!(email.subject, "Authgate password reset code");
        assert!(email.body.starts_with("Hello Ann,"));
        assert!(email.body.contains("042917"));
        assert!(email.body.contains("10 minutes"));
    }

    #[tokio::test]
    async fn test_log_sender_succeeds() {
        let mail = MailConfig::default();
        let email = PasswordResetEmail::render(&mail, "ann@x.com", "Ann", "000001", 10);
        assert!(LogEmailSender.send(&email).await.is_ok());
    }
}
