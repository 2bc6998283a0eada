use anyhow::Context;
use axum::async_trait;
use serde_json::json;

use crate::config::EmailConfig;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()>;
}

/// Mail-relay client posting templated HTML to the relay's send endpoint.
pub struct HttpMailer {
    http: reqwest::Client,
    relay_url: String,
    api_token: String,
    sender: String,
}

impl HttpMailer {
    pub fn new(email: &EmailConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            relay_url: email.relay_url.clone(),
            api_token: email.api_token.clone(),
            sender: email.sender.clone(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        let response = self
            .http
            .post(format!("{}/email", self.relay_url))
            .header("X-Api-Token", &self.api_token)
            .json(&json!({
                "From": self.sender,
                "To": to,
                "Subject": subject,
                "HtmlBody": html,
            }))
            .send()
            .await
            .context("mail relay request")?;
        response
            .error_for_status()
            .context("mail relay rejected the message")?;
        Ok(())
    }
}

pub fn otp_email(otp: &str, expiry_minutes: i64) -> (String, String) {
    let subject = "Your OTP for Registration".to_string();
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
            <h2 style="color: #333;">Registration OTP</h2>
            <p>Your OTP for registration is:</p>
            <div style="background: #f4f4f4; padding: 10px; margin: 10px 0; font-size: 24px; letter-spacing: 2px; text-align: center;">
                {otp}
            </div>
            <p>This OTP is valid for {expiry_minutes} minutes.</p>
            <p>If you didn't request this, please ignore this email.</p>
        </div>"#
    );
    (subject, html)
}

pub fn password_reset_email(reset_url: &str) -> (String, String) {
    let subject = "Password Reset Request".to_string();
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
            <h2 style="color: #333;">Password Reset</h2>
            <p>You requested to reset your password. Click the link below to proceed:</p>
            <div style="margin: 20px 0;">
                <a href="{reset_url}"
                   style="background: #4CAF50; color: white; padding: 10px 20px; text-decoration: none; border-radius: 5px;">
                    Reset Password
                </a>
            </div>
            <p>If you didn't request this, please ignore this email.</p>
            <p>This link will expire in 1 hour.</p>
        </div>"#
    );
    (subject, html)
}

pub fn password_changed_email() -> (String, String) {
    let subject = "Your Password Has Been Changed".to_string();
    let html = r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
            <h2 style="color: #333;">Password Changed</h2>
            <p>This is a confirmation that your password has been successfully changed.</p>
            <p>If you didn't make this change, please contact our support team immediately.</p>
        </div>"#
        .to_string();
    (subject, html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_email_embeds_code_and_expiry() {
        let (subject, html) = otp_email("042917", 10);
        assert!(subject.contains("OTP"));
        assert!(html.contains("042917"));
        assert!(html.contains("10 minutes"));
    }

    #[test]
    fn reset_email_links_to_reset_url() {
        let url = "https://portal.example/reset-password?token=abc";
        let (_, html) = password_reset_email(url);
        assert!(html.contains(url));
    }

    #[test]
    fn changed_email_is_a_confirmation() {
        let (subject, html) = password_changed_email();
        assert!(subject.contains("Changed"));
        assert!(html.contains("successfully changed"));
    }
}
