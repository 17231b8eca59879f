//! SMTP email sender, async lettre with STARTTLS.

use std::time::Duration;

use wishline_core::error::{Result, WishlineError};
use wishline_core::types::EmailSenderConfig;

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SmtpEmailSender {
    config: EmailSenderConfig,
}

impl SmtpEmailSender {
    pub fn new(config: EmailSenderConfig) -> Self {
        Self { config }
    }

    /// Send an HTML email.
    pub async fn send(
        &self,
        to_addr: &str,
        to_name: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<()> {
        use lettre::{
            AsyncSmtpTransport, AsyncTransport, Message as LettreMessage, message::Mailbox,
            message::header::ContentType, transport::smtp::authentication::Credentials,
        };

        if self.config.smtp_host.is_empty() || self.config.sender_email.is_empty() {
            return Err(WishlineError::Config(
                "email sender not configured (smtp_host / sender_email)".into(),
            ));
        }

        let from_mailbox: Mailbox =
            format!("{} <{}>", self.config.sender_name, self.config.sender_email)
                .parse()
                .map_err(|e| WishlineError::Channel(format!("Invalid from: {e}")))?;

        let to_mailbox: Mailbox = if to_name.is_empty() {
            to_addr
                .parse()
                .map_err(|e| WishlineError::Channel(format!("Invalid to: {e}")))?
        } else {
            format!("{to_name} <{to_addr}>")
                .parse()
                .map_err(|e| WishlineError::Channel(format!("Invalid to: {e}")))?
        };

        let email = LettreMessage::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| WishlineError::Channel(format!("Build email: {e}")))?;

        let username = if self.config.username.is_empty() {
            self.config.sender_email.clone()
        } else {
            self.config.username.clone()
        };
        let creds = Credentials::new(username, self.config.password.clone());

        let mailer = AsyncSmtpTransport::<lettre::Tokio1Executor>::starttls_relay(
            &self.config.smtp_host,
        )
        .map_err(|e| WishlineError::Channel(format!("SMTP relay: {e}")))?
        .port(self.config.smtp_port)
        .credentials(creds)
        .timeout(Some(SEND_TIMEOUT))
        .build();

        mailer
            .send(email)
            .await
            .map_err(|e| WishlineError::Channel(format!("SMTP send: {e}")))?;

        tracing::debug!("Email sent to {to_addr}");
        Ok(())
    }
}
