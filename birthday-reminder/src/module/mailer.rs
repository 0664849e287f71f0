///! Email delivery
///!
///! `EmailSender` is the seam the service talks to; `SmtpMailer` is the real
///! implementation over lettre's async SMTP transport.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use thiserror::Error;

use super::renderer::Notification;
use crate::config::{BodyFormat, SmtpConfig};

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("no recipient address configured")]
    NoRecipient,

    #[error("SMTP username or password missing")]
    MissingCredentials,

    #[error("invalid email address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),

    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, notification: &Notification, to: &str) -> Result<(), DeliveryError>;
}

/// SMTP sender. Port 465 connects with implicit TLS, other ports use STARTTLS.
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs.max(1))
    }

    fn transport(&self, username: &str, password: &str) -> Result<AsyncSmtpTransport<Tokio1Executor>, DeliveryError> {
        let builder = if self.config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
        }
        .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        Ok(builder
            .port(self.config.port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .timeout(Some(self.timeout()))
            .build())
    }

    fn build_message(&self, notification: &Notification, from: &str, to: &str) -> Result<Message, DeliveryError> {
        let content_type = match notification.format {
            BodyFormat::Plain => ContentType::TEXT_PLAIN,
            BodyFormat::Html => ContentType::TEXT_HTML,
        };

        Message::builder()
            .from(parse_mailbox(from)?)
            .to(parse_mailbox(to)?)
            .subject(notification.subject.clone())
            .header(content_type)
            .body(notification.body.clone())
            .map_err(|e| DeliveryError::Build(e.to_string()))
    }
}

#[async_trait]
impl EmailSender for SmtpMailer {
    async fn send(&self, notification: &Notification, to: &str) -> Result<(), DeliveryError> {
        let (Some(username), Some(password)) = (
            self.config.username.as_deref(),
            self.config.password.as_deref(),
        ) else {
            return Err(DeliveryError::MissingCredentials);
        };
        let from = self.config.sender().unwrap_or(username);

        let message = self.build_message(notification, from, to)?;
        let transport = self.transport(username, password)?;

        tracing::debug!(
            "Sending '{}' to {} via {}:{}",
            notification.subject,
            to,
            self.config.host,
            self.config.port
        );

        let timeout = self.timeout();
        match tokio::time::timeout(timeout, transport.send(message)).await {
            Ok(Ok(response)) => {
                tracing::debug!("SMTP accepted message: {:?}", response.code());
                Ok(())
            }
            Ok(Err(e)) => Err(DeliveryError::Transport(e.to_string())),
            Err(_) => Err(DeliveryError::Timeout(timeout)),
        }
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| DeliveryError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification() -> Notification {
        Notification {
            subject: "生日提醒: 今天是张三 (公历)的生日".to_string(),
            body: "今天是 张三 (公历) 的生日".to_string(),
            format: BodyFormat::Plain,
        }
    }

    #[tokio::test]
    async fn test_missing_credentials_fails_before_connecting() {
        let mailer = SmtpMailer::new(SmtpConfig::default());
        let err = mailer.send(&notification(), "someone@example.com").await.unwrap_err();
        assert!(matches!(err, DeliveryError::MissingCredentials));
    }

    #[tokio::test]
    async fn test_invalid_recipient() {
        let mailer = SmtpMailer::new(SmtpConfig {
            username: Some("bot@example.com".to_string()),
            password: Some("secret".to_string()),
            ..SmtpConfig::default()
        });
        let err = mailer.send(&notification(), "not an address").await.unwrap_err();
        assert!(matches!(err, DeliveryError::InvalidAddress { .. }));
    }

    #[test]
    fn test_build_message_headers() {
        let mailer = SmtpMailer::new(SmtpConfig::default());
        let mut n = notification();
        n.format = BodyFormat::Html;
        let message = mailer
            .build_message(&n, "bot@example.com", "team@example.com")
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: team@example.com"));
        assert!(raw.contains("Content-Type: text/html; charset=utf-8"));
    }
}
