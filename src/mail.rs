//! Outbound mail.
//!
//! Sending is best effort from the caller's point of view: a failed welcome
//! mail is logged and the registration still succeeds.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Mail {
    pub fn welcome(to: &str, name: &str) -> Self {
        Self {
            to: to.to_owned(),
            subject: "Welcome".to_owned(),
            body: format!("Hi {name}, your account is ready."),
        }
    }
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: Mail) -> Result<(), MailError>;
}

/// Writes mail to the log instead of delivering it.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: Mail) -> Result<(), MailError> {
        info!(to = %mail.to, subject = %mail.subject, "mail");
        Ok(())
    }
}
