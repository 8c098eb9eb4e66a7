//! Outgoing email.
//!
//! SMTP delivery goes through lettre's async transport. Without an SMTP host
//! the console transport logs each message instead, and the memory transport
//! keeps them for inspection.

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::config::AppConfig;
use crate::database::BoxError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Clone)]
pub enum Mailer {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    Console,
    Memory(Arc<Mutex<Vec<OutgoingEmail>>>),
}

impl Mailer {
    pub fn from_config(config: &AppConfig) -> Result<Self, BoxError> {
        let Some(host) = config.smtp_host.as_deref() else {
            return Ok(Mailer::Console);
        };

        let mut builder = if config.smtp_starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };
        builder = builder.port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Mailer::Smtp(builder.build()))
    }

    pub fn memory() -> Self {
        Mailer::Memory(Arc::new(Mutex::new(Vec::new())))
    }

    /// Messages captured by the memory transport, oldest first.
    pub fn outbox(&self) -> Vec<OutgoingEmail> {
        match self {
            Mailer::Memory(outbox) => outbox.lock().map(|o| o.clone()).unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    pub async fn send(&self, from: &str, email: OutgoingEmail) -> Result<(), BoxError> {
        let message = Message::builder()
            .from(from.parse::<Mailbox>()?)
            .to(email.to.parse::<Mailbox>()?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())?;

        match self {
            Mailer::Smtp(transport) => {
                transport.send(message).await?;
            }
            Mailer::Console => {
                info!(
                    to = %email.to,
                    subject = %email.subject,
                    "Email (console transport):\n{}",
                    email.body
                );
            }
            Mailer::Memory(outbox) => {
                outbox
                    .lock()
                    .map_err(|e| format!("outbox lock poisoned: {}", e))?
                    .push(email);
            }
        }

        Ok(())
    }
}
