//! Outgoing Mail
//! Mission: Deliver feedback e-mails over SMTP behind a swappable interface

use crate::config::MailConfig;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials as SmtpCredentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{info, warn};

/// Port on which SMTP servers expect TLS from the first byte.
const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: Address,
    pub reply_to: Option<Mailbox>,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let builder = if config.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .with_context(|| format!("configure SMTP relay {}", config.host))?
        .port(config.port);

        let builder = match (&config.username, &config.password) {
            (Some(user), Some(password)) => {
                builder.credentials(SmtpCredentials::new(user.clone(), password.clone()))
            }
            _ => builder,
        };

        let from: Mailbox = config
            .from
            .parse()
            .with_context(|| format!("invalid sender address '{}'", config.from))?;

        info!("📧 SMTP mailer ready: {}:{}", config.host, config.port);
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(None, mail.to))
            .subject(mail.subject);
        if let Some(reply_to) = mail.reply_to {
            builder = builder.reply_to(reply_to);
        }

        let message = builder
            .multipart(MultiPart::alternative_plain_html(mail.text, mail.html))
            .context("build feedback message")?;

        self.transport
            .send(message)
            .await
            .context("SMTP delivery failed")?;
        Ok(())
    }
}

/// Mailer used when no SMTP host is configured; every send fails.
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        warn!(subject = %mail.subject, "Mail delivery is not configured");
        Err(anyhow!("mail delivery is not configured (EMAIL_HOST unset)"))
    }
}
