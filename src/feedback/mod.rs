//! Feedback Submission
//! Mission: Validate visitor messages and forward them to the site admin

pub mod mailer;

use crate::error::ApiError;
use anyhow::anyhow;
use lettre::{message::Mailbox, Address};
use mailer::{Mailer, OutgoingMail};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

const SEND_FAILED: &str = "Failed to send message";

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

/// Feedback that passed validation.
#[derive(Debug, Clone)]
pub struct Feedback {
    pub name: String,
    pub email: Address,
    pub message: String,
}

impl FeedbackRequest {
    pub fn validate(self) -> Result<Feedback, ApiError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ApiError::validation("Name is required"));
        }
        if self.message.trim().is_empty() {
            return Err(ApiError::validation("Message is required"));
        }
        let email: Address = self
            .email
            .trim()
            .parse()
            .map_err(|_| ApiError::validation("Invalid email address"))?;

        Ok(Feedback {
            name: name.to_string(),
            email,
            message: self.message,
        })
    }
}

/// Escape text for inclusion in an HTML body.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Clone)]
pub struct FeedbackService {
    mailer: Arc<dyn Mailer>,
    admin_email: Option<Address>,
}

impl FeedbackService {
    pub fn new(mailer: Arc<dyn Mailer>, admin_email: Option<Address>) -> Self {
        Self {
            mailer,
            admin_email,
        }
    }

    pub fn compose(&self, feedback: &Feedback, to: Address) -> OutgoingMail {
        let name_html = escape_html(&feedback.name);
        let email_html = escape_html(feedback.email.as_ref());
        let message_html = escape_html(&feedback.message).replace('\n', "<br/>");

        OutgoingMail {
            to,
            reply_to: Some(Mailbox::new(
                Some(feedback.name.clone()),
                feedback.email.clone(),
            )),
            subject: format!("New message from {}", feedback.name),
            text: format!(
                "Name: {}\nEmail: {}\nMessage: {}",
                feedback.name, feedback.email, feedback.message
            ),
            html: format!(
                "<h2>New message:</h2>\
                 <p><strong>Name:</strong> {name_html}</p>\
                 <p><strong>Email:</strong> {email_html}</p>\
                 <p><strong>Message:</strong></p>\
                 <p>{message_html}</p>"
            ),
        }
    }

    pub async fn submit(&self, request: FeedbackRequest) -> Result<(), ApiError> {
        let feedback = request.validate()?;

        let Some(to) = self.admin_email.clone() else {
            return Err(ApiError::internal_with(
                anyhow!("ADMIN_EMAIL is not configured"),
                SEND_FAILED,
            ));
        };

        let mail = self.compose(&feedback, to);
        if let Err(e) = self.mailer.send(mail).await {
            error!("❌ Feedback delivery failed: {:#}", e);
            return Err(ApiError::internal_with(e, SEND_FAILED));
        }

        info!("📨 Feedback forwarded from {}", feedback.email);
        Ok(())
    }
}
