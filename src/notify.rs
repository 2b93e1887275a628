use async_trait::async_trait;
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::models::Booking;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("rejected with status {0}")]
    Rejected(u16),
}

/// A party to a booking as addressed in the notification emails.
#[derive(Debug, Clone, Serialize)]
pub struct Recipient {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingNotice {
    pub booking: Booking,
    pub creative: Recipient,
    pub client: Recipient,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn booking_created(&self, notice: &BookingNotice) -> Result<(), NotifyError>;
}

pub fn creative_email_html(n: &BookingNotice) -> String {
    format!(
        "<h1>New Booking Request</h1>\
         <p>Hello {creative},</p>\
         <p>You have received a new booking request from {client}.</p>\
         <p>Booking Details:</p>\
         <ul><li>Date: {date}</li><li>Message: {message}</li></ul>\
         <p>Please log in to your Folioo account to accept or decline this booking request.</p>\
         <p>Best regards,<br>The Folioo Team</p>",
        creative = escape(&n.creative.name),
        client = escape(&n.client.name),
        date = n.booking.date.format("%d %B %Y"),
        message = message_or_default(&n.booking.message),
    )
}

pub fn client_email_html(n: &BookingNotice) -> String {
    format!(
        "<h1>Booking Request Sent</h1>\
         <p>Hello {client},</p>\
         <p>Your booking request has been sent to {creative}.</p>\
         <p>Booking Details:</p>\
         <ul><li>Date: {date}</li><li>Message: {message}</li></ul>\
         <p>We'll notify you once the creative responds to your request.</p>\
         <p>Best regards,<br>The Folioo Team</p>",
        creative = escape(&n.creative.name),
        client = escape(&n.client.name),
        date = n.booking.date.format("%d %B %Y"),
        message = message_or_default(&n.booking.message),
    )
}

fn message_or_default(msg: &str) -> String {
    if msg.trim().is_empty() { "No additional notes".into() } else { escape(msg) }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

#[derive(Serialize)]
struct ResendEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: String,
}

/// Sends both booking emails through the Resend HTTP API.
pub struct ResendNotifier {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    from: String,
}

impl ResendNotifier {
    pub fn new(api_key: String, api_base: String, from: String) -> Self {
        Self { client: reqwest::Client::new(), api_key, api_base, from }
    }

    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("RESEND_API_KEY").ok().filter(|k| !k.is_empty())?;
        let api_base = std::env::var("RESEND_API_BASE").unwrap_or_else(|_| "https://api.resend.com".into());
        let from = std::env::var("NOTIFY_FROM").unwrap_or_else(|_| "Folioo <notifications@folioo.com>".into());
        Some(Self::new(api_key, api_base, from))
    }

    async fn send(&self, to: &str, subject: &str, html: String) -> Result<(), NotifyError> {
        let body = ResendEmail { from: &self.from, to: [to], subject, html };
        let resp = self
            .client
            .post(format!("{}/emails", self.api_base.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(NotifyError::Rejected(resp.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for ResendNotifier {
    async fn booking_created(&self, notice: &BookingNotice) -> Result<(), NotifyError> {
        self.send(&notice.creative.email, "New Booking Request", creative_email_html(notice)).await?;
        self.send(&notice.client.email, "Booking Request Sent", client_email_html(notice)).await
    }
}

/// Used when no email provider is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn booking_created(&self, notice: &BookingNotice) -> Result<(), NotifyError> {
        info!(
            "booking {} created (creative={} client={}); email delivery disabled",
            notice.booking.id, notice.creative.email, notice.client.email
        );
        Ok(())
    }
}

pub fn build_notifier() -> Arc<dyn Notifier> {
    match ResendNotifier::from_env() {
        Some(n) => Arc::new(n),
        None => {
            warn!("RESEND_API_KEY not set; booking emails will only be logged");
            Arc::new(LogNotifier)
        }
    }
}
