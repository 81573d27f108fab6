//! Delivery of accepted registrations to whoever follows up on them.

use async_trait::async_trait;
use serde_json::{json, Value};
use shared::Registration;
use thiserror::Error;
use tracing::info;

pub mod telegram;

pub use telegram::{TelegramConfig, TelegramNotifier, DEFAULT_API_BASE};

#[derive(Debug, Clone, PartialEq)]
pub struct Ack {
    pub message_id: Option<i64>,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("notification credentials are not configured")]
    MissingCredentials,
    #[error("invalid notification endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("notification transport failed: {0}")]
    Transport(String),
    #[error("notification rejected (HTTP {status}): {description}")]
    Rejected { status: u16, description: String },
    #[error("malformed notification response: {0}")]
    MalformedResponse(String),
}

pub type NotificationResult = Result<Ack, NotifyError>;

/// One delivery attempt per call. Implementations report every failure
/// through the returned result and never retry.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, registration: &Registration) -> NotificationResult;
}

/// Delivery for the local variant: the registration only reaches the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, registration: &Registration) -> NotificationResult {
        info!(
            name = %registration.name,
            city = %registration.city_label,
            phone = %registration.phone,
            subject = %registration.subject_label,
            "registration received"
        );
        Ok(Ack {
            message_id: None,
            data: json!({ "logged": true }),
        })
    }
}
