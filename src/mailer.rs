//! Mailer trait and delivery result types.
//!
//! # Architecture: Why `async_trait`?
//!
//! This module uses `#[async_trait]` instead of native async traits (Rust 1.75+)
//! because the library supports dynamic dispatch via `Arc<dyn Mailer>`:
//! the global mailer in `lib.rs` is configured at runtime, and test suites
//! swap in doubles through `configure()`. Native async traits are not
//! object-safe; the macro boxes the returned future, and for I/O-bound email
//! delivery the allocation is unmeasurable next to network latency.
//!
//! Users who want to avoid the boxing can call methods directly on a
//! concrete [`SendGridBackend`](crate::SendGridBackend).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MailError;
use crate::message::Message;

/// Result of a successful delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryResult {
    /// HTTP status code of the API response (202 for an accepted send).
    pub status: u16,
    /// Message ID assigned by the provider (`X-Message-Id` response header),
    /// when one was returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl DeliveryResult {
    /// Create a delivery result with just a status code.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            message_id: None,
        }
    }

    /// Create a delivery result with a provider-assigned message ID.
    pub fn with_message_id(status: u16, message_id: impl Into<String>) -> Self {
        Self {
            status,
            message_id: Some(message_id.into()),
        }
    }
}

/// Trait for email delivery backends.
///
/// # Example
///
/// ```ignore
/// use gridmail::{Message, Mailer, SendGridBackend};
///
/// let backend = SendGridBackend::new("SG.xxxxx");
///
/// let message = Message::new()
///     .from("sender@example.com")
///     .to("recipient@example.com")
///     .subject("Hello")
///     .text_body("World");
///
/// let result = backend.deliver(&message).await?;
/// ```
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send a single message.
    async fn deliver(&self, message: &Message) -> Result<DeliveryResult, MailError>;

    /// Send a batch of messages, returning how many were accepted.
    ///
    /// With [`fail_silently`](Mailer::fail_silently) enabled, a failed
    /// message is logged and skipped; otherwise the first error propagates.
    /// Messages delivered before the error stay counted either way.
    async fn send_messages(&self, messages: &[Message]) -> Result<usize, MailError> {
        let mut sent = 0;
        for message in messages {
            match self.deliver(message).await {
                Ok(_) => sent += 1,
                Err(err) if self.fail_silently() => {
                    tracing::warn!(error = %err, subject = %message.subject, "Message skipped");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(sent)
    }

    /// Whether batch sends swallow per-message errors.
    fn fail_silently(&self) -> bool {
        false
    }

    /// Get the provider name (for logging/debugging).
    fn provider_name(&self) -> &'static str {
        "unknown"
    }

    /// Validate configuration.
    ///
    /// Called at startup to verify required configuration is present.
    fn validate_config(&self) -> Result<(), MailError> {
        Ok(())
    }
}
