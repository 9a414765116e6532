//! # Gridmail
//!
//! Deliver email through the SendGrid v3 Mail Send API.
//!
//! The crate does one thing: translate a [`Message`] into the JSON body the
//! `POST /v3/mail/send` endpoint expects (recipients, content, attachments,
//! templating, unsubscribe groups, tracking and sandbox settings) and
//! perform the HTTP call.
//!
//! ## Quick Start
//!
//! Set environment variables:
//! ```bash
//! SENDGRID_API_KEY=SG.xxxxx
//! EMAIL_FROM=noreply@example.com
//! EMAIL_FROM_NAME=My App
//! ```
//!
//! Send mail from anywhere:
//! ```rust,ignore
//! use gridmail::{Message, deliver};
//!
//! let message = Message::new()
//!     .to("user@example.com")
//!     .subject("Welcome!")
//!     .text_body("Hello");
//!
//! deliver(&message).await?;
//! ```
//!
//! ## Explicit backend
//!
//! ```rust,ignore
//! use gridmail::{Message, Mailer, SendGridBackend};
//!
//! let backend = SendGridBackend::new("SG.xxxxx")
//!     .sandbox(true)
//!     .track_clicks(true, false);
//!
//! backend.deliver(&message).await?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `SENDGRID_API_KEY` | API key (required) |
//! | `SENDGRID_SANDBOX` | Accept requests without delivering (default: off) |
//! | `SENDGRID_TRACK_OPENS` | Open tracking default (default: on) |
//! | `SENDGRID_TRACK_CLICKS_HTML` | Click tracking in HTML bodies (default: on) |
//! | `SENDGRID_TRACK_CLICKS_PLAIN` | Click tracking in text bodies (default: on) |
//! | `SENDGRID_FAIL_SILENTLY` | Batch sends skip failed messages (default: off) |
//! | `EMAIL_FROM` | Default sender email |
//! | `EMAIL_FROM_NAME` | Default sender name |

/// The version of the gridmail crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod address;
mod attachment;
mod error;
mod mailer;
mod message;

pub mod sendgrid;

use parking_lot::RwLock;
use std::env;
use std::sync::Arc;

// Re-exports
pub use address::{Address, ToAddress};
pub use attachment::{Attachment, Disposition};
pub use error::MailError;
pub use mailer::{DeliveryResult, Mailer};
pub use message::Message;
pub use sendgrid::{MailRequest, Personalization, SendGridBackend, UnsubscribeGroup};

// ============================================================================
// Global Mailer Configuration
// ============================================================================

/// Global mailer - swappable for testing
static MAILER: RwLock<Option<Arc<dyn Mailer>>> = RwLock::new(None);

/// Get the default from address from environment.
pub fn default_from() -> Option<Address> {
    let email = env::var("EMAIL_FROM").ok()?;
    match env::var("EMAIL_FROM_NAME").ok() {
        Some(name) => Some(Address::with_name(name, email)),
        None => Some(Address::new(email)),
    }
}

/// Get or initialize the global mailer.
fn get_mailer() -> Result<Arc<dyn Mailer>, MailError> {
    // Fast path: already configured
    {
        let guard = MAILER.read();
        if let Some(ref mailer) = *guard {
            return Ok(Arc::clone(mailer));
        }
    }

    // Slow path: need to configure
    let mailer: Arc<dyn Mailer> = Arc::new(SendGridBackend::from_env()?);
    let mut guard = MAILER.write();

    // Double-check after acquiring write lock
    if guard.is_none() {
        *guard = Some(Arc::clone(&mailer));
    }

    Ok(guard.as_ref().map(Arc::clone).unwrap_or(mailer))
}

/// Check if the backend is configured.
///
/// Returns `true` when a mailer has been set with [`configure`] or the
/// `SENDGRID_API_KEY` environment variable is present.
pub fn is_configured() -> bool {
    if MAILER.read().is_some() {
        return true;
    }
    env::var("SENDGRID_API_KEY").is_ok()
}

/// Initialize the global mailer from environment variables.
///
/// Call this at startup if you want configuration errors early instead of
/// on the first `deliver()`.
///
/// ```rust,ignore
/// // In main.rs
/// gridmail::init().ok(); // Ignore error if email not configured
/// ```
pub fn init() -> Result<(), MailError> {
    if !is_configured() {
        return Err(MailError::NotConfigured);
    }
    let mailer = get_mailer()?;
    mailer.validate_config()
}

/// Validate a message has required fields.
fn validate(message: &Message) -> Result<(), MailError> {
    if message.from.is_none() && default_from().is_none() {
        return Err(MailError::MissingField("from"));
    }
    if !message.has_recipients() {
        return Err(MailError::MissingField("to"));
    }
    Ok(())
}

/// Prepare a message by adding the default from address if needed.
fn prepare(message: &Message) -> Message {
    if message.from.is_none() {
        if let Some(from) = default_from() {
            let mut prepared = message.clone();
            prepared.from = Some(from);
            return prepared;
        }
    }
    message.clone()
}

/// Deliver a message using the global mailer.
///
/// Auto-configures from environment variables on first call. Validates
/// required fields (`from`, recipients) before sending, and fills in the
/// default `from` address from `EMAIL_FROM` when the message has none.
pub async fn deliver(message: &Message) -> Result<DeliveryResult, MailError> {
    let mailer = get_mailer()?;
    deliver_with(message, mailer.as_ref()).await
}

/// Deliver a message using a specific mailer (per-call override).
///
/// Useful for testing or sending with a differently-configured backend.
pub async fn deliver_with<M: Mailer + ?Sized>(
    message: &Message,
    mailer: &M,
) -> Result<DeliveryResult, MailError> {
    validate(message)?;
    let message = prepare(message);

    let span = tracing::info_span!(
        "gridmail.deliver",
        provider = mailer.provider_name(),
        to = ?message.to.iter().map(|a| &a.email).collect::<Vec<_>>(),
        subject = %message.subject,
    );
    let _guard = span.enter();

    tracing::debug!("Delivering message");

    let result = mailer.deliver(&message).await;

    match &result {
        Ok(r) => tracing::info!(status = r.status, message_id = ?r.message_id, "Message accepted"),
        Err(e) => tracing::error!(error = %e, "Delivery failed"),
    }

    result
}

/// Send a batch of messages using the global mailer, returning how many
/// were accepted.
///
/// Error handling follows the backend's `fail_silently` setting: failed
/// messages are either skipped (and logged) or abort the batch.
pub async fn send_messages(messages: &[Message]) -> Result<usize, MailError> {
    for message in messages {
        validate(message)?;
    }

    let mailer = get_mailer()?;
    let messages: Vec<Message> = messages.iter().map(prepare).collect();

    let span = tracing::info_span!(
        "gridmail.send_messages",
        provider = mailer.provider_name(),
        count = messages.len(),
    );
    let _guard = span.enter();

    let sent = mailer.send_messages(&messages).await?;
    tracing::info!(sent = sent, total = messages.len(), "Batch finished");
    Ok(sent)
}

// ============================================================================
// Manual Configuration (for testing or custom setups)
// ============================================================================

/// Manually configure the global mailer.
///
/// Can be called multiple times - later calls replace the previous mailer.
///
/// ```rust,ignore
/// use gridmail::{configure, SendGridBackend};
///
/// configure(SendGridBackend::new("SG.xxxxx").sandbox(true));
/// ```
pub fn configure<M: Mailer + 'static>(mailer: M) {
    let mut guard = MAILER.write();
    *guard = Some(Arc::new(mailer));
}

/// Configure with an Arc'd mailer.
pub fn configure_arc(mailer: Arc<dyn Mailer>) {
    let mut guard = MAILER.write();
    *guard = Some(mailer);
}

/// Reset the global mailer (useful for tests).
///
/// After calling this, the next `deliver()` will re-initialize from env vars.
pub fn reset() {
    let mut guard = MAILER.write();
    *guard = None;
}

/// Get a reference to the configured mailer (if initialized).
pub fn mailer() -> Option<Arc<dyn Mailer>> {
    let guard = MAILER.read();
    guard.as_ref().cloned()
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::Address;
    pub use crate::Attachment;
    pub use crate::DeliveryResult;
    pub use crate::MailError;
    pub use crate::Mailer;
    pub use crate::Message;
    pub use crate::SendGridBackend;
    pub use crate::ToAddress;
    pub use crate::{default_from, deliver, deliver_with, is_configured, send_messages};
}
