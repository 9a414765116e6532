//! Outgoing message struct with builder pattern.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::address::{Address, ToAddress};
use crate::attachment::Attachment;
use crate::sendgrid::{Personalization, UnsubscribeGroup};

/// An outgoing email message.
///
/// Use the builder pattern to construct messages:
///
/// ```
/// use gridmail::Message;
///
/// let message = Message::new()
///     .from("Sam Smith <sam.smith@example.com>")
///     .to("john.doe@example.com")
///     .subject("Hello!")
///     .text_body("Plain text content")
///     .html_body("<h1>HTML content</h1>");
/// ```
///
/// Beyond the generic fields (`from`, `to`, `cc`, `bcc`, `reply_to`,
/// `subject`, bodies, `attachments`, `headers`), the message carries
/// SendGrid-specific ones: dynamic/legacy templating, custom args,
/// categories, unsubscribe groups, IP pool selection, scheduled sends, and
/// raw `mail_settings`/`tracking_settings` overrides. The translation into
/// the Mail Send payload happens in
/// [`SendGridBackend::build_payload`](crate::SendGridBackend::build_payload).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    /// Sender address
    pub from: Option<Address>,
    /// Primary recipients
    pub to: Vec<Address>,
    /// Carbon copy recipients
    pub cc: Vec<Address>,
    /// Blind carbon copy recipients
    pub bcc: Vec<Address>,
    /// Reply-to addresses. SendGrid accepts at most one; more is a build error.
    pub reply_to: Vec<Address>,
    /// Subject line
    pub subject: String,
    /// Plain text body
    pub text_body: Option<String>,
    /// HTML body
    pub html_body: Option<String>,
    /// File attachments
    pub attachments: Vec<Attachment>,
    /// Custom email headers. A `Reply-To` header is folded into the
    /// payload's reply-to; everything else rides on the personalization.
    pub headers: HashMap<String, String>,
    /// Transactional template ID (`d-...` for dynamic templates)
    pub template_id: Option<String>,
    /// Variables for dynamic (Handlebars) templates
    pub dynamic_template_data: Option<serde_json::Value>,
    /// Tag/value pairs for legacy templates
    pub substitutions: HashMap<String, String>,
    /// Custom args echoed back in event webhooks
    pub custom_args: HashMap<String, String>,
    /// Categories for stats grouping
    pub categories: Vec<String>,
    /// Unsubscribe group (ASM) settings
    pub asm: Option<UnsubscribeGroup>,
    /// Name of the IP pool to send from (2..=64 characters)
    pub ip_pool_name: Option<String>,
    /// Unix timestamp for a scheduled send
    pub send_at: Option<i64>,
    /// Raw `mail_settings` object. The backend writes its sandbox flag into
    /// this object, preserving other keys.
    pub mail_settings: Option<serde_json::Value>,
    /// Raw `tracking_settings` object. Replaces the backend's tracking
    /// defaults when set.
    pub tracking_settings: Option<serde_json::Value>,
    /// Explicit personalizations. When non-empty, these replace the
    /// personalization built from `to`/`cc`/`bcc` entirely.
    pub personalizations: Vec<Personalization>,
}

impl Message {
    /// Create a new empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sender address.
    ///
    /// Accepts anything that implements `ToAddress`:
    /// - `"email@example.com"` or `"Name <email@example.com>"`
    /// - `("Name", "email@example.com")`
    /// - Custom types that implement `ToAddress`
    pub fn from(mut self, addr: impl ToAddress) -> Self {
        self.from = Some(addr.to_address());
        self
    }

    /// Add a recipient. Can be called multiple times.
    pub fn to(mut self, addr: impl ToAddress) -> Self {
        self.to.push(addr.to_address());
        self
    }

    /// Replace all recipients.
    pub fn put_to(mut self, addrs: Vec<Address>) -> Self {
        self.to = addrs;
        self
    }

    /// Add a CC recipient.
    pub fn cc(mut self, addr: impl ToAddress) -> Self {
        self.cc.push(addr.to_address());
        self
    }

    /// Add a BCC recipient.
    pub fn bcc(mut self, addr: impl ToAddress) -> Self {
        self.bcc.push(addr.to_address());
        self
    }

    /// Add a reply-to address.
    pub fn reply_to(mut self, addr: impl ToAddress) -> Self {
        self.reply_to.push(addr.to_address());
        self
    }

    /// Set the subject line.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Set the plain text body.
    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        self.text_body = Some(body.into());
        self
    }

    /// Set the HTML body.
    pub fn html_body(mut self, body: impl Into<String>) -> Self {
        self.html_body = Some(body.into());
        self
    }

    /// Add an attachment.
    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Add a custom header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the transactional template ID.
    pub fn template_id(mut self, id: impl Into<String>) -> Self {
        self.template_id = Some(id.into());
        self
    }

    /// Set the variables for a dynamic template.
    pub fn dynamic_template_data(mut self, data: impl Into<serde_json::Value>) -> Self {
        self.dynamic_template_data = Some(data.into());
        self
    }

    /// Add a legacy template substitution.
    pub fn substitution(mut self, tag: impl Into<String>, value: impl Into<String>) -> Self {
        self.substitutions.insert(tag.into(), value.into());
        self
    }

    /// Add a custom arg.
    pub fn custom_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_args.insert(key.into(), value.into());
        self
    }

    /// Add a category.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    /// Set the unsubscribe group (ASM).
    pub fn unsubscribe_group(mut self, group: UnsubscribeGroup) -> Self {
        self.asm = Some(group);
        self
    }

    /// Set the IP pool to send from.
    pub fn ip_pool_name(mut self, name: impl Into<String>) -> Self {
        self.ip_pool_name = Some(name.into());
        self
    }

    /// Schedule the send for a unix timestamp.
    pub fn send_at(mut self, timestamp: i64) -> Self {
        self.send_at = Some(timestamp);
        self
    }

    /// Set a raw `mail_settings` object (e.g., bypass list management).
    pub fn mail_settings(mut self, settings: impl Into<serde_json::Value>) -> Self {
        self.mail_settings = Some(settings.into());
        self
    }

    /// Set a raw `tracking_settings` object, replacing the backend defaults.
    pub fn tracking_settings(mut self, settings: impl Into<serde_json::Value>) -> Self {
        self.tracking_settings = Some(settings.into());
        self
    }

    /// Add an explicit personalization.
    ///
    /// When any are present they replace the personalization built from
    /// `to`/`cc`/`bcc`, and each must carry at least one `to` recipient.
    pub fn personalization(mut self, personalization: Personalization) -> Self {
        self.personalizations.push(personalization);
        self
    }

    /// Check if the message has all required fields for sending.
    pub fn is_valid(&self) -> bool {
        self.from.is_some() && self.has_recipients()
    }

    /// Check whether any recipient is set, either directly or through an
    /// explicit personalization.
    pub fn has_recipients(&self) -> bool {
        !self.to.is_empty() || self.personalizations.iter().any(|p| !p.to.is_empty())
    }

    /// Get all direct recipients (to + cc + bcc).
    pub fn all_recipients(&self) -> Vec<&Address> {
        self.to
            .iter()
            .chain(self.cc.iter())
            .chain(self.bcc.iter())
            .collect()
    }

    /// Check if the message has any attachments.
    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }
}
