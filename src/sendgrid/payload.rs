//! Serde types mirroring the v3 Mail Send request body.
//!
//! Optional fields are omitted from the JSON rather than sent as `null`;
//! the API rejects explicit nulls in several places.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::address::Address;
use crate::error::MailError;

/// One personalization: a group of recipients plus the per-recipient
/// overrides (subject, headers, substitutions, custom args, send time)
/// applied to them.
///
/// Normally built from a [`Message`](crate::Message)'s recipient lists, but
/// can also be constructed directly (or deserialized from a JSON object via
/// [`Personalization::from_value`]) and attached to a message to fan one
/// send out to multiple recipient groups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Personalization {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<Address>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<Address>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub substitutions: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_args: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_template_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_at: Option<i64>,
}

impl Personalization {
    /// Build a personalization from a JSON object in the wire format.
    ///
    /// Unknown keys are ignored.
    pub fn from_value(value: Value) -> Result<Self, MailError> {
        serde_json::from_value(value).map_err(Into::into)
    }

    /// The API requires every personalization to carry at least one `to`
    /// recipient; cc and bcc alone do not count.
    pub fn has_recipients(&self) -> bool {
        !self.to.is_empty()
    }
}

/// Unsubscribe group (ASM) settings.
///
/// `group_id` is mandatory by construction, which is the API's own rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsubscribeGroup {
    pub group_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups_to_display: Option<Vec<i64>>,
}

impl UnsubscribeGroup {
    /// Create settings for a single unsubscribe group.
    pub fn new(group_id: i64) -> Self {
        Self {
            group_id,
            groups_to_display: None,
        }
    }

    /// Set the groups shown on the subscription preferences page.
    pub fn groups_to_display(mut self, groups: Vec<i64>) -> Self {
        self.groups_to_display = Some(groups);
        self
    }
}

/// One body part. Ordering matters: text/plain must precede text/html.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(rename = "type")]
    pub content_type: String,
    pub value: String,
}

impl Content {
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            content_type: "text/plain".to_string(),
            value: value.into(),
        }
    }

    pub fn html(value: impl Into<String>) -> Self {
        Self {
            content_type: "text/html".to_string(),
            value: value.into(),
        }
    }
}

/// Wire form of an attachment: base64 content plus metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentPayload {
    /// Base64-encoded file content
    pub content: String,
    pub filename: String,
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disposition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
}

/// The complete Mail Send request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailRequest {
    pub personalizations: Vec<Personalization>,
    pub from: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Content>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asm: Option<UnsubscribeGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_pool_name: Option<String>,
    pub mail_settings: Value,
    pub tracking_settings: Value,
}

/// Error body returned by the API on non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    pub message: String,
    #[allow(dead_code)]
    pub field: Option<String>,
    #[allow(dead_code)]
    pub help: Option<String>,
}
