//! SendGrid v3 Mail Send backend.
//!
//! # Example
//!
//! ```rust,ignore
//! use gridmail::{Message, Mailer, SendGridBackend};
//!
//! let backend = SendGridBackend::new("SG.xxxxx").sandbox(true);
//!
//! let message = Message::new()
//!     .from("Sam Smith <sam.smith@example.com>")
//!     .to("john.doe@example.com")
//!     .subject("Hello!")
//!     .text_body("Hello, World!");
//!
//! let result = backend.deliver(&message).await?;
//! println!("accepted with status {}", result.status);
//! ```

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use reqwest::Client;
use serde_json::json;
use std::collections::HashMap;
use std::env;
use std::io::Write;

use crate::address::Address;
use crate::error::MailError;
use crate::mailer::{DeliveryResult, Mailer};
use crate::message::Message;

mod payload;

pub use payload::{AttachmentPayload, Content, MailRequest, Personalization, UnsubscribeGroup};

use payload::ApiErrorBody;

const SENDGRID_API_URL: &str = "https://api.sendgrid.com";

/// SendGrid Mail Send backend.
///
/// Holds the API key, the tracking defaults applied to every message that
/// does not override them, and the sandbox flag. Construct with
/// [`SendGridBackend::new`] or [`SendGridBackend::from_env`].
pub struct SendGridBackend {
    api_key: String,
    client: Client,
    base_url: String,
    sandbox: bool,
    track_opens: bool,
    track_clicks_html: bool,
    track_clicks_plain: bool,
    fail_silently: bool,
    compress: bool,
}

impl SendGridBackend {
    /// Create a new backend with the given API key.
    ///
    /// Defaults: sandbox off, open and click tracking on (html and plain),
    /// errors propagate from batch sends, no request compression.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: Client::new(),
            base_url: SENDGRID_API_URL.to_string(),
            sandbox: false,
            track_opens: true,
            track_clicks_html: true,
            track_clicks_plain: true,
            fail_silently: false,
            compress: false,
        }
    }

    /// Create a backend from environment variables.
    ///
    /// `SENDGRID_API_KEY` is required. `SENDGRID_SANDBOX`,
    /// `SENDGRID_TRACK_OPENS`, `SENDGRID_TRACK_CLICKS_HTML`,
    /// `SENDGRID_TRACK_CLICKS_PLAIN`, and `SENDGRID_FAIL_SILENTLY` are
    /// optional booleans (`1`/`true`/`yes`/`on` and their negations).
    pub fn from_env() -> Result<Self, MailError> {
        let api_key = env::var("SENDGRID_API_KEY").map_err(|_| {
            MailError::Configuration(
                "SENDGRID_API_KEY not set. Set it, or pass an api key to SendGridBackend::new."
                    .into(),
            )
        })?;

        let mut backend = Self::new(api_key);
        if let Some(sandbox) = env_flag("SENDGRID_SANDBOX")? {
            backend = backend.sandbox(sandbox);
        }
        if let Some(opens) = env_flag("SENDGRID_TRACK_OPENS")? {
            backend = backend.track_opens(opens);
        }
        let html = env_flag("SENDGRID_TRACK_CLICKS_HTML")?.unwrap_or(backend.track_clicks_html);
        let plain = env_flag("SENDGRID_TRACK_CLICKS_PLAIN")?.unwrap_or(backend.track_clicks_plain);
        backend = backend.track_clicks(html, plain);
        if let Some(silently) = env_flag("SENDGRID_FAIL_SILENTLY")? {
            backend = backend.fail_silently(silently);
        }
        Ok(backend)
    }

    /// Create with a custom reqwest client.
    pub fn with_client(api_key: impl Into<String>, client: Client) -> Self {
        Self {
            client,
            ..Self::new(api_key)
        }
    }

    /// Set a custom base URL (for testing).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Enable sandbox mode: the API validates and accepts requests but does
    /// not deliver them.
    pub fn sandbox(mut self, enabled: bool) -> Self {
        if enabled && !self.sandbox {
            tracing::warn!("SendGrid backend is in sandbox mode; messages will not be delivered");
        }
        self.sandbox = enabled;
        self
    }

    /// Set the default for open tracking.
    pub fn track_opens(mut self, enabled: bool) -> Self {
        self.track_opens = enabled;
        self
    }

    /// Set the defaults for click tracking in HTML and plain text bodies.
    pub fn track_clicks(mut self, html: bool, plain: bool) -> Self {
        self.track_clicks_html = html;
        self.track_clicks_plain = plain;
        self
    }

    /// Make batch sends log and skip failed messages instead of erroring.
    pub fn fail_silently(mut self, enabled: bool) -> Self {
        self.fail_silently = enabled;
        self
    }

    /// Enable gzip compression for requests.
    pub fn compress(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    /// Whether sandbox mode is enabled.
    pub fn is_sandbox(&self) -> bool {
        self.sandbox
    }

    /// Translate a message into the Mail Send request body.
    ///
    /// This is where all provider rules are applied: recipient and reply-to
    /// validation, content ordering, template gating, attachment encoding,
    /// and the sandbox/tracking settings injection. Exposed publicly so the
    /// payload can be inspected without performing the HTTP call.
    pub fn build_payload(&self, message: &Message) -> Result<MailRequest, MailError> {
        let from = message.from.clone().ok_or(MailError::MissingField("from"))?;

        // A Reply-To header folds into the top-level reply_to field; every
        // other header rides on the personalization.
        let mut header_reply_to = None;
        let mut extra_headers = HashMap::new();
        for (name, value) in &message.headers {
            if name.eq_ignore_ascii_case("reply-to") {
                header_reply_to = Some(Address::parse_mailbox(value));
            } else {
                extra_headers.insert(name.clone(), value.clone());
            }
        }
        let reply_to = resolve_reply_to(message, header_reply_to)?;

        // With a dynamic template the subject usually lives in the template
        // data; an empty subject is omitted rather than sent as "".
        let subject = if message.subject.is_empty() {
            None
        } else {
            Some(message.subject.clone())
        };

        let personalizations = if !message.personalizations.is_empty() {
            for personalization in &message.personalizations {
                if !personalization.has_recipients() {
                    return Err(MailError::Payload(
                        "each personalization must have at least one `to` recipient".into(),
                    ));
                }
            }
            message.personalizations.clone()
        } else {
            if message.to.is_empty() {
                return Err(MailError::Payload(
                    "message has no recipients: set `to` or provide personalizations".into(),
                ));
            }
            vec![self.build_personalization(message, subject.clone(), extra_headers)]
        };

        // text/plain must come before text/html. The API rejects empty
        // content values, so an explicitly empty text body is sent as a
        // single space, and html-only messages get a space text part.
        let mut content = Vec::new();
        match (&message.text_body, &message.html_body) {
            (Some(text), html) => {
                content.push(Content::plain(if text.is_empty() {
                    " ".to_string()
                } else {
                    text.clone()
                }));
                if let Some(html) = html {
                    content.push(Content::html(html.clone()));
                }
            }
            (None, Some(html)) => {
                content.push(Content::plain(" "));
                content.push(Content::html(html.clone()));
            }
            // Without a template there is nothing to render a bodiless
            // message from; the API would reject it with a 400.
            (None, None) => {
                if message.template_id.is_none() {
                    return Err(MailError::Payload(
                        "message has no content: set a text or html body, or use a template"
                            .into(),
                    ));
                }
            }
        }

        let attachments = message
            .attachments
            .iter()
            .map(|a| AttachmentPayload {
                content: a.base64_data(),
                filename: a.filename.clone(),
                content_type: a.content_type.clone(),
                disposition: a.is_inline().then(|| "inline".to_string()),
                content_id: a.content_id.clone(),
            })
            .collect();

        if let Some(name) = &message.ip_pool_name {
            let len = name.chars().count();
            if !(2..=64).contains(&len) {
                return Err(MailError::Payload(format!(
                    "ip_pool_name must be between 2 and 64 characters, got {}",
                    len
                )));
            }
        }

        // Message-level mail_settings pass through with the sandbox flag
        // written on top.
        let mut mail_settings = match &message.mail_settings {
            Some(serde_json::Value::Object(map)) => map.clone(),
            Some(_) => {
                return Err(MailError::Payload("mail_settings must be a JSON object".into()));
            }
            None => serde_json::Map::new(),
        };
        mail_settings.insert("sandbox_mode".into(), json!({ "enable": self.sandbox }));

        // A message-level tracking_settings object replaces the backend
        // defaults entirely.
        let tracking_settings = match &message.tracking_settings {
            Some(settings) => settings.clone(),
            None => json!({
                "open_tracking": { "enable": self.track_opens },
                "click_tracking": {
                    "enable": self.track_clicks_html,
                    "enable_text": self.track_clicks_plain,
                },
            }),
        };

        Ok(MailRequest {
            personalizations,
            from,
            reply_to,
            subject,
            content,
            attachments,
            template_id: message.template_id.clone(),
            categories: message.categories.clone(),
            asm: message.asm.clone(),
            ip_pool_name: message.ip_pool_name.clone(),
            mail_settings: serde_json::Value::Object(mail_settings),
            tracking_settings,
        })
    }

    fn build_personalization(
        &self,
        message: &Message,
        subject: Option<String>,
        headers: HashMap<String, String>,
    ) -> Personalization {
        let mut personalization = Personalization {
            to: message.to.clone(),
            cc: message.cc.clone(),
            bcc: message.bcc.clone(),
            subject,
            headers,
            custom_args: message.custom_args.clone(),
            send_at: message.send_at,
            ..Default::default()
        };

        // Substitutions and dynamic template data only make sense with a
        // template; without one they are dropped.
        if message.template_id.is_some() {
            personalization.substitutions = message.substitutions.clone();
            personalization.dynamic_template_data = message.dynamic_template_data.clone();
        }

        personalization
    }

    fn compress_body(&self, body: &[u8]) -> Result<Vec<u8>, MailError> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(body)
            .map_err(|e| MailError::Payload(format!("failed to compress body: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| MailError::Payload(format!("failed to finish compression: {}", e)))
    }
}

/// SendGrid accepts exactly one reply-to address. It can arrive through the
/// `reply_to` field or a `Reply-To` header; when both are set they must
/// agree on name and email.
fn resolve_reply_to(
    message: &Message,
    from_header: Option<Address>,
) -> Result<Option<Address>, MailError> {
    if message.reply_to.len() > 1 {
        return Err(MailError::Payload(
            "SendGrid allows a single reply-to address".into(),
        ));
    }

    match (message.reply_to.first(), from_header) {
        (Some(field), Some(header)) => {
            if *field != header {
                return Err(MailError::Payload(
                    "Reply-To header does not match the reply_to field".into(),
                ));
            }
            Ok(Some(header))
        }
        (Some(field), None) => Ok(Some(field.clone())),
        (None, from_header) => Ok(from_header),
    }
}

fn env_flag(name: &str) -> Result<Option<bool>, MailError> {
    match env::var(name) {
        Ok(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(MailError::Configuration(format!(
                "{} must be a boolean, got '{}'",
                name, value
            ))),
        },
        Err(_) => Ok(None),
    }
}

#[async_trait]
impl Mailer for SendGridBackend {
    async fn deliver(&self, message: &Message) -> Result<DeliveryResult, MailError> {
        let request = self.build_payload(message)?;

        let url = format!("{}/v3/mail/send", self.base_url);
        let json_body = serde_json::to_vec(&request)?;

        let mut req = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("User-Agent", format!("gridmail/{}", crate::VERSION));

        let body = if self.compress {
            req = req.header("Content-Encoding", "gzip");
            self.compress_body(&json_body)?
        } else {
            json_body
        };

        let response = req.body(body).send().await?;
        let status = response.status();

        // The API returns 202 Accepted on success with an empty body; the
        // assigned id only appears in the X-Message-Id header.
        if status.is_success() {
            let message_id = response
                .headers()
                .get("X-Message-Id")
                .and_then(|v| v.to_str().ok());

            Ok(match message_id {
                Some(id) => DeliveryResult::with_message_id(status.as_u16(), id),
                None => DeliveryResult::new(status.as_u16()),
            })
        } else {
            let error: ApiErrorBody = response.json().await.unwrap_or(ApiErrorBody {
                errors: vec![payload::ApiErrorDetail {
                    message: "Unknown error".to_string(),
                    field: None,
                    help: None,
                }],
            });

            let error_msg = error
                .errors
                .iter()
                .map(|e| e.message.clone())
                .collect::<Vec<_>>()
                .join("; ");

            Err(MailError::api(error_msg, status.as_u16()))
        }
    }

    fn fail_silently(&self) -> bool {
        self.fail_silently
    }

    fn provider_name(&self) -> &'static str {
        "sendgrid"
    }

    fn validate_config(&self) -> Result<(), MailError> {
        if self.api_key.is_empty() {
            return Err(MailError::Configuration("SendGrid api key is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_flag_parses_booleans() {
        // env_flag reads the process environment; exercise the parser on
        // names that are certainly unset plus a controlled one.
        assert_eq!(env_flag("GRIDMAIL_TEST_UNSET_FLAG").unwrap(), None);

        env::set_var("GRIDMAIL_TEST_FLAG_ON", "Yes");
        assert_eq!(env_flag("GRIDMAIL_TEST_FLAG_ON").unwrap(), Some(true));
        env::set_var("GRIDMAIL_TEST_FLAG_OFF", "0");
        assert_eq!(env_flag("GRIDMAIL_TEST_FLAG_OFF").unwrap(), Some(false));
        env::set_var("GRIDMAIL_TEST_FLAG_BAD", "maybe");
        assert!(env_flag("GRIDMAIL_TEST_FLAG_BAD").is_err());

        env::remove_var("GRIDMAIL_TEST_FLAG_ON");
        env::remove_var("GRIDMAIL_TEST_FLAG_OFF");
        env::remove_var("GRIDMAIL_TEST_FLAG_BAD");
    }

    #[test]
    fn from_env_requires_api_key_and_applies_flags() {
        env::remove_var("SENDGRID_API_KEY");
        match SendGridBackend::from_env() {
            Err(MailError::Configuration(msg)) => assert!(msg.contains("SENDGRID_API_KEY")),
            other => panic!("expected Configuration error, got {:?}", other.err()),
        }

        env::set_var("SENDGRID_API_KEY", "SG.from-env");
        env::set_var("SENDGRID_SANDBOX", "true");
        env::set_var("SENDGRID_TRACK_OPENS", "off");
        env::set_var("SENDGRID_TRACK_CLICKS_HTML", "yes");
        env::set_var("SENDGRID_TRACK_CLICKS_PLAIN", "0");
        env::set_var("SENDGRID_FAIL_SILENTLY", "1");

        let backend = SendGridBackend::from_env().unwrap();
        assert_eq!(backend.api_key, "SG.from-env");
        assert!(backend.sandbox);
        assert!(!backend.track_opens);
        assert!(backend.track_clicks_html);
        assert!(!backend.track_clicks_plain);
        assert!(backend.fail_silently);

        env::set_var("SENDGRID_SANDBOX", "maybe");
        assert!(SendGridBackend::from_env().is_err());

        for name in [
            "SENDGRID_API_KEY",
            "SENDGRID_SANDBOX",
            "SENDGRID_TRACK_OPENS",
            "SENDGRID_TRACK_CLICKS_HTML",
            "SENDGRID_TRACK_CLICKS_PLAIN",
            "SENDGRID_FAIL_SILENTLY",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn sandbox_builder_sets_flag() {
        assert!(!SendGridBackend::new("stub").is_sandbox());
        assert!(SendGridBackend::new("stub").sandbox(true).is_sandbox());
    }

    #[test]
    fn reply_to_conflicts_are_rejected() {
        let message = Message::new()
            .from("sam.smith@example.com")
            .to("john.doe@example.com")
            .text_body("Hello")
            .reply_to("Sam Smith <sam.smith@example.com>")
            .header("Reply-To", "Stephanie Smith <stephanie.smith@example.com>");

        let backend = SendGridBackend::new("stub");
        assert!(backend.build_payload(&message).is_err());

        // Same email with a different display name still conflicts.
        let message = Message::new()
            .from("sam.smith@example.com")
            .to("john.doe@example.com")
            .text_body("Hello")
            .reply_to("Sam Smith <sam.smith@example.com>")
            .header("Reply-To", "Bad Name <sam.smith@example.com>");
        assert!(backend.build_payload(&message).is_err());

        // Matching header and field are fine.
        let message = Message::new()
            .from("sam.smith@example.com")
            .to("john.doe@example.com")
            .text_body("Hello")
            .reply_to("Sam Smith <sam.smith@example.com>")
            .header("Reply-To", "Sam Smith <sam.smith@example.com>");
        let payload = backend.build_payload(&message).unwrap();
        assert_eq!(
            payload.reply_to,
            Some(Address::with_name("Sam Smith", "sam.smith@example.com"))
        );
    }

    #[test]
    fn validate_config_rejects_empty_key() {
        assert!(SendGridBackend::new("").validate_config().is_err());
        assert!(SendGridBackend::new("SG.key").validate_config().is_ok());
    }
}
