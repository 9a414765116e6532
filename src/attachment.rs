//! Email attachments with support for inline content.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::MailError;

/// Attachment disposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Disposition {
    /// Regular attachment (shown as downloadable file)
    #[default]
    Attachment,
    /// Inline attachment (embedded in HTML via cid:)
    Inline,
}

/// An email attachment.
///
/// # Examples
///
/// ```
/// use gridmail::Attachment;
///
/// let report = Attachment::from_bytes("report.pdf", b"PDF content".to_vec())
///     .content_type("application/pdf");
///
/// // Inline image for HTML emails; reference it as <img src="cid:company-logo">
/// let logo = Attachment::from_bytes("logo.png", vec![0x89, 0x50, 0x4E, 0x47])
///     .inline()
///     .content_id("company-logo");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    /// Filename for the attachment
    pub filename: String,
    /// MIME content type (e.g., "application/pdf", "image/png")
    pub content_type: String,
    /// Raw attachment data
    pub data: Vec<u8>,
    /// Whether this is an inline or regular attachment
    pub disposition: Disposition,
    /// Content-ID for inline attachments (used as cid: reference)
    pub content_id: Option<String>,
}

impl Attachment {
    /// Create a new attachment from raw bytes.
    ///
    /// Content type is guessed from the filename extension.
    pub fn from_bytes(filename: impl Into<String>, data: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = mime_guess::from_path(&filename)
            .first_or_octet_stream()
            .to_string();

        Self {
            filename,
            content_type,
            data,
            disposition: Disposition::Attachment,
            content_id: None,
        }
    }

    /// Create a new attachment from a file path.
    ///
    /// Reads the file immediately and guesses the content type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MailError> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("attachment")
            .to_string();

        let data = std::fs::read(path)
            .map_err(|e| MailError::Attachment(format!("{}: {}", path.display(), e)))?;

        Ok(Self::from_bytes(filename, data))
    }

    /// Create an attachment for content that has no filename of its own
    /// (e.g., a raw MIME part or generated image).
    ///
    /// A unique `part-<id>` filename is generated, with the extension derived
    /// from the content type when one is known.
    pub fn unnamed(data: Vec<u8>, content_type: impl Into<String>) -> Self {
        let content_type = content_type.into();
        let ext = mime_guess::get_mime_extensions_str(&content_type)
            .and_then(|exts| exts.first())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();
        let filename = format!("part-{}{}", uuid::Uuid::new_v4().simple(), ext);

        Self {
            filename,
            content_type,
            data,
            disposition: Disposition::Attachment,
            content_id: None,
        }
    }

    /// Set the content type explicitly.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Set as inline attachment (for embedding in HTML).
    pub fn inline(mut self) -> Self {
        self.disposition = Disposition::Inline;
        // Auto-generate content_id from filename if not set
        if self.content_id.is_none() {
            self.content_id = Some(self.filename.clone());
        }
        self
    }

    /// Set the Content-ID for inline attachments.
    ///
    /// Mail libraries often carry the value in MIME header form (`<cid>`);
    /// surrounding angle brackets are stripped here because SendGrid adds
    /// its own. Setting a Content-ID marks the attachment inline.
    pub fn content_id(mut self, cid: impl Into<String>) -> Self {
        let cid = cid.into();
        let cid = cid
            .strip_prefix('<')
            .and_then(|s| s.strip_suffix('>'))
            .unwrap_or(&cid);
        self.content_id = Some(cid.to_string());
        self.disposition = Disposition::Inline;
        self
    }

    /// Get the attachment data as a base64-encoded string (standard alphabet).
    pub fn base64_data(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Get the size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Check if this is an inline attachment.
    pub fn is_inline(&self) -> bool {
        self.disposition == Disposition::Inline
    }
}
