//! Email address type with optional display name.

use crate::error::MailError;
use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An email address with an optional display name.
///
/// Serializes to the `{"email": .., "name": ..}` shape SendGrid expects,
/// with `name` omitted when absent.
///
/// # Examples
///
/// ```
/// use gridmail::Address;
///
/// // From an email string
/// let addr: Address = "user@example.com".into();
/// assert_eq!(addr.email, "user@example.com");
/// assert_eq!(addr.name, None);
///
/// // From an RFC 5322 mailbox string
/// let addr: Address = "Alice Smith <alice@example.com>".into();
/// assert_eq!(addr.email, "alice@example.com");
/// assert_eq!(addr.name, Some("Alice Smith".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Email address (e.g., "alice@example.com")
    pub email: String,
    /// Optional display name (e.g., "Alice Smith")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Address {
    /// Create a new address with just an email.
    pub fn new(email: impl Into<String>) -> Self {
        let email = email.into();

        // Basic sanity check - log warning for obviously invalid emails
        if !Self::basic_sanity_check(&email) {
            tracing::warn!(
                email = %email,
                "Creating address with potentially invalid email. Use Address::parse() for strict validation."
            );
        }

        Self { email, name: None }
    }

    /// Create a new address with a name and email.
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        let email = email.into();

        if !Self::basic_sanity_check(&email) {
            tracing::warn!(
                email = %email,
                "Creating address with potentially invalid email. Use Address::parse() for strict validation."
            );
        }

        Self {
            email,
            name: Some(name.into()),
        }
    }

    /// Returns true if the email passes basic checks (non-empty, contains @).
    /// This is NOT a full validation - use `Address::parse()` for that.
    fn basic_sanity_check(email: &str) -> bool {
        !email.is_empty() && email.contains('@')
    }

    /// Set the display name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Split an RFC 5322 mailbox string into display name and email.
    ///
    /// Accepts both the bare form (`alice@example.com`) and the angle-addr
    /// form (`Alice Smith <alice@example.com>`). Surrounding quotes on the
    /// display name are dropped; an empty display name becomes `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use gridmail::Address;
    ///
    /// let addr = Address::parse_mailbox("Sam Smith <sam.smith@example.com>");
    /// assert_eq!(addr.email, "sam.smith@example.com");
    /// assert_eq!(addr.name, Some("Sam Smith".to_string()));
    ///
    /// let addr = Address::parse_mailbox("jane.doe@example.com");
    /// assert_eq!(addr.name, None);
    /// ```
    pub fn parse_mailbox(mailbox: &str) -> Self {
        let trimmed = mailbox.trim();

        if let Some(open) = trimmed.rfind('<') {
            if let Some(stripped) = trimmed[open..].strip_prefix('<') {
                if let Some(email) = stripped.strip_suffix('>') {
                    let name = trimmed[..open].trim().trim_matches('"').trim();
                    return Self {
                        email: email.trim().to_string(),
                        name: if name.is_empty() {
                            None
                        } else {
                            Some(name.to_string())
                        },
                    };
                }
            }
        }

        Self {
            email: trimmed.to_string(),
            name: None,
        }
    }

    /// Parse and validate an email address.
    ///
    /// Uses RFC 5321/5322 compliant validation. Returns an error if the
    /// email address is invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use gridmail::Address;
    ///
    /// let addr = Address::parse("user@example.com").unwrap();
    /// assert_eq!(addr.email, "user@example.com");
    ///
    /// assert!(Address::parse("not-an-email").is_err());
    /// assert!(Address::parse("").is_err());
    /// ```
    pub fn parse(email: &str) -> Result<Self, MailError> {
        if !EmailAddress::is_valid(email) {
            return Err(MailError::InvalidAddress(format!(
                "'{}' is not a valid email address",
                email
            )));
        }

        Ok(Self {
            email: email.to_string(),
            name: None,
        })
    }

    /// Parse and validate an email address with a display name.
    pub fn parse_with_name(name: &str, email: &str) -> Result<Self, MailError> {
        let mut addr = Self::parse(email)?;
        if !name.is_empty() {
            addr.name = Some(name.to_string());
        }
        Ok(addr)
    }

    /// Format as an RFC 5322 mailbox string (`Name <email>` or bare email).
    pub fn formatted(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.formatted())
    }
}

impl From<&str> for Address {
    fn from(mailbox: &str) -> Self {
        Self::parse_mailbox(mailbox)
    }
}

impl From<String> for Address {
    fn from(mailbox: String) -> Self {
        Self::parse_mailbox(&mailbox)
    }
}

impl From<(&str, &str)> for Address {
    fn from((name, email): (&str, &str)) -> Self {
        Self::with_name(name, email)
    }
}

impl From<(String, String)> for Address {
    fn from((name, email): (String, String)) -> Self {
        Self::with_name(name, email)
    }
}

/// Conversion trait for flexible address inputs.
///
/// Implemented for strings (parsed as RFC 5322 mailboxes), `(name, email)`
/// tuples, and [`Address`] itself. Implement it for your own types to pass
/// them straight to the [`Message`](crate::Message) builder.
pub trait ToAddress {
    fn to_address(&self) -> Address;
}

impl<T: ToAddress> ToAddress for &T {
    fn to_address(&self) -> Address {
        (**self).to_address()
    }
}

impl ToAddress for Address {
    fn to_address(&self) -> Address {
        self.clone()
    }
}

impl ToAddress for &str {
    fn to_address(&self) -> Address {
        Address::parse_mailbox(self)
    }
}

impl ToAddress for String {
    fn to_address(&self) -> Address {
        Address::parse_mailbox(self)
    }
}

impl ToAddress for (&str, &str) {
    fn to_address(&self) -> Address {
        Address::with_name(self.0, self.1)
    }
}

impl ToAddress for (String, String) {
    fn to_address(&self) -> Address {
        Address::with_name(self.0.clone(), self.1.clone())
    }
}
