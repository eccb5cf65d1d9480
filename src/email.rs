//! Email address validation and the outgoing mail collaborator.
//!
//! Actual SMTP delivery is outside the scope of this crate. The [Mailer]
//! trait marks the seam: the server binary wires in [TracingMailer], which
//! records outgoing messages in the logs, and deployments with a real mail
//! relay can provide their own implementation.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::Error;

/// A validated email address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    /// Create and validate an email address.
    ///
    /// # Errors
    ///
    /// This function will return an error if `raw_email` is not a valid
    /// email address.
    pub fn new(raw_email: &str) -> Result<Self, Error> {
        let trimmed = raw_email.trim();
        let mut parts = trimmed.splitn(2, '@');
        let local = parts.next().unwrap_or_default();
        let domain = parts.next().unwrap_or_default();

        if local.is_empty() || domain.is_empty() || !domain.contains('.') {
            return Err(Error::InvalidEmail(raw_email.to_string()));
        }

        Ok(Self(trimmed.to_lowercase()))
    }

    /// Create a new `Email` without any validation.
    ///
    /// The caller should ensure that `raw_email` is a correctly formatted
    /// email address, e.g. one read back from the database. For emails
    /// coming from the user this function should **not** be used, instead
    /// use the checked version.
    pub fn new_unchecked(raw_email: &str) -> Self {
        Self(raw_email.to_string())
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The outgoing mail collaborator used for password reset codes.
pub trait Mailer: Send + Sync {
    /// Deliver a plain-text message to `recipient`.
    ///
    /// # Errors
    ///
    /// Returns [Error::MailError] if the message could not be handed off.
    fn send(&self, recipient: &Email, subject: &str, body: &str) -> Result<(), Error>;
}

/// A [Mailer] that records outgoing messages in the server logs instead of
/// delivering them.
#[derive(Debug, Clone, Default)]
pub struct TracingMailer;

impl Mailer for TracingMailer {
    fn send(&self, recipient: &Email, subject: &str, body: &str) -> Result<(), Error> {
        tracing::info!("outgoing mail to {recipient}: {subject}\n{body}");
        Ok(())
    }
}

#[cfg(test)]
mod email_tests {
    use crate::Error;

    use super::Email;

    #[test]
    fn create_email_success() {
        let email = Email::new("foo@bar.baz");

        assert!(email.is_ok());
    }

    #[test]
    fn create_email_lowercases_and_trims() {
        let email = Email::new("  Foo@Bar.Baz ").unwrap();

        assert_eq!(email.as_ref(), "foo@bar.baz");
    }

    #[test]
    fn create_email_fails_with_no_at_symbol() {
        let email = Email::new("foobar.baz");

        assert!(matches!(email, Err(Error::InvalidEmail(_))));
    }

    #[test]
    fn create_email_fails_with_no_domain_dot() {
        let email = Email::new("foo@bar");

        assert!(matches!(email, Err(Error::InvalidEmail(_))));
    }
}
