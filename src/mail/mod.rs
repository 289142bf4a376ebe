pub mod cursor;
pub mod decoders;
pub mod envelope;
pub mod error;
pub mod imap_client;
pub mod parts;

use crate::domain::email::{EmailBodies, EmailHead};

pub use cursor::EmailCursor;
pub use error::MailError;

/// What the resource layer needs from a mail account.
pub trait MailAccount: Send + Sync {
    fn mailbox(&self) -> &str;
    fn host(&self) -> &str;

    /// Messages received in the recent window, ids are sequence numbers.
    fn list_emails(&self) -> Result<EmailCursor, MailError>;

    /// `id` is interpreted as a UID.
    fn retrieve_email_head(&self, id: &str) -> Result<EmailHead, MailError>;

    /// `id` is interpreted as a UID. All inline parts or nothing.
    fn retrieve_email_body(&self, id: &str) -> Result<EmailBodies, MailError>;
}

/// Parses a positive integer message identifier.
pub fn parse_uid(id: &str) -> Result<u32, MailError> {
    match id.parse::<u32>() {
        Ok(uid) if uid > 0 => Ok(uid),
        _ => Err(MailError::IdentifierFormat(id.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_must_be_a_positive_integer() {
        assert_eq!(parse_uid("42"), Ok(42));
        for bad in ["abc", "", "0", "-3", "4.2", "42abc", " 7"] {
            assert_eq!(parse_uid(bad), Err(MailError::IdentifierFormat(bad.to_string())));
        }
    }
}
