use std::time::Duration;

use thiserror::Error;

/// Everything that can go wrong between us and the IMAP server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MailError {
    #[error("dial error: connecting to {host}: {reason}")]
    Connection { host: String, reason: String },

    #[error("authentication ({mailbox}@{host}) error: {reason}")]
    Authentication {
        mailbox: String,
        host: String,
        reason: String,
    },

    #[error("select {mailbox} error: {reason}")]
    MailboxSelection { mailbox: String, reason: String },

    /// The transport died mid-command; the session is discarded.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error("invalid email id: {0:?}")]
    IdentifierFormat(String),

    #[error("search error: {0}")]
    Search(String),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("email UID {0} not found")]
    NotFound(u32),

    #[error("envelope error for email {id}: {reason}")]
    Envelope { id: String, reason: String },

    #[error("parsing message error: {0}")]
    MessageParse(String),

    #[error("extracting content header error: {0}")]
    ContentType(String),

    #[error("reading body error: {0}")]
    BodyRead(String),

    #[error("logout error: {0}")]
    Logout(String),

    #[error("IMAP session did not close within {0:?}")]
    CloseTimeout(Duration),
}

impl MailError {
    /// Maps an `imap` command failure, keeping transport breakage distinct
    /// from protocol-level refusals.
    pub(crate) fn command(stage: fn(String) -> MailError) -> impl FnOnce(imap::Error) -> MailError {
        move |err| match err {
            imap::Error::Io(_) | imap::Error::ConnectionLost => {
                MailError::ConnectionLost(err.to_string())
            }
            other => stage(other.to_string()),
        }
    }

    pub fn is_connection_lost(&self) -> bool {
        matches!(self, MailError::ConnectionLost(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_failures_become_connection_lost() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = MailError::command(MailError::Fetch)(imap::Error::Io(io));
        assert!(err.is_connection_lost());
    }

    #[test]
    fn server_refusals_keep_their_stage() {
        let err = MailError::command(MailError::Search)(imap::Error::No("nope".to_string()));
        assert!(matches!(err, MailError::Search(_)));
        assert!(!err.is_connection_lost());
    }

    #[test]
    fn authentication_names_the_account() {
        let err = MailError::Authentication {
            mailbox: "ada".to_string(),
            host: "imap.example.com".to_string(),
            reason: "bad credentials".to_string(),
        };
        assert!(err.to_string().contains("ada@imap.example.com"));
    }
}
