//! IMAP passwords kept in the OS keyring, one slot per mailbox.

use anyhow::{Context, Result};
use keyring::{Entry, Error as KeyringError};

const SERVICE: &str = "mcp_imap";

/// The keyring slot holding one mailbox's password.
pub struct StoredPassword {
    mailbox: String,
    entry: Entry,
}

impl StoredPassword {
    pub fn for_mailbox(mailbox: &str) -> Result<Self> {
        let entry = Entry::new(SERVICE, mailbox)
            .with_context(|| format!("opening keyring slot for {mailbox}"))?;
        Ok(Self {
            mailbox: mailbox.to_string(),
            entry,
        })
    }

    pub fn store(&self, password: &str) -> Result<()> {
        self.entry
            .set_password(password)
            .with_context(|| format!("storing password for {}", self.mailbox))
    }

    /// `None` when nothing was ever stored for this mailbox.
    pub fn fetch(&self) -> Result<Option<String>> {
        match self.entry.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(KeyringError::NoEntry) => Ok(None),
            Err(e) => {
                Err(e).with_context(|| format!("reading password for {}", self.mailbox))
            }
        }
    }
}

/// Keyring fallback used when no password was configured.
pub fn stored_password(mailbox: &str) -> Result<Option<String>> {
    StoredPassword::for_mailbox(mailbox)?.fetch()
}
