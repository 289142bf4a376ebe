use std::fmt;

/// Who we log in as and where. Fixed for the lifetime of the process.
#[derive(Clone)]
pub struct MailboxIdentity {
    pub mailbox: String,
    pub host: String,
    pub password: String,
}

impl MailboxIdentity {
    pub fn new(
        mailbox: impl Into<String>,
        host: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            mailbox: mailbox.into(),
            host: host.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for MailboxIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxIdentity")
            .field("mailbox", &self.mailbox)
            .field("host", &self.host)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_password() {
        let identity = MailboxIdentity::new("ada", "imap.example.com", "hunter2");
        let rendered = format!("{identity:?}");
        assert!(rendered.contains("imap.example.com"));
        assert!(!rendered.contains("hunter2"));
    }
}
