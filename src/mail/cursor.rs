use log::debug;

use crate::domain::email::EmailSummary;
use crate::mail::error::MailError;

type Pending = Box<dyn Iterator<Item = Result<EmailSummary, MailError>> + Send>;

/// Pull-based view over one listing response.
///
/// Items are decoded one at a time. The underlying response is released when
/// the cursor is exhausted, closed explicitly, or dropped, whichever comes
/// first.
pub struct EmailCursor {
    pending: Option<Pending>,
}

impl EmailCursor {
    pub fn new<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Result<EmailSummary, MailError>>,
        I::IntoIter: Send + 'static,
    {
        Self {
            pending: Some(Box::new(items.into_iter())),
        }
    }

    pub fn empty() -> Self {
        Self { pending: None }
    }

    pub fn is_closed(&self) -> bool {
        self.pending.is_none()
    }

    pub fn close(&mut self) {
        if self.pending.take().is_some() {
            debug!("listing cursor closed");
        }
    }
}

impl Iterator for EmailCursor {
    type Item = Result<EmailSummary, MailError>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.pending.as_mut()?.next();
        if item.is_none() {
            self.close();
        }
        item
    }
}

impl Drop for EmailCursor {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn summary(id: &str) -> EmailSummary {
        EmailSummary {
            id: id.to_string(),
            subject: String::new(),
            received: Utc::now(),
            from: Vec::new(),
        }
    }

    #[test]
    fn closes_itself_when_exhausted() {
        let mut cursor = EmailCursor::new(vec![Ok(summary("1"))]);
        assert!(cursor.next().is_some());
        assert!(!cursor.is_closed());
        assert!(cursor.next().is_none());
        assert!(cursor.is_closed());
        assert!(cursor.next().is_none());
    }

    #[test]
    fn early_close_stops_iteration() {
        let mut cursor = EmailCursor::new(vec![Ok(summary("1")), Ok(summary("2"))]);
        assert!(cursor.next().is_some());
        cursor.close();
        assert!(cursor.next().is_none());
    }

    #[test]
    fn empty_cursor_yields_nothing() {
        assert_eq!(EmailCursor::empty().count(), 0);
    }
}
