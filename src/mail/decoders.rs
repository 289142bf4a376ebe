use chrono::{DateTime, Utc};

/// Parses an RFC 2822 envelope date into UTC.
pub fn parse_envelope_date(raw: &[u8]) -> Option<DateTime<Utc>> {
    let text = String::from_utf8_lossy(raw);
    let epoch = mailparse::dateparse(text.trim()).ok()?;
    DateTime::from_timestamp(epoch, 0)
}

/// The IMAP `SEARCH SINCE` date form, e.g. `15-Oct-2026`.
pub fn imap_search_date(at: DateTime<Utc>) -> String {
    at.format("%-d-%b-%Y").to_string()
}
