use chrono::{DateTime, Utc};
use serde::Serialize;

/// Identifier handed out to resource clients. Listing produces sequence
/// numbers, retrieval interprets the same text as a UID.
pub type EmailId = String;

/// One row of the recent-mail listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailSummary {
    pub id: EmailId,
    pub subject: String,
    pub received: DateTime<Utc>,
    pub from: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailHead {
    pub id: EmailId,
    pub subject: String,
    pub received: DateTime<Utc>,
    pub from: Vec<String>,
}

/// A single inline part of a message, payload already transfer-decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailBody {
    pub mime_type: String,
    pub data: Vec<u8>,
}

pub type EmailBodies = Vec<EmailBody>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn summary_serializes_with_rfc3339_timestamp() {
        let summary = EmailSummary {
            id: "7".to_string(),
            subject: "Quarterly numbers".to_string(),
            received: Utc.with_ymd_and_hms(2026, 10, 15, 8, 30, 0).unwrap(),
            from: vec!["Ada Lovelace".to_string()],
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "7",
                "subject": "Quarterly numbers",
                "received": "2026-10-15T08:30:00Z",
                "from": ["Ada Lovelace"],
            })
        );
    }
}
