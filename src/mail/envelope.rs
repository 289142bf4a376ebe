use crate::domain::email::{EmailHead, EmailSummary};
use crate::mail::decoders::parse_envelope_date;
use crate::mail::error::MailError;

/// Owned copy of the envelope fields we care about, detached from the
/// FETCH response buffer so it can be decoded later.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEnvelope {
    pub subject: Option<Vec<u8>>,
    pub date: Option<Vec<u8>>,
    pub from: Vec<RawAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawAddress {
    pub name: Option<Vec<u8>>,
    pub mailbox: Option<Vec<u8>>,
}

/// One FETCH item: the id it is exposed under, plus its envelope if the
/// server sent one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeRecord {
    pub id: String,
    pub envelope: Option<RawEnvelope>,
}

impl EnvelopeRecord {
    pub fn from_fetch(id: String, fetch: &imap::types::Fetch) -> Self {
        let envelope = fetch.envelope().map(|env| RawEnvelope {
            subject: env.subject.map(<[u8]>::to_vec),
            date: env.date.map(<[u8]>::to_vec),
            from: env
                .from
                .iter()
                .flatten()
                .map(|addr| RawAddress {
                    name: addr.name.map(<[u8]>::to_vec),
                    mailbox: addr.mailbox.map(<[u8]>::to_vec),
                })
                .collect(),
        });
        Self { id, envelope }
    }

    /// Listing form: only the first sender is kept.
    pub fn into_summary(self) -> Result<EmailSummary, MailError> {
        let decoded = self.decode()?;
        Ok(EmailSummary {
            id: decoded.id,
            subject: decoded.subject,
            received: decoded.received,
            from: decoded.from.into_iter().take(1).collect(),
        })
    }

    pub fn into_head(self) -> Result<EmailHead, MailError> {
        let decoded = self.decode()?;
        Ok(EmailHead {
            id: decoded.id,
            subject: decoded.subject,
            received: decoded.received,
            from: decoded.from,
        })
    }

    fn decode(self) -> Result<EmailHead, MailError> {
        let Some(envelope) = self.envelope else {
            return Err(MailError::Envelope {
                id: self.id,
                reason: "no envelope in fetch response".to_string(),
            });
        };

        let received = match envelope.date.as_deref() {
            Some(raw) => match parse_envelope_date(raw) {
                Some(at) => at,
                None => {
                    return Err(MailError::Envelope {
                        id: self.id,
                        reason: format!("unparseable date {:?}", String::from_utf8_lossy(raw)),
                    });
                }
            },
            None => {
                return Err(MailError::Envelope {
                    id: self.id,
                    reason: "missing date".to_string(),
                });
            }
        };

        let subject = envelope
            .subject
            .as_deref()
            .map(header_text)
            .unwrap_or_default();

        Ok(EmailHead {
            id: self.id,
            subject,
            received,
            from: envelope.from.iter().filter_map(RawAddress::display_name).collect(),
        })
    }
}

/// Envelope strings may carry RFC 2047 encoded-words. mailparse decodes
/// those only inside a header, so the field is read as a `Subject` line.
fn header_text(raw: &[u8]) -> String {
    let line = [b"Subject: ".as_slice(), raw, b"\r\n"].concat();
    mailparse::parse_header(&line)
        .map(|(header, _)| header.get_value())
        .unwrap_or_else(|_| String::from_utf8_lossy(raw).into_owned())
}

impl RawAddress {
    /// Prefer display name; if missing, use mailbox (without host).
    fn display_name(&self) -> Option<String> {
        self.name
            .as_deref()
            .or(self.mailbox.as_deref())
            .map(header_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}
