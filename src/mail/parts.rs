//! Splits a raw RFC 5322 message into its inline body parts.

use mailparse::{DispositionType, MailHeaderMap, ParsedMail};

use crate::domain::email::{EmailBodies, EmailBody};
use crate::mail::error::MailError;

/// Appends every inline leaf part of `raw` to `into`, in document order.
///
/// Attachments are skipped. On error, whatever was appended before the
/// failing part stays in `into`; the caller decides whether to keep it.
pub fn decompose(raw: &[u8], into: &mut EmailBodies) -> Result<(), MailError> {
    let parsed = mailparse::parse_mail(raw).map_err(|e| MailError::MessageParse(e.to_string()))?;

    for part in InlineParts::new(&parsed) {
        let mime_type = declared_mime_type(part)?;
        let data = part
            .get_body_raw()
            .map_err(|e| MailError::BodyRead(e.to_string()))?;
        into.push(EmailBody { mime_type, data });
    }
    Ok(())
}

/// Depth-first walk over leaf parts, yielding one part per `next()`.
struct InlineParts<'p, 'a> {
    stack: Vec<&'p ParsedMail<'a>>,
}

impl<'p, 'a> InlineParts<'p, 'a> {
    fn new(root: &'p ParsedMail<'a>) -> Self {
        Self { stack: vec![root] }
    }
}

impl<'p, 'a> Iterator for InlineParts<'p, 'a> {
    type Item = &'p ParsedMail<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(part) = self.stack.pop() {
            if !part.subparts.is_empty() {
                self.stack.extend(part.subparts.iter().rev());
                continue;
            }
            if part.ctype.mimetype.starts_with("multipart/") {
                // empty container
                continue;
            }
            if is_inline(part) {
                return Some(part);
            }
        }
        None
    }
}

/// A part is inline when it says so, or when it is undeclared text.
fn is_inline(part: &ParsedMail<'_>) -> bool {
    if part.headers.get_first_value("Content-Disposition").is_none() {
        return part.ctype.mimetype.starts_with("text/");
    }
    match part.get_content_disposition().disposition {
        DispositionType::Inline => true,
        DispositionType::Attachment => false,
        _ => part.ctype.mimetype.starts_with("text/"),
    }
}

fn declared_mime_type(part: &ParsedMail<'_>) -> Result<String, MailError> {
    if let Some(header) = part.headers.get_first_value("Content-Type") {
        let media = header.split(';').next().unwrap_or_default().trim();
        let well_formed = media
            .split_once('/')
            .is_some_and(|(kind, sub)| is_token(kind) && is_token(sub));
        if !well_formed {
            return Err(MailError::ContentType(format!("malformed content type {header:?}")));
        }
    }
    Ok(part.ctype.mimetype.clone())
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?=".contains(&b))
}
