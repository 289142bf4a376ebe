//! Minimal URI templates: literal text interleaved with `{name}`
//! placeholders. A placeholder never spans a `/`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Literal(&'static str),
    Variable(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct UriTemplate {
    segments: &'static [Segment],
}

/// Values captured by a successful [`UriTemplate::matches`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    values: Vec<(&'static str, String)>,
}

impl Captures {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl UriTemplate {
    pub const fn new(segments: &'static [Segment]) -> Self {
        Self { segments }
    }

    /// The template in its registered `{name}` form.
    pub fn pattern(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => (*text).to_string(),
                Segment::Variable(name) => format!("{{{name}}}"),
            })
            .collect()
    }

    /// Fills placeholders from `values`; unknown names expand to nothing.
    pub fn expand(&self, values: &[(&str, &str)]) -> String {
        let mut out = String::new();
        for segment in self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(name) => {
                    if let Some((_, value)) = values.iter().find(|(key, _)| key == name) {
                        out.push_str(value);
                    }
                }
            }
        }
        out
    }

    /// Matches the whole of `uri`. Earlier placeholders take the longest
    /// candidate that still lets the rest match, so `a@b@host` binds
    /// `{inbox}@{host}` as `a@b` and `host`.
    pub fn matches(&self, uri: &str) -> Option<Captures> {
        let mut bound = Vec::new();
        if !match_from(self.segments, uri, &mut bound) {
            return None;
        }
        // bindings are pushed innermost first
        let values = bound
            .into_iter()
            .rev()
            .map(|(name, value)| (name, value.to_string()))
            .collect();
        Some(Captures { values })
    }
}

/// Binds placeholders as borrowed slices of `uri`; a binding is recorded
/// only once everything after it has matched.
fn match_from<'u>(
    segments: &[Segment],
    uri: &'u str,
    bound: &mut Vec<(&'static str, &'u str)>,
) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return uri.is_empty();
    };

    match first {
        Segment::Literal(text) => uri
            .strip_prefix(*text)
            .is_some_and(|tail| match_from(rest, tail, bound)),
        Segment::Variable(name) => {
            let limit = uri.find('/').unwrap_or(uri.len());
            for end in (0..=limit).rev().filter(|&i| uri.is_char_boundary(i)) {
                if match_from(rest, &uri[end..], bound) {
                    bound.push((*name, &uri[..end]));
                    return true;
                }
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEAD: UriTemplate = UriTemplate::new(&[
        Segment::Literal("mcp-imap://"),
        Segment::Variable("inbox"),
        Segment::Literal("@"),
        Segment::Variable("host"),
        Segment::Literal("/email/"),
        Segment::Variable("email.id"),
    ]);

    #[test]
    fn renders_pattern() {
        assert_eq!(HEAD.pattern(), "mcp-imap://{inbox}@{host}/email/{email.id}");
    }

    #[test]
    fn extracts_values() {
        let captures = HEAD.matches("mcp-imap://ada@imap.example.com/email/42").unwrap();
        assert_eq!(captures.get("inbox"), Some("ada"));
        assert_eq!(captures.get("host"), Some("imap.example.com"));
        assert_eq!(captures.get("email.id"), Some("42"));
        assert_eq!(captures.get("missing"), None);
    }

    #[test]
    fn address_shaped_mailbox_binds_up_to_last_at() {
        let captures = HEAD
            .matches("mcp-imap://ada@example.com@imap.example.com/email/7")
            .unwrap();
        assert_eq!(captures.get("inbox"), Some("ada@example.com"));
        assert_eq!(captures.get("host"), Some("imap.example.com"));
    }

    #[test]
    fn placeholders_do_not_cross_slashes() {
        assert!(HEAD.matches("mcp-imap://ada@host/email/42/bodies").is_none());
        assert!(HEAD.matches("mcp-imap://ada@host/other/42").is_none());
    }

    #[test]
    fn empty_placeholder_matches_as_empty() {
        let captures = HEAD.matches("mcp-imap://ada@host/email/").unwrap();
        assert_eq!(captures.get("email.id"), Some(""));
    }

    #[test]
    fn expand_then_match() {
        let uri = HEAD.expand(&[("inbox", "ada"), ("host", "h.example"), ("email.id", "9")]);
        assert_eq!(uri, "mcp-imap://ada@h.example/email/9");
        assert_eq!(HEAD.matches(&uri).unwrap().get("email.id"), Some("9"));
    }

    #[test]
    fn failed_candidates_leave_no_bindings() {
        let captures = HEAD.matches("mcp-imap://a@b@c@d/email/1").unwrap();
        assert_eq!(
            captures.values,
            [
                ("inbox", "a@b@c".to_string()),
                ("host", "d".to_string()),
                ("email.id", "1".to_string()),
            ]
        );
    }
}
