//! Maps `mcp-imap` resource URIs onto a [`MailAccount`].
//!
//! ```text
//! mcp-imap:///                                  account discovery
//! mcp-imap://{inbox}@{host}/                    recent mail listing
//! mcp-imap://{inbox}@{host}/email/{id}          one message head
//! mcp-imap://{inbox}@{host}/email/{id}/bodies   inline body parts
//! ```

pub mod error;
pub mod template;

use std::sync::Arc;

use log::warn;
use serde::Serialize;

use crate::mail::MailAccount;

pub use error::{AggregateError, ResourceError};
use template::{Captures, Segment, UriTemplate};

pub const SCHEME: &str = "mcp-imap";
pub const DISCOVERY_URI: &str = "mcp-imap:///";
pub const MIME_JSON: &str = "application/json";

pub const ACCOUNT_ROOT: UriTemplate = UriTemplate::new(&[
    Segment::Literal("mcp-imap://"),
    Segment::Variable("inbox"),
    Segment::Literal("@"),
    Segment::Variable("host"),
    Segment::Literal("/"),
]);

pub const EMAIL_HEAD: UriTemplate = UriTemplate::new(&[
    Segment::Literal("mcp-imap://"),
    Segment::Variable("inbox"),
    Segment::Literal("@"),
    Segment::Variable("host"),
    Segment::Literal("/email/"),
    Segment::Variable("email.id"),
]);

pub const EMAIL_BODIES: UriTemplate = UriTemplate::new(&[
    Segment::Literal("mcp-imap://"),
    Segment::Variable("inbox"),
    Segment::Literal("@"),
    Segment::Variable("host"),
    Segment::Literal("/email/"),
    Segment::Variable("email.id"),
    Segment::Literal("/bodies"),
]);

/// How a resource or template is advertised to clients.
#[derive(Debug, Clone, Copy)]
pub struct Descriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub mime_type: Option<&'static str>,
}

pub const DISCOVERY: Descriptor = Descriptor {
    name: "Lists available IMAP accounts",
    description: "Discovers available accounts for mcp-imap",
    mime_type: Some(MIME_JSON),
};

/// Registered templates, most specific last.
pub const TEMPLATES: [(UriTemplate, Descriptor); 3] = [
    (
        ACCOUNT_ROOT,
        Descriptor {
            name: "Retrieves emails",
            description: "Retrieves emails for the given user given the account URI",
            mime_type: Some(MIME_JSON),
        },
    ),
    (
        EMAIL_HEAD,
        Descriptor {
            name: "E-mail summary",
            description: "Pulls the summary of the e-mails",
            mime_type: Some(MIME_JSON),
        },
    ),
    (
        EMAIL_BODIES,
        Descriptor {
            name: "Retrieve the bodies of a specific email",
            description: "Retrieve the bodies of a specific email",
            mime_type: None,
        },
    ),
];

/// One item of a resource read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceContent {
    Text {
        uri: String,
        mime_type: String,
        text: String,
    },
    Blob {
        uri: String,
        mime_type: String,
        data: Vec<u8>,
    },
}

impl ResourceContent {
    fn json(uri: String, value: &impl Serialize) -> Result<Self, ResourceError> {
        Ok(ResourceContent::Text {
            uri,
            mime_type: MIME_JSON.to_string(),
            text: serde_json::to_string(value)?,
        })
    }

    pub fn uri(&self) -> &str {
        match self {
            ResourceContent::Text { uri, .. } | ResourceContent::Blob { uri, .. } => uri,
        }
    }
}

/// Result of a read. Only listings ever carry both contents and a problem.
#[derive(Debug, Default)]
pub struct ResourceRead {
    pub contents: Vec<ResourceContent>,
    pub problem: Option<AggregateError>,
}

impl ResourceRead {
    fn complete(contents: Vec<ResourceContent>) -> Self {
        Self {
            contents,
            problem: None,
        }
    }
}

#[derive(Serialize)]
struct AccountDiscovery<'a> {
    mailbox: &'a str,
    host: &'a str,
    uri: String,
}

pub struct ResourceRouter<A> {
    account: Arc<A>,
}

impl<A: MailAccount> ResourceRouter<A> {
    pub fn new(account: Arc<A>) -> Self {
        Self { account }
    }

    pub fn account_uri(&self) -> String {
        ACCOUNT_ROOT.expand(&self.account_values())
    }

    pub fn email_uri(&self, id: &str) -> String {
        let [inbox, host] = self.account_values();
        EMAIL_HEAD.expand(&[inbox, host, ("email.id", id)])
    }

    fn account_values(&self) -> [(&'static str, &str); 2] {
        [
            ("inbox", self.account.mailbox()),
            ("host", self.account.host()),
        ]
    }

    /// Dispatches `uri` to the handler whose template it matches.
    pub fn read(&self, uri: &str) -> Result<ResourceRead, ResourceError> {
        if uri == DISCOVERY_URI {
            self.read_discovery()
        } else if EMAIL_BODIES.matches(uri).is_some() {
            self.read_email_bodies(uri)
        } else if EMAIL_HEAD.matches(uri).is_some() {
            self.read_email_head(uri)
        } else if ACCOUNT_ROOT.matches(uri).is_some() {
            self.read_listing(uri)
        } else {
            Err(ResourceError::UnknownResource(uri.to_string()))
        }
    }

    pub fn read_discovery(&self) -> Result<ResourceRead, ResourceError> {
        let uri = self.account_uri();
        let payload = AccountDiscovery {
            mailbox: self.account.mailbox(),
            host: self.account.host(),
            uri: uri.clone(),
        };
        Ok(ResourceRead::complete(vec![ResourceContent::json(uri, &payload)?]))
    }

    /// Lists recent mail. Items that fail are collected into the read's
    /// problem and the rest of the listing carries on.
    pub fn read_listing(&self, uri: &str) -> Result<ResourceRead, ResourceError> {
        self.match_account(&ACCOUNT_ROOT, uri)?;

        let mut contents = Vec::new();
        let mut problem = AggregateError::default();
        for item in self.account.list_emails()? {
            let content = item
                .map_err(ResourceError::from)
                .and_then(|summary| ResourceContent::json(self.email_uri(&summary.id), &summary));
            match content {
                Ok(content) => contents.push(content),
                Err(err) => {
                    warn!("skipping listing item: {err}");
                    problem.push(err);
                }
            }
        }

        Ok(ResourceRead {
            contents,
            problem: problem.into_option(),
        })
    }

    pub fn read_email_head(&self, uri: &str) -> Result<ResourceRead, ResourceError> {
        let captures = self.match_account(&EMAIL_HEAD, uri)?;
        let id = email_id(&captures, &EMAIL_HEAD, uri)?;

        let head = self.account.retrieve_email_head(id)?;
        Ok(ResourceRead::complete(vec![ResourceContent::json(
            uri.to_string(),
            &head,
        )?]))
    }

    /// One blob per inline part, each under its own MIME type.
    pub fn read_email_bodies(&self, uri: &str) -> Result<ResourceRead, ResourceError> {
        let captures = self.match_account(&EMAIL_BODIES, uri)?;
        let id = email_id(&captures, &EMAIL_BODIES, uri)?;

        let bodies = self.account.retrieve_email_body(id)?;
        Ok(ResourceRead::complete(
            bodies
                .into_iter()
                .map(|body| ResourceContent::Blob {
                    uri: uri.to_string(),
                    mime_type: body.mime_type,
                    data: body.data,
                })
                .collect(),
        ))
    }

    fn match_account(&self, template: &UriTemplate, uri: &str) -> Result<Captures, ResourceError> {
        let captures = template
            .matches(uri)
            .ok_or_else(|| ResourceError::TemplateMismatch {
                uri: uri.to_string(),
                template: template.pattern(),
            })?;

        let same_inbox = captures.get("inbox") == Some(self.account.mailbox());
        let same_host = captures
            .get("host")
            .is_some_and(|host| host.eq_ignore_ascii_case(self.account.host()));
        if !(same_inbox && same_host) {
            return Err(ResourceError::UnknownAccount {
                uri: uri.to_string(),
                mailbox: self.account.mailbox().to_string(),
                host: self.account.host().to_string(),
            });
        }
        Ok(captures)
    }
}

/// An empty `{email.id}` counts as a mismatch.
fn email_id<'c>(
    captures: &'c Captures,
    template: &UriTemplate,
    uri: &str,
) -> Result<&'c str, ResourceError> {
    captures
        .get("email.id")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ResourceError::TemplateMismatch {
            uri: uri.to_string(),
            template: template.pattern(),
        })
}
