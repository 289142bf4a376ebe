use std::fmt;

use thiserror::Error;

use crate::mail::MailError;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("uri {uri} does not match template {template}")]
    TemplateMismatch { uri: String, template: String },

    #[error("no resource at {0}")]
    UnknownResource(String),

    #[error("uri {uri} names an account other than {mailbox}@{host}")]
    UnknownAccount {
        uri: String,
        mailbox: String,
        host: String,
    },

    #[error("encoding resource: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Mail(#[from] MailError),
}

/// Per-item listing failures, kept in the order they happened.
#[derive(Debug, Default)]
pub struct AggregateError {
    failures: Vec<ResourceError>,
}

impl AggregateError {
    pub fn push(&mut self, failure: ResourceError) {
        self.failures.push(failure);
    }

    pub fn failures(&self) -> &[ResourceError] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// `None` when nothing failed.
    pub fn into_option(self) -> Option<Self> {
        (!self.is_empty()).then_some(self)
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}
