//! MCP front end: advertises the `mcp-imap` resources and serves reads over
//! stdio.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use base64::{Engine as _, engine::general_purpose};
use log::{info, warn};
use rmcp::model::{
    AnnotateAble, ErrorData, Implementation, ListResourceTemplatesResult, ListResourcesResult,
    PaginatedRequestParam, RawResource, RawResourceTemplate, ReadResourceRequestParam,
    ReadResourceResult, Resource, ResourceContents, ResourceTemplate, ServerCapabilities,
    ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler, ServiceExt};

use crate::mail::{MailAccount, MailError};
use crate::resources::{
    DISCOVERY, DISCOVERY_URI, ResourceContent, ResourceError, ResourceRead, ResourceRouter,
    TEMPLATES,
};

pub const INSTRUCTIONS: &str = "An IMAP client is attached via mcp with the protocol `mcp-imap`.";

pub struct ImapResourceServer<A> {
    router: Arc<ResourceRouter<A>>,
}

impl<A> Clone for ImapResourceServer<A> {
    fn clone(&self) -> Self {
        Self {
            router: Arc::clone(&self.router),
        }
    }
}

impl<A: MailAccount + 'static> ImapResourceServer<A> {
    pub fn new(router: ResourceRouter<A>) -> Self {
        Self {
            router: Arc::new(router),
        }
    }
}

impl<A: MailAccount + 'static> ServerHandler for ImapResourceServer<A> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_resources().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        Ok(ListResourcesResult::with_all_items(vec![discovery_resource()]))
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, ErrorData> {
        Ok(ListResourceTemplatesResult::with_all_items(resource_templates()))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        let router = Arc::clone(&self.router);
        let uri = request.uri;
        let read = tokio::task::spawn_blocking(move || router.read(&uri))
            .await
            .map_err(|e| ErrorData::internal_error(format!("resource read aborted: {e}"), None))?
            .map_err(to_error_data)?;

        into_read_result(read)
    }
}

fn discovery_resource() -> Resource {
    let mut discovery = RawResource::new(DISCOVERY_URI, DISCOVERY.name);
    discovery.description = Some(DISCOVERY.description.to_string());
    discovery.mime_type = DISCOVERY.mime_type.map(str::to_string);
    discovery.no_annotation()
}

fn resource_templates() -> Vec<ResourceTemplate> {
    TEMPLATES
        .iter()
        .map(|(template, descriptor)| {
            RawResourceTemplate {
                uri_template: template.pattern(),
                name: descriptor.name.to_string(),
                title: None,
                description: Some(descriptor.description.to_string()),
                mime_type: descriptor.mime_type.map(str::to_string),
            }
            .no_annotation()
        })
        .collect()
}

fn into_read_result(read: ResourceRead) -> Result<ReadResourceResult, ErrorData> {
    let ResourceRead { contents, problem } = read;
    if let Some(problem) = problem {
        if contents.is_empty() {
            return Err(ErrorData::internal_error(problem.to_string(), None));
        }
        warn!(
            "returning {} item(s) with {} failure(s)",
            contents.len(),
            problem.len()
        );
        for failure in problem.failures() {
            warn!("  {failure}");
        }
    }

    Ok(ReadResourceResult {
        contents: contents.into_iter().map(content_to_wire).collect(),
    })
}

fn content_to_wire(content: ResourceContent) -> ResourceContents {
    match content {
        ResourceContent::Text {
            uri,
            mime_type,
            text,
        } => ResourceContents::TextResourceContents {
            uri,
            mime_type: Some(mime_type),
            text,
            meta: None,
        },
        ResourceContent::Blob {
            uri,
            mime_type,
            data,
        } => ResourceContents::BlobResourceContents {
            uri,
            mime_type: Some(mime_type),
            blob: general_purpose::STANDARD.encode(data),
            meta: None,
        },
    }
}

pub fn to_error_data(err: ResourceError) -> ErrorData {
    match &err {
        ResourceError::TemplateMismatch { .. }
        | ResourceError::UnknownResource(_)
        | ResourceError::UnknownAccount { .. }
        | ResourceError::Mail(MailError::NotFound(_)) => {
            ErrorData::resource_not_found(err.to_string(), None)
        }
        ResourceError::Mail(MailError::IdentifierFormat(_)) => {
            ErrorData::invalid_params(err.to_string(), None)
        }
        _ => ErrorData::internal_error(err.to_string(), None),
    }
}

/// Serves `router` on stdin/stdout until the client goes away or `shutdown`
/// resolves.
pub async fn serve_stdio<A>(
    router: ResourceRouter<A>,
    shutdown: impl Future<Output = ()>,
) -> Result<()>
where
    A: MailAccount + 'static,
{
    let service = ImapResourceServer::new(router)
        .serve(rmcp::transport::stdio())
        .await
        .map_err(|e| anyhow!("starting MCP stdio transport: {e}"))?;
    info!("serving mcp-imap resources on stdio");

    tokio::select! {
        quit = service.waiting() => {
            let reason = quit.map_err(|e| anyhow!("MCP service task failed: {e}"))?;
            info!("MCP session ended: {reason:?}");
        }
        () = shutdown => {
            info!("shutdown requested");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advertises_discovery_and_three_templates() {
        let discovery = discovery_resource();
        assert_eq!(discovery.uri, "mcp-imap:///");
        assert_eq!(discovery.mime_type.as_deref(), Some("application/json"));

        let patterns: Vec<String> = resource_templates()
            .iter()
            .map(|t| t.uri_template.clone())
            .collect();
        assert_eq!(
            patterns,
            [
                "mcp-imap://{inbox}@{host}/",
                "mcp-imap://{inbox}@{host}/email/{email.id}",
                "mcp-imap://{inbox}@{host}/email/{email.id}/bodies",
            ]
        );
    }

    #[test]
    fn blob_contents_are_base64_on_the_wire() {
        let read = ResourceRead {
            contents: vec![ResourceContent::Blob {
                uri: "mcp-imap://ada@host/email/1/bodies".to_string(),
                mime_type: "text/plain".to_string(),
                data: b"hello".to_vec(),
            }],
            problem: None,
        };

        let result = into_read_result(read).unwrap();
        match &result.contents[0] {
            ResourceContents::BlobResourceContents { blob, mime_type, .. } => {
                assert_eq!(blob, "aGVsbG8=");
                assert_eq!(mime_type.as_deref(), Some("text/plain"));
            }
            other => panic!("expected blob contents, got {other:?}"),
        }
    }

    #[test]
    fn json_contents_stay_text() {
        let read = ResourceRead {
            contents: vec![ResourceContent::Text {
                uri: DISCOVERY_URI.to_string(),
                mime_type: "application/json".to_string(),
                text: "{}".to_string(),
            }],
            problem: None,
        };

        let result = into_read_result(read).unwrap();
        assert!(matches!(
            &result.contents[0],
            ResourceContents::TextResourceContents { text, .. } if text == "{}"
        ));
    }

    #[test]
    fn partial_listing_is_returned() {
        let mut problem = crate::resources::AggregateError::default();
        problem.push(ResourceError::Mail(MailError::Fetch("boom".to_string())));
        let read = ResourceRead {
            contents: vec![ResourceContent::Text {
                uri: "mcp-imap://ada@host/email/1".to_string(),
                mime_type: "application/json".to_string(),
                text: "{}".to_string(),
            }],
            problem: Some(problem),
        };

        assert_eq!(into_read_result(read).unwrap().contents.len(), 1);
    }

    #[test]
    fn nothing_but_failures_is_an_error() {
        let mut problem = crate::resources::AggregateError::default();
        problem.push(ResourceError::Mail(MailError::Fetch("boom".to_string())));
        let read = ResourceRead {
            contents: Vec::new(),
            problem: Some(problem),
        };

        assert!(into_read_result(read).is_err());
    }

    #[test]
    fn malformed_id_is_invalid_params() {
        let err = to_error_data(ResourceError::Mail(MailError::IdentifierFormat(
            "abc".to_string(),
        )));
        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);
    }
}
