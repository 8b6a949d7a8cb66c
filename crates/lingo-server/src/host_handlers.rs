//! Built-in handlers the host itself provides: buffer
//! synchronization, file-change broadcast, and project-system
//! introspection. Language backends register alongside these; the
//! host handlers are always present.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use lingo_protocol::endpoints;
use lingo_protocol::error::ProtocolError;
use lingo_protocol::request::{ChangeBufferRequest, FilesChangedRequest, UpdateBufferRequest};
use lingo_protocol::response::Response;

use lingo_workspace::buffer::BufferManager;
use lingo_workspace::error::BufferError;
use lingo_workspace::project_system::ProjectSystemHost;

use crate::error::ServerError;
use crate::handler::{RequestContext, RequestHandler};
use crate::registry::HandlerRegistry;

/// `/updatebuffer`: synchronize one document with the editor's view.
pub struct UpdateBufferHandler {
    buffers: Arc<BufferManager>,
}

#[async_trait]
impl RequestHandler for UpdateBufferHandler {
    async fn handle(&self, context: &RequestContext) -> Result<Response, ServerError> {
        let request: UpdateBufferRequest =
            serde_json::from_value(context.payload.clone()).map_err(ProtocolError::from)?;
        let request = UpdateBufferRequest {
            from_disk: request.from_disk,
            envelope: request.envelope.decoded(context.convention),
        };
        self.buffers.update(&request).await?;
        Ok(Response::Empty)
    }
}

/// `/changebuffer`: apply one span replacement to a document.
pub struct ChangeBufferHandler {
    buffers: Arc<BufferManager>,
}

#[async_trait]
impl RequestHandler for ChangeBufferHandler {
    async fn handle(&self, context: &RequestContext) -> Result<Response, ServerError> {
        let request: ChangeBufferRequest =
            serde_json::from_value(context.payload.clone()).map_err(ProtocolError::from)?;
        let path = request
            .file_name
            .as_deref()
            .map(PathBuf::from)
            .ok_or(BufferError::MissingFileName)?;
        let change = request.to_change(context.convention);
        self.buffers.change(&path, &change).await?;
        Ok(Response::Empty)
    }
}

/// `/filesChanged`: broadcast file-system notifications to every
/// initialized project system.
pub struct FilesChangedHandler {
    systems: Arc<ProjectSystemHost>,
}

#[async_trait]
impl RequestHandler for FilesChangedHandler {
    async fn handle(&self, context: &RequestContext) -> Result<Response, ServerError> {
        let events: FilesChangedRequest =
            serde_json::from_value(context.payload.clone()).map_err(ProtocolError::from)?;
        for event in &events {
            self.systems
                .notify_file_change(Path::new(&event.file_name), event.change_type)
                .await;
        }
        tracing::debug!(count = events.len(), "file change batch processed");
        Ok(Response::Empty)
    }
}

/// `/projects`: the workspace model of every initialized project
/// system, keyed by system key.
pub struct WorkspaceInformationHandler {
    systems: Arc<ProjectSystemHost>,
}

#[async_trait]
impl RequestHandler for WorkspaceInformationHandler {
    async fn handle(&self, _context: &RequestContext) -> Result<Response, ServerError> {
        Ok(Response::Workspace(self.systems.workspace_models().await))
    }
}

/// `/project`: the owning project's model for one file.
pub struct ProjectInformationHandler {
    systems: Arc<ProjectSystemHost>,
}

#[async_trait]
impl RequestHandler for ProjectInformationHandler {
    async fn handle(&self, context: &RequestContext) -> Result<Response, ServerError> {
        let path = context
            .envelope
            .file_name
            .as_deref()
            .map(PathBuf::from)
            .ok_or(BufferError::MissingFileName)?;
        let model = self
            .systems
            .project_model(&path)
            .await
            .ok_or_else(|| ServerError::ProjectNotFound(path.clone()))?;
        Ok(Response::Project(model))
    }
}

/// Register the host's built-in handlers on `registry`.
///
/// Called once during composition, before any backend handlers are
/// added; the endpoint table must already contain the built-in
/// descriptors.
pub fn register_host_handlers(
    registry: &mut HandlerRegistry,
    buffers: Arc<BufferManager>,
    systems: Arc<ProjectSystemHost>,
) -> Result<(), ServerError> {
    registry.add_handler(
        endpoints::UPDATE_BUFFER,
        endpoints::LANG_ANY,
        Arc::new(UpdateBufferHandler {
            buffers: buffers.clone(),
        }),
    )?;
    registry.add_handler(
        endpoints::CHANGE_BUFFER,
        endpoints::LANG_ANY,
        Arc::new(ChangeBufferHandler { buffers }),
    )?;
    registry.add_handler(
        endpoints::FILES_CHANGED,
        endpoints::LANG_ANY,
        Arc::new(FilesChangedHandler {
            systems: systems.clone(),
        }),
    )?;
    registry.add_handler(
        endpoints::WORKSPACE_INFORMATION,
        endpoints::LANG_PROJECTS,
        Arc::new(WorkspaceInformationHandler {
            systems: systems.clone(),
        }),
    )?;
    registry.add_handler(
        endpoints::PROJECT_INFORMATION,
        endpoints::LANG_PROJECTS,
        Arc::new(ProjectInformationHandler { systems }),
    )?;
    Ok(())
}
