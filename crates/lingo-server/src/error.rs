use std::path::PathBuf;

use thiserror::Error;

use lingo_protocol::error::ProtocolError;
use lingo_workspace::error::BufferError;

/// Errors from endpoint dispatch.
///
/// Routing errors (`UnknownEndpoint`, `NoHandler`) are caller errors;
/// registration errors are configuration mistakes caught at
/// composition time; the rest propagate handler or workspace failures
/// for a single request.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The endpoint name is not in the registry at all.
    #[error("unknown endpoint: {0}")]
    UnknownEndpoint(String),

    /// The endpoint exists but no handler serves the resolved language.
    #[error("no handler registered for endpoint {endpoint} and language {language}")]
    NoHandler { endpoint: String, language: String },

    /// A descriptor with this name was already registered.
    #[error("endpoint already registered: {0}")]
    DuplicateEndpoint(String),

    /// A second handler was registered for a non-mergeable endpoint.
    #[error(
        "endpoint {endpoint} is not mergeable but language {language} already has a handler"
    )]
    DuplicateHandler { endpoint: String, language: String },

    /// No project owns the requested file.
    #[error("no project found for file: {0}")]
    ProjectNotFound(PathBuf),

    /// A handler failed while serving the request.
    #[error("handler error: {0}")]
    Handler(String),

    /// A timeout-sensitive endpoint exceeded its budget.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Buffer(#[from] BufferError),
}
