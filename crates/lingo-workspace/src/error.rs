use std::path::PathBuf;

use thiserror::Error;

use crate::project::{DocumentId, ProjectId};

/// Errors from workspace mutations.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("project not found: {id}", id = .0.0)]
    ProjectNotFound(ProjectId),

    #[error("document not found: {id}", id = .0.0)]
    DocumentNotFound(DocumentId),

    #[error("no document tracked for path: {0}")]
    PathNotTracked(PathBuf),

    #[error("a document already exists for path: {0}")]
    DuplicatePath(PathBuf),
}

/// Errors from buffer synchronization.
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("buffer update request has no file name")]
    MissingFileName,

    #[error("file {0} is not tracked and the miscellaneous-files fallback is disabled")]
    UntrackedFile(PathBuf),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from a project system.
#[derive(Debug, Error)]
pub enum ProjectSystemError {
    #[error("project system {key} failed to initialize: {reason}")]
    InitFailed { key: String, reason: String },

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}
