//! lingo-workspace — the shared in-memory model of projects and
//! documents, plus the plugin contract that keeps it in sync with the
//! outside world.
//!
//! The [`Workspace`] is the single shared mutable resource of the
//! server: project systems reconcile file-system topology into it and
//! request handlers read consistent snapshots out of it. The
//! [`BufferManager`] applies editor-reported text updates, and the
//! [`RestoreService`] gates external dependency-restore runs.
pub mod buffer;
pub mod error;
pub mod events;
pub mod process;
pub mod project;
pub mod project_system;
pub mod restore;
pub mod watcher;
pub mod workspace;

// Re-export key types for convenience.
pub use buffer::BufferManager;
pub use error::{BufferError, ProjectSystemError, WorkspaceError};
pub use events::{CollectingEmitter, EventEmitter, NullEmitter, ServerEvent, TracingEmitter};
pub use process::{CommandRunner, ExitStatus, ProcessRunner};
pub use project::{Document, DocumentId, Project, ProjectId};
pub use project_system::{DirectoryProjectSystem, ProjectSystem, ProjectSystemHost};
pub use restore::RestoreService;
pub use watcher::{FileWatcher, ManualWatcher, WatchCallback, WatchTarget};
pub use workspace::{Solution, Workspace};
