//! The event-emission collaborator.
//!
//! Project systems and the restore service report progress and
//! failures through an [`EventEmitter`]. Emission is fire-and-forget:
//! the trait is infallible and implementations must never propagate
//! errors back into the caller.
use std::path::PathBuf;
use std::sync::Mutex;

/// An out-of-band event reported to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// A dependency restore began for a working directory.
    RestoreStarted { directory: PathBuf },
    /// A dependency restore finished.
    RestoreFinished { directory: PathBuf, succeeded: bool },
    /// A project references packages that could not be resolved.
    UnresolvedDependencies {
        file_name: PathBuf,
        packages: Vec<String>,
    },
    /// A recoverable error that was swallowed at a component boundary.
    Error { message: String },
}

/// Sink for out-of-band server events.
pub trait EventEmitter: Send + Sync {
    /// Report an event. Must not block meaningfully and must not fail.
    fn emit(&self, event: ServerEvent);
}

/// Emitter that forwards events to the `tracing` subscriber.
#[derive(Debug, Default)]
pub struct TracingEmitter;

impl EventEmitter for TracingEmitter {
    fn emit(&self, event: ServerEvent) {
        match &event {
            ServerEvent::RestoreStarted { directory } => {
                tracing::info!(directory = %directory.display(), "restore started");
            }
            ServerEvent::RestoreFinished { directory, succeeded } => {
                tracing::info!(directory = %directory.display(), succeeded, "restore finished");
            }
            ServerEvent::UnresolvedDependencies { file_name, packages } => {
                tracing::warn!(
                    file = %file_name.display(),
                    ?packages,
                    "unresolved dependencies"
                );
            }
            ServerEvent::Error { message } => {
                tracing::error!(%message, "component error");
            }
        }
    }
}

/// Emitter that drops every event.
#[derive(Debug, Default)]
pub struct NullEmitter;

impl EventEmitter for NullEmitter {
    fn emit(&self, _event: ServerEvent) {}
}

/// Emitter that records events for later inspection. Intended for
/// tests and diagnostics.
#[derive(Debug, Default)]
pub struct CollectingEmitter {
    events: Mutex<Vec<ServerEvent>>,
}

impl CollectingEmitter {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of every event emitted so far, in emission order.
    pub fn events(&self) -> Vec<ServerEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventEmitter for CollectingEmitter {
    fn emit(&self, event: ServerEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}
