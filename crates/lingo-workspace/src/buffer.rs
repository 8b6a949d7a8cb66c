//! Buffer synchronization: applying editor-reported text updates to
//! workspace documents.
//!
//! An update either reloads the file from disk, replaces the text
//! wholesale, or applies an ordered list of span changes. Changes are
//! applied sequentially (each against the text the previous one
//! produced) or, when the request asks for it, collapsed into one
//! combined edit so the compiler sees a single incremental change.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ropey::Rope;

use lingo_core::change::{self, TextChange};
use lingo_protocol::endpoints::LANG_ANY;
use lingo_protocol::request::UpdateBufferRequest;

use crate::error::BufferError;
use crate::workspace::Workspace;

/// Applies buffer-update requests to the correct document, creating a
/// miscellaneous-project document when the path is not yet tracked.
pub struct BufferManager {
    workspace: Arc<Workspace>,
    /// Whether untracked files may fall back to the miscellaneous
    /// project. When disabled, updates for untracked paths fail hard.
    misc_enabled: bool,
}

impl BufferManager {
    /// Create a manager over `workspace` with the miscellaneous-files
    /// fallback enabled.
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self {
            workspace,
            misc_enabled: true,
        }
    }

    /// Disable the miscellaneous-files fallback.
    pub fn without_misc_fallback(mut self) -> Self {
        self.misc_enabled = false;
        self
    }

    /// Apply an `/updatebuffer` request. Positions in the request must
    /// already be decoded to the zero-based internal form.
    pub async fn update(&self, request: &UpdateBufferRequest) -> Result<(), BufferError> {
        let path = request
            .envelope
            .file_name
            .as_deref()
            .map(PathBuf::from)
            .ok_or(BufferError::MissingFileName)?;

        if request.from_disk {
            let text = tokio::fs::read_to_string(&path).await?;
            return self.replace(&path, &text);
        }

        if let Some(buffer) = &request.envelope.buffer {
            return self.replace(&path, buffer);
        }

        if let Some(changes) = &request.envelope.changes {
            if changes.is_empty() {
                return Ok(());
            }
            self.ensure_tracked(&path).await?;
            return self
                .apply_changes(&path, changes, request.envelope.apply_changes_together)
                .map_err(BufferError::from);
        }

        tracing::debug!(path = %path.display(), "buffer update carried no content");
        Ok(())
    }

    /// Apply a single span replacement (the `/changebuffer` operation).
    pub async fn change(&self, path: &Path, change: &TextChange) -> Result<(), BufferError> {
        self.ensure_tracked(path).await?;
        self.workspace
            .update_document_text(path, |text| change::apply_change(text, change))
            .map(|_| ())
            .map_err(BufferError::from)
    }

    fn replace(&self, path: &Path, text: &str) -> Result<(), BufferError> {
        if self.workspace.snapshot().document_for_path(path).is_none() {
            self.create_misc_document(path, text)?;
            return Ok(());
        }
        self.workspace
            .update_document_text(path, |rope| *rope = Rope::from_str(text))?;
        Ok(())
    }

    fn apply_changes(
        &self,
        path: &Path,
        changes: &[TextChange],
        together: bool,
    ) -> Result<(), crate::error::WorkspaceError> {
        self.workspace.update_document_text(path, |text| {
            if together {
                if let Some(combined) = change::combine_changes(text, changes) {
                    change::apply_change(text, &combined);
                }
            } else {
                change::apply_changes_sequential(text, changes);
            }
        })?;
        Ok(())
    }

    /// Make sure a document exists for `path`, seeding it from disk
    /// content when the file exists, so incremental changes have a
    /// base text to apply against.
    async fn ensure_tracked(&self, path: &Path) -> Result<(), BufferError> {
        if self.workspace.snapshot().document_for_path(path).is_some() {
            return Ok(());
        }
        let seed = tokio::fs::read_to_string(path).await.unwrap_or_default();
        self.create_misc_document(path, &seed)?;
        Ok(())
    }

    fn create_misc_document(&self, path: &Path, text: &str) -> Result<(), BufferError> {
        if !self.misc_enabled {
            return Err(BufferError::UntrackedFile(path.to_path_buf()));
        }
        let misc = self.workspace.ensure_misc_project(LANG_ANY);
        tracing::debug!(path = %path.display(), "adding file to the miscellaneous project");
        self.workspace
            .add_document(misc, path.to_path_buf(), text)?;
        Ok(())
    }
}
