//! The shared mutable workspace: projects, documents, snapshots.
//!
//! Reads go through [`Workspace::snapshot`], which hands out a
//! consistent point-in-time [`Solution`] clone (rope clones are cheap,
//! so this is a shallow copy). Mutations serialize behind an internal
//! lock and apply atomically; a reader never observes a half-applied
//! change.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use ropey::Rope;

use crate::error::WorkspaceError;
use crate::project::{Document, DocumentId, Project, ProjectId, MISC_PROJECT_KEY};

/// A point-in-time view of all projects and documents.
#[derive(Debug, Clone, Default)]
pub struct Solution {
    projects: HashMap<ProjectId, Project>,
    documents: HashMap<DocumentId, Document>,
    by_path: HashMap<PathBuf, DocumentId>,
}

impl Solution {
    /// Look up a project by id.
    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.get(&id)
    }

    /// Look up a document by id.
    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        self.documents.get(&id)
    }

    /// Look up a document by file path.
    pub fn document_for_path(&self, path: &Path) -> Option<&Document> {
        self.by_path.get(path).and_then(|id| self.documents.get(id))
    }

    /// The project owning the document at `path`, if tracked.
    pub fn owner_of(&self, path: &Path) -> Option<&Project> {
        self.document_for_path(path)
            .and_then(|doc| self.projects.get(&doc.project))
    }

    /// All projects, in unspecified order.
    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    /// All documents belonging to `project`, in unspecified order.
    pub fn documents_in(&self, project: ProjectId) -> impl Iterator<Item = &Document> {
        self.documents.values().filter(move |d| d.project == project)
    }

    /// Number of tracked documents.
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Number of projects.
    pub fn project_count(&self) -> usize {
        self.projects.len()
    }
}

/// The single shared mutable source of truth for projects and
/// documents.
#[derive(Debug, Default)]
pub struct Workspace {
    inner: RwLock<Solution>,
}

impl Workspace {
    /// Create an empty workspace.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Solution> {
        // A panic while holding the lock leaves the data itself intact;
        // recover the guard rather than poisoning every later caller.
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Solution> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// A consistent point-in-time view for read-heavy handler use.
    pub fn snapshot(&self) -> Solution {
        self.read().clone()
    }

    /// Add a project. The caller allocates the id via [`Project::new`].
    pub fn add_project(&self, project: Project) -> ProjectId {
        let id = project.id;
        let mut solution = self.write();
        solution.projects.insert(id, project);
        id
    }

    /// Remove a project and every document it owns.
    ///
    /// The removed ids are invalidated permanently.
    pub fn remove_project(&self, id: ProjectId) -> Result<(), WorkspaceError> {
        let mut solution = self.write();
        if solution.projects.remove(&id).is_none() {
            return Err(WorkspaceError::ProjectNotFound(id));
        }
        let orphaned: Vec<DocumentId> = solution
            .documents
            .values()
            .filter(|d| d.project == id)
            .map(|d| d.id)
            .collect();
        for doc_id in orphaned {
            if let Some(doc) = solution.documents.remove(&doc_id) {
                solution.by_path.remove(&doc.path);
            }
        }
        Ok(())
    }

    /// Add a document to `project`. Paths are unique workspace-wide.
    pub fn add_document(
        &self,
        project: ProjectId,
        path: PathBuf,
        text: &str,
    ) -> Result<DocumentId, WorkspaceError> {
        let mut solution = self.write();
        if !solution.projects.contains_key(&project) {
            return Err(WorkspaceError::ProjectNotFound(project));
        }
        if solution.by_path.contains_key(&path) {
            return Err(WorkspaceError::DuplicatePath(path));
        }
        let doc = Document::new(path.clone(), project, text);
        let id = doc.id;
        solution.by_path.insert(path, id);
        solution.documents.insert(id, doc);
        Ok(id)
    }

    /// Remove a document by id. The id is invalidated permanently.
    pub fn remove_document(&self, id: DocumentId) -> Result<(), WorkspaceError> {
        let mut solution = self.write();
        match solution.documents.remove(&id) {
            Some(doc) => {
                solution.by_path.remove(&doc.path);
                Ok(())
            }
            None => Err(WorkspaceError::DocumentNotFound(id)),
        }
    }

    /// Remove the document tracked at `path`, if any.
    pub fn remove_document_at(&self, path: &Path) -> Result<(), WorkspaceError> {
        let mut solution = self.write();
        match solution.by_path.remove(path) {
            Some(id) => {
                solution.documents.remove(&id);
                Ok(())
            }
            None => Err(WorkspaceError::PathNotTracked(path.to_path_buf())),
        }
    }

    /// Mutate the text of the document at `path` under the write lock.
    ///
    /// The edit closure runs exactly once; the document version is
    /// bumped afterward. Returns the new version.
    pub fn update_document_text<F>(&self, path: &Path, edit: F) -> Result<u64, WorkspaceError>
    where
        F: FnOnce(&mut Rope),
    {
        let mut solution = self.write();
        let id = *solution
            .by_path
            .get(path)
            .ok_or_else(|| WorkspaceError::PathNotTracked(path.to_path_buf()))?;
        let doc = solution
            .documents
            .get_mut(&id)
            .ok_or(WorkspaceError::DocumentNotFound(id))?;
        edit(&mut doc.text);
        doc.version += 1;
        Ok(doc.version)
    }

    /// Replace a project's compilation options.
    pub fn set_compilation_options(
        &self,
        id: ProjectId,
        options: Vec<String>,
    ) -> Result<(), WorkspaceError> {
        self.with_project(id, |p| p.compilation_options = options)
    }

    /// Add a metadata reference to a project. No-op if already present.
    pub fn add_metadata_reference(
        &self,
        id: ProjectId,
        reference: impl Into<String>,
    ) -> Result<(), WorkspaceError> {
        let reference = reference.into();
        self.with_project(id, |p| {
            if !p.metadata_references.contains(&reference) {
                p.metadata_references.push(reference);
            }
        })
    }

    /// Remove a metadata reference from a project.
    pub fn remove_metadata_reference(
        &self,
        id: ProjectId,
        reference: &str,
    ) -> Result<(), WorkspaceError> {
        self.with_project(id, |p| {
            p.metadata_references.retain(|r| r != reference);
        })
    }

    /// Add a project-to-project reference. No-op if already present.
    pub fn add_project_reference(
        &self,
        id: ProjectId,
        target: ProjectId,
    ) -> Result<(), WorkspaceError> {
        let mut solution = self.write();
        if !solution.projects.contains_key(&target) {
            return Err(WorkspaceError::ProjectNotFound(target));
        }
        let project = solution
            .projects
            .get_mut(&id)
            .ok_or(WorkspaceError::ProjectNotFound(id))?;
        if !project.project_references.contains(&target) {
            project.project_references.push(target);
        }
        Ok(())
    }

    /// Remove a project-to-project reference.
    pub fn remove_project_reference(
        &self,
        id: ProjectId,
        target: ProjectId,
    ) -> Result<(), WorkspaceError> {
        self.with_project(id, |p| {
            p.project_references.retain(|r| *r != target);
        })
    }

    /// The miscellaneous-files project, created on first use.
    pub fn ensure_misc_project(&self, language: &str) -> ProjectId {
        let existing = {
            let solution = self.read();
            let id = solution
                .projects()
                .find(|p| p.key == MISC_PROJECT_KEY)
                .map(|p| p.id);
            id
        };
        if let Some(id) = existing {
            return id;
        }
        let mut solution = self.write();
        // Re-check under the write lock; another writer may have won.
        if let Some(p) = solution.projects.values().find(|p| p.key == MISC_PROJECT_KEY) {
            return p.id;
        }
        let project = Project::new(MISC_PROJECT_KEY, MISC_PROJECT_KEY, language);
        let id = project.id;
        solution.projects.insert(id, project);
        id
    }

    fn with_project<F>(&self, id: ProjectId, apply: F) -> Result<(), WorkspaceError>
    where
        F: FnOnce(&mut Project),
    {
        let mut solution = self.write();
        let project = solution
            .projects
            .get_mut(&id)
            .ok_or(WorkspaceError::ProjectNotFound(id))?;
        apply(project);
        Ok(())
    }
}
