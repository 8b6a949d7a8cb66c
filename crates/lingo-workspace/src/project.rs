//! Project and document records.
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use ropey::Rope;

/// Global counter for generating unique project IDs.
static NEXT_PROJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Global counter for generating unique document IDs.
static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Key of the designated project hosting files no project system owns.
pub const MISC_PROJECT_KEY: &str = "MiscellaneousFiles";

/// Unique identifier for a project. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ProjectId(pub u64);

impl ProjectId {
    /// Generate a fresh, unique `ProjectId`.
    pub fn next() -> Self {
        Self(NEXT_PROJECT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Unique identifier for a document. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct DocumentId(pub u64);

impl DocumentId {
    /// Generate a fresh, unique `DocumentId`.
    pub fn next() -> Self {
        Self(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Metadata for one project in the workspace.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: ProjectId,
    /// Key of the project system that owns this project.
    pub key: String,
    pub name: String,
    pub language: String,
    pub compilation_options: Vec<String>,
    pub metadata_references: Vec<String>,
    pub project_references: Vec<ProjectId>,
}

impl Project {
    /// Create a project with a fresh id and no options or references.
    pub fn new(key: impl Into<String>, name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            id: ProjectId::next(),
            key: key.into(),
            name: name.into(),
            language: language.into(),
            compilation_options: Vec::new(),
            metadata_references: Vec::new(),
            project_references: Vec::new(),
        }
    }
}

/// One tracked document: a file path, its owning project, and the
/// current in-memory text (possibly ahead of what is on disk).
#[derive(Debug, Clone)]
pub struct Document {
    pub id: DocumentId,
    pub path: PathBuf,
    pub project: ProjectId,
    pub text: Rope,
    /// Bumped on every text update.
    pub version: u64,
}

impl Document {
    /// Create a document with a fresh id at version 0.
    pub fn new(path: PathBuf, project: ProjectId, text: &str) -> Self {
        Self {
            id: DocumentId::next(),
            path,
            project,
            text: Rope::from_str(text),
            version: 0,
        }
    }
}
