//! The project-system plugin contract and its reference
//! implementation.
//!
//! A project system owns one build ecosystem's projects: it discovers
//! them at initialization, populates the workspace, and reconciles
//! file-system changes into workspace deltas. Systems are registered
//! explicitly with the [`ProjectSystemHost`]; a system that fails to
//! initialize is disabled for the session without affecting the rest.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use lingo_protocol::request::ChangeKind;

use crate::error::ProjectSystemError;
use crate::events::{EventEmitter, ServerEvent};
use crate::project::{Project, ProjectId};
use crate::watcher::{FileWatcher, WatchTarget};
use crate::workspace::Workspace;

/// One build ecosystem's view of the workspace.
///
/// Lifecycle: constructed once, then `initialize` runs first discovery
/// and installs watch callbacks. Repeat `initialize` calls are no-ops.
/// There is no teardown; a system lives for the process lifetime.
#[async_trait]
pub trait ProjectSystem: Send + Sync {
    /// Stable key identifying this system (e.g. the build-system name).
    fn key(&self) -> &str;

    /// The language this system's projects are written in.
    fn language(&self) -> &str;

    /// File extensions (with leading dot) this system claims.
    fn extensions(&self) -> &[String];

    /// Whether the host should initialize this system without explicit
    /// opt-in.
    fn enabled_by_default(&self) -> bool {
        true
    }

    /// Whether `initialize` has completed successfully.
    fn initialized(&self) -> bool;

    /// First project discovery: populate the workspace and install
    /// watch callbacks. Idempotent.
    async fn initialize(&self) -> Result<(), ProjectSystemError>;

    /// A serializable snapshot of this system's projects, for
    /// introspection. Not used for control flow.
    async fn workspace_model(&self) -> serde_json::Value;

    /// Project metadata for the project owning `path`, if this system
    /// owns it.
    async fn project_model(&self, path: &Path) -> Option<serde_json::Value>;

    /// React to a file-system change for a path this system may own.
    async fn on_file_change(&self, path: &Path, kind: ChangeKind);
}

/// Registry of project systems with failure isolation.
pub struct ProjectSystemHost {
    systems: Vec<Arc<dyn ProjectSystem>>,
    emitter: Arc<dyn EventEmitter>,
}

impl ProjectSystemHost {
    /// Create an empty host reporting through `emitter`.
    pub fn new(emitter: Arc<dyn EventEmitter>) -> Self {
        Self {
            systems: Vec::new(),
            emitter,
        }
    }

    /// Register a project system. Registration order is initialization
    /// order.
    pub fn register(&mut self, system: Arc<dyn ProjectSystem>) {
        self.systems.push(system);
    }

    /// The registered systems.
    pub fn systems(&self) -> &[Arc<dyn ProjectSystem>] {
        &self.systems
    }

    /// Initialize every enabled system.
    ///
    /// A system that fails stays uninitialized and is skipped by the
    /// query methods, but never prevents the others from starting.
    pub async fn initialize_all(&self) {
        for system in &self.systems {
            if !system.enabled_by_default() {
                tracing::debug!(key = system.key(), "project system disabled by default");
                continue;
            }
            match system.initialize().await {
                Ok(()) => {
                    tracing::info!(key = system.key(), "project system initialized");
                }
                Err(error) => {
                    tracing::error!(key = system.key(), %error, "project system failed to initialize");
                    self.emitter.emit(ServerEvent::Error {
                        message: format!("project system {} disabled: {error}", system.key()),
                    });
                }
            }
        }
    }

    /// The language of the system claiming `path`'s extension, if any.
    ///
    /// Only initialized systems participate.
    pub fn extension_language(&self, path: &Path) -> Option<String> {
        let ext = path.extension().and_then(|e| e.to_str())?;
        let dotted = format!(".{ext}");
        self.systems
            .iter()
            .filter(|s| s.initialized())
            .find(|s| s.extensions().iter().any(|e| *e == dotted))
            .map(|s| s.language().to_string())
    }

    /// Workspace models of every initialized system, keyed by system
    /// key.
    pub async fn workspace_models(&self) -> BTreeMap<String, serde_json::Value> {
        let mut models = BTreeMap::new();
        for system in self.systems.iter().filter(|s| s.initialized()) {
            models.insert(system.key().to_string(), system.workspace_model().await);
        }
        models
    }

    /// The first project model any initialized system reports for
    /// `path`.
    pub async fn project_model(&self, path: &Path) -> Option<serde_json::Value> {
        for system in self.systems.iter().filter(|s| s.initialized()) {
            if let Some(model) = system.project_model(path).await {
                return Some(model);
            }
        }
        None
    }

    /// Broadcast a file change to every initialized system.
    pub async fn notify_file_change(&self, path: &Path, kind: ChangeKind) {
        for system in self.systems.iter().filter(|s| s.initialized()) {
            system.on_file_change(path, kind).await;
        }
    }
}

/// Reference project system: one project per root directory, claiming
/// every file under it with a matching extension.
pub struct DirectoryProjectSystem {
    key: String,
    language: String,
    extensions: Vec<String>,
    root: PathBuf,
    workspace: Arc<Workspace>,
    watcher: Option<Arc<dyn FileWatcher>>,
    initialized: AtomicBool,
    project: Mutex<Option<ProjectId>>,
}

impl DirectoryProjectSystem {
    /// Create a system rooted at `root` for `language` files.
    pub fn new(
        key: impl Into<String>,
        language: impl Into<String>,
        extensions: Vec<String>,
        root: PathBuf,
        workspace: Arc<Workspace>,
    ) -> Self {
        Self {
            key: key.into(),
            language: language.into(),
            extensions,
            root,
            workspace,
            watcher: None,
            initialized: AtomicBool::new(false),
            project: Mutex::new(None),
        }
    }

    /// Install a watcher; `initialize` will register its callbacks.
    pub fn with_watcher(mut self, watcher: Arc<dyn FileWatcher>) -> Self {
        self.watcher = Some(watcher);
        self
    }

    fn project_id(&self) -> Option<ProjectId> {
        match self.project.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn claims(&self, path: &Path) -> bool {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => self.extensions.iter().any(|e| *e == format!(".{ext}")),
            None => false,
        }
    }

    fn collect_files(&self, dir: &Path, found: &mut Vec<PathBuf>) -> std::io::Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                self.collect_files(&path, found)?;
            } else if self.claims(&path) {
                found.push(path);
            }
        }
        Ok(())
    }
}

/// Apply the workspace delta for one file-system change.
///
/// Only the delta is applied: documents whose provenance is unchanged
/// keep their in-memory text, so unsaved buffer edits survive
/// unrelated topology churn.
fn reconcile(workspace: &Workspace, project: ProjectId, path: &Path, kind: ChangeKind) {
    let tracked = workspace.snapshot().document_for_path(path).is_some();
    match kind {
        ChangeKind::Create => {
            if !tracked {
                add_from_disk(workspace, project, path);
            }
        }
        ChangeKind::Delete => {
            if tracked {
                if let Err(error) = workspace.remove_document_at(path) {
                    tracing::warn!(path = %path.display(), %error, "failed to remove document");
                }
            }
        }
        ChangeKind::Change => {
            // The document's provenance is unchanged; leave its text
            // alone so unsaved buffer edits are not lost.
            if !tracked {
                add_from_disk(workspace, project, path);
            }
        }
        ChangeKind::Unspecified => {
            if path.exists() {
                if !tracked {
                    add_from_disk(workspace, project, path);
                }
            } else if tracked {
                let _ = workspace.remove_document_at(path);
            }
        }
    }
}

fn add_from_disk(workspace: &Workspace, project: ProjectId, path: &Path) {
    let text = std::fs::read_to_string(path).unwrap_or_default();
    if let Err(error) = workspace.add_document(project, path.to_path_buf(), &text) {
        tracing::warn!(path = %path.display(), %error, "failed to add document");
    }
}

#[async_trait]
impl ProjectSystem for DirectoryProjectSystem {
    fn key(&self) -> &str {
        &self.key
    }

    fn language(&self) -> &str {
        &self.language
    }

    fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    async fn initialize(&self) -> Result<(), ProjectSystemError> {
        if self.initialized() {
            return Ok(());
        }
        if !self.root.is_dir() {
            return Err(ProjectSystemError::InitFailed {
                key: self.key.clone(),
                reason: format!("root directory {} does not exist", self.root.display()),
            });
        }

        let mut files = Vec::new();
        self.collect_files(&self.root, &mut files)?;

        let name = self
            .root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("root")
            .to_string();
        let project_id = self
            .workspace
            .add_project(Project::new(&self.key, name, &self.language));
        {
            let mut guard = match self.project.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *guard = Some(project_id);
        }

        for path in &files {
            add_from_disk(&self.workspace, project_id, path);
        }
        tracing::info!(
            key = %self.key,
            files = files.len(),
            "discovered project files"
        );

        if let Some(watcher) = &self.watcher {
            for extension in &self.extensions {
                let workspace = self.workspace.clone();
                let bare = extension.trim_start_matches('.').to_string();
                watcher.watch(
                    WatchTarget::Extension(bare),
                    Box::new(move |path, kind| {
                        reconcile(&workspace, project_id, path, kind);
                    }),
                );
            }
        }

        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn workspace_model(&self) -> serde_json::Value {
        let snapshot = self.workspace.snapshot();
        let projects: Vec<serde_json::Value> = self
            .project_id()
            .and_then(|id| snapshot.project(id).map(|p| (id, p)))
            .map(|(id, project)| {
                let mut files: Vec<String> = snapshot
                    .documents_in(id)
                    .map(|d| d.path.display().to_string())
                    .collect();
                files.sort();
                vec![serde_json::json!({
                    "Name": project.name,
                    "Language": project.language,
                    "SourceFiles": files,
                })]
            })
            .unwrap_or_default();
        serde_json::json!({
            "Key": self.key,
            "Language": self.language,
            "Projects": projects,
        })
    }

    async fn project_model(&self, path: &Path) -> Option<serde_json::Value> {
        let project_id = self.project_id()?;
        let snapshot = self.workspace.snapshot();
        let owner = snapshot.owner_of(path)?;
        if owner.id != project_id {
            return None;
        }
        Some(serde_json::json!({
            "Name": owner.name,
            "Language": owner.language,
            "Path": path.display().to_string(),
        }))
    }

    async fn on_file_change(&self, path: &Path, kind: ChangeKind) {
        if !self.claims(path) {
            return;
        }
        if let Some(project_id) = self.project_id() {
            reconcile(&self.workspace, project_id, path, kind);
        }
    }
}
