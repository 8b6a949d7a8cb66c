//! The predicate layer: deciding which language a request is for.
//!
//! File-scoped requests route by project ownership: the owning
//! project's declared language wins. Unowned files fall back to
//! extension matching against the registered project systems. Files
//! nobody claims resolve to no language at all, which the dispatcher
//! turns into the designated any-language fallback.
use std::path::Path;
use std::sync::Arc;

use lingo_workspace::project_system::ProjectSystemHost;
use lingo_workspace::workspace::Workspace;

/// Resolves the language a file-scoped request targets.
pub struct LanguageSelector {
    workspace: Arc<Workspace>,
    systems: Arc<ProjectSystemHost>,
}

impl LanguageSelector {
    /// Create a selector over the shared workspace and project systems.
    pub fn new(workspace: Arc<Workspace>, systems: Arc<ProjectSystemHost>) -> Self {
        Self { workspace, systems }
    }

    /// The language serving `path`, or `None` when nothing claims it.
    ///
    /// Ownership in the workspace takes precedence over extension
    /// matching, so a file inside a project routes to that project's
    /// language even if several systems claim its extension.
    pub fn language_for(&self, path: &Path) -> Option<String> {
        if let Some(project) = self.workspace.snapshot().owner_of(path) {
            return Some(project.language.clone());
        }
        self.systems.extension_language(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    use lingo_workspace::events::NullEmitter;
    use lingo_workspace::project::Project;
    use lingo_workspace::project_system::DirectoryProjectSystem;

    async fn selector_with_system(root: &Path) -> (Arc<Workspace>, LanguageSelector) {
        let workspace = Arc::new(Workspace::new());
        let system = Arc::new(DirectoryProjectSystem::new(
            "dir",
            "csharp",
            vec![".cs".to_string()],
            root.to_path_buf(),
            workspace.clone(),
        ));
        let mut host = ProjectSystemHost::new(Arc::new(NullEmitter));
        host.register(system);
        host.initialize_all().await;
        let host = Arc::new(host);
        let selector = LanguageSelector::new(workspace.clone(), host);
        (workspace, selector)
    }

    #[tokio::test]
    async fn ownership_beats_extension_matching() {
        let dir = tempfile::tempdir().unwrap();
        let (workspace, selector) = selector_with_system(dir.path()).await;

        // A .cs file owned by an fsharp project routes to fsharp.
        let project = workspace.add_project(Project::new("other", "scripty", "fsharp"));
        workspace
            .add_document(project, PathBuf::from("/owned/weird.cs"), "")
            .unwrap();

        assert_eq!(
            selector.language_for(Path::new("/owned/weird.cs")).as_deref(),
            Some("fsharp")
        );
    }

    #[tokio::test]
    async fn unowned_file_falls_back_to_extension() {
        let dir = tempfile::tempdir().unwrap();
        let (_workspace, selector) = selector_with_system(dir.path()).await;

        assert_eq!(
            selector.language_for(Path::new("/anywhere/a.cs")).as_deref(),
            Some("csharp")
        );
    }

    #[tokio::test]
    async fn unclaimed_extension_resolves_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let (_workspace, selector) = selector_with_system(dir.path()).await;

        assert!(selector.language_for(Path::new("/a.xyz")).is_none());
    }
}
