//! Endpoint names and descriptors.
//!
//! Every operation the server exposes is keyed by a string path shared
//! across transports. A descriptor is registered once per name at
//! startup and declares the routing strategy and whether the endpoint's
//! response type supports merging contributions from several handlers.

/// Code diagnostics for a file or the whole workspace.
pub const CODE_CHECK: &str = "/codecheck";
/// Completion suggestions at a position.
pub const AUTO_COMPLETE: &str = "/autocomplete";
/// Whole-document formatting.
pub const CODE_FORMAT: &str = "/codeformat";
/// Workspace-wide symbol search.
pub const FIND_SYMBOLS: &str = "/findsymbols";
/// Locations implementing the symbol at a position.
pub const FIND_IMPLEMENTATIONS: &str = "/findimplementations";
/// Type and documentation for the symbol at a position.
pub const TYPE_LOOKUP: &str = "/typelookup";
/// Synchronize a document's in-memory text with the editor's view.
pub const UPDATE_BUFFER: &str = "/updatebuffer";
/// Apply a single span replacement to a document.
pub const CHANGE_BUFFER: &str = "/changebuffer";
/// Broadcast file-system change notifications to all project systems.
pub const FILES_CHANGED: &str = "/filesChanged";
/// Execute a previously offered code action.
pub const RUN_CODE_ACTION: &str = "/runcodeaction";
/// Model of every project known to the workspace.
pub const WORKSPACE_INFORMATION: &str = "/projects";
/// Model of the project owning one file.
pub const PROJECT_INFORMATION: &str = "/project";

/// Pseudo-language tag for project-system introspection endpoints.
pub const LANG_PROJECTS: &str = "projects";
/// Fallback language tag for files no project system claims.
pub const LANG_ANY: &str = "any";

/// How requests to an endpoint select their handler(s).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchKind {
    /// The owning project of the request's file determines the language.
    LanguageOwned,
    /// A fixed pseudo-language, independent of request content.
    Static(&'static str),
    /// Every handler registered under the endpoint name is invoked.
    FanOut,
}

/// Immutable per-endpoint metadata, registered once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    /// The unique endpoint path, e.g. `/codecheck`.
    pub name: &'static str,
    /// Routing strategy for incoming requests.
    pub dispatch: DispatchKind,
    /// Whether multiple handler results can be merged into one response.
    pub mergeable: bool,
    /// Whether the endpoint honors the configured request timeout.
    pub timeout_sensitive: bool,
}

impl EndpointDescriptor {
    /// A language-routed endpoint with a non-mergeable response.
    pub fn language_owned(name: &'static str) -> Self {
        Self {
            name,
            dispatch: DispatchKind::LanguageOwned,
            mergeable: false,
            timeout_sensitive: false,
        }
    }

    /// Mark the response type as mergeable across handlers.
    pub fn mergeable(mut self) -> Self {
        self.mergeable = true;
        self
    }

    /// Mark the endpoint as honoring the configured timeout.
    pub fn timeout_sensitive(mut self) -> Self {
        self.timeout_sensitive = true;
        self
    }

    /// An endpoint routed to a fixed pseudo-language tag.
    pub fn static_tag(name: &'static str, tag: &'static str) -> Self {
        Self {
            name,
            dispatch: DispatchKind::Static(tag),
            mergeable: false,
            timeout_sensitive: false,
        }
    }

    /// A broadcast endpoint invoking every registered handler.
    pub fn fan_out(name: &'static str) -> Self {
        Self {
            name,
            dispatch: DispatchKind::FanOut,
            mergeable: true,
            timeout_sensitive: false,
        }
    }
}

/// The descriptor table for the built-in endpoints.
pub fn default_descriptors() -> Vec<EndpointDescriptor> {
    vec![
        EndpointDescriptor::language_owned(CODE_CHECK).mergeable(),
        EndpointDescriptor::language_owned(AUTO_COMPLETE).mergeable(),
        EndpointDescriptor::language_owned(CODE_FORMAT),
        EndpointDescriptor::language_owned(FIND_SYMBOLS)
            .mergeable()
            .timeout_sensitive(),
        EndpointDescriptor::language_owned(FIND_IMPLEMENTATIONS).timeout_sensitive(),
        EndpointDescriptor::language_owned(TYPE_LOOKUP),
        EndpointDescriptor::language_owned(RUN_CODE_ACTION).timeout_sensitive(),
        EndpointDescriptor::static_tag(UPDATE_BUFFER, LANG_ANY),
        EndpointDescriptor::static_tag(CHANGE_BUFFER, LANG_ANY),
        EndpointDescriptor::fan_out(FILES_CHANGED),
        EndpointDescriptor::static_tag(WORKSPACE_INFORMATION, LANG_PROJECTS),
        EndpointDescriptor::static_tag(PROJECT_INFORMATION, LANG_PROJECTS),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_descriptors_have_unique_names() {
        let descriptors = default_descriptors();
        let mut names: Vec<_> = descriptors.iter().map(|d| d.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), descriptors.len());
    }

    #[test]
    fn code_check_is_language_owned_and_mergeable() {
        let d = default_descriptors()
            .into_iter()
            .find(|d| d.name == CODE_CHECK)
            .unwrap();
        assert_eq!(d.dispatch, DispatchKind::LanguageOwned);
        assert!(d.mergeable);
    }

    #[test]
    fn workspace_information_uses_projects_tag() {
        let d = default_descriptors()
            .into_iter()
            .find(|d| d.name == WORKSPACE_INFORMATION)
            .unwrap();
        assert_eq!(d.dispatch, DispatchKind::Static(LANG_PROJECTS));
    }

    #[test]
    fn files_changed_is_fan_out() {
        let d = default_descriptors()
            .into_iter()
            .find(|d| d.name == FILES_CHANGED)
            .unwrap();
        assert_eq!(d.dispatch, DispatchKind::FanOut);
        assert!(d.mergeable);
    }

    #[test]
    fn code_format_is_not_mergeable() {
        let d = default_descriptors()
            .into_iter()
            .find(|d| d.name == CODE_FORMAT)
            .unwrap();
        assert!(!d.mergeable);
    }

    #[test]
    fn find_symbols_is_timeout_sensitive() {
        let d = default_descriptors()
            .into_iter()
            .find(|d| d.name == FIND_SYMBOLS)
            .unwrap();
        assert!(d.timeout_sensitive);
    }
}
