//! The capability registry: (endpoint × language) → handler.
//!
//! Descriptors are registered once at startup; handlers are added
//! explicitly at composition time (no runtime discovery). Adding a
//! second handler for the same (endpoint, language) pair is rejected
//! at registration unless the endpoint's response type is mergeable.
use std::collections::HashMap;
use std::sync::Arc;

use lingo_protocol::endpoints::{self, EndpointDescriptor};

use crate::error::ServerError;
use crate::handler::RequestHandler;

struct Registration {
    language: String,
    handler: Arc<dyn RequestHandler>,
}

/// Directory of endpoint descriptors and their handlers.
pub struct HandlerRegistry {
    descriptors: HashMap<&'static str, EndpointDescriptor>,
    handlers: HashMap<&'static str, Vec<Registration>>,
}

impl HandlerRegistry {
    /// Create a registry with no endpoints.
    pub fn new() -> Self {
        Self {
            descriptors: HashMap::new(),
            handlers: HashMap::new(),
        }
    }

    /// Create a registry preloaded with the built-in endpoint table.
    pub fn with_default_endpoints() -> Self {
        let mut registry = Self::new();
        for descriptor in endpoints::default_descriptors() {
            // The built-in table has unique names.
            let _ = registry.register_endpoint(descriptor);
        }
        registry
    }

    /// Register an endpoint descriptor. At most one per name.
    pub fn register_endpoint(&mut self, descriptor: EndpointDescriptor) -> Result<(), ServerError> {
        if self.descriptors.contains_key(descriptor.name) {
            return Err(ServerError::DuplicateEndpoint(descriptor.name.to_string()));
        }
        self.descriptors.insert(descriptor.name, descriptor);
        Ok(())
    }

    /// Look up a descriptor by endpoint name.
    pub fn descriptor(&self, endpoint: &str) -> Option<&EndpointDescriptor> {
        self.descriptors.get(endpoint)
    }

    /// Register a handler for (endpoint, language).
    ///
    /// Fails if the endpoint is unknown, or if the endpoint's response
    /// is not mergeable and the pair already has a handler.
    pub fn add_handler(
        &mut self,
        endpoint: &str,
        language: impl Into<String>,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<(), ServerError> {
        let descriptor = self
            .descriptors
            .get(endpoint)
            .ok_or_else(|| ServerError::UnknownEndpoint(endpoint.to_string()))?;
        let language = language.into();
        let registrations = self.handlers.entry(descriptor.name).or_default();
        if !descriptor.mergeable && registrations.iter().any(|r| r.language == language) {
            return Err(ServerError::DuplicateHandler {
                endpoint: endpoint.to_string(),
                language,
            });
        }
        tracing::debug!(endpoint, %language, "handler registered");
        registrations.push(Registration { language, handler });
        Ok(())
    }

    /// All handlers registered for (endpoint, language), in
    /// registration order.
    pub fn resolve(&self, endpoint: &str, language: &str) -> Vec<Arc<dyn RequestHandler>> {
        self.handlers
            .get(endpoint)
            .map(|registrations| {
                registrations
                    .iter()
                    .filter(|r| r.language == language)
                    .map(|r| r.handler.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every handler registered under `endpoint`, regardless of
    /// language (fan-out resolution).
    pub fn resolve_all(&self, endpoint: &str) -> Vec<Arc<dyn RequestHandler>> {
        self.handlers
            .get(endpoint)
            .map(|registrations| registrations.iter().map(|r| r.handler.clone()).collect())
            .unwrap_or_default()
    }

    /// Whether any handler serves (endpoint, language).
    pub fn has_handler(&self, endpoint: &str, language: &str) -> bool {
        !self.resolve(endpoint, language).is_empty()
    }

    /// Number of registered endpoint descriptors.
    pub fn endpoint_count(&self) -> usize {
        self.descriptors.len()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_default_endpoints()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use lingo_protocol::response::Response;

    use crate::handler::RequestContext;

    struct NullHandler;

    #[async_trait]
    impl RequestHandler for NullHandler {
        async fn handle(&self, _context: &RequestContext) -> Result<Response, ServerError> {
            Ok(Response::Empty)
        }
    }

    #[test]
    fn empty_registry_has_no_endpoints() {
        let registry = HandlerRegistry::new();
        assert_eq!(registry.endpoint_count(), 0);
        assert!(registry.descriptor(endpoints::CODE_CHECK).is_none());
    }

    #[test]
    fn default_endpoints_are_loaded() {
        let registry = HandlerRegistry::with_default_endpoints();
        assert!(registry.descriptor(endpoints::CODE_CHECK).is_some());
        assert!(registry.descriptor(endpoints::UPDATE_BUFFER).is_some());
        assert!(registry.descriptor("/nope").is_none());
    }

    #[test]
    fn duplicate_descriptor_is_rejected() {
        let mut registry = HandlerRegistry::with_default_endpoints();
        let result =
            registry.register_endpoint(EndpointDescriptor::language_owned(endpoints::CODE_CHECK));
        assert!(matches!(result, Err(ServerError::DuplicateEndpoint(_))));
    }

    #[test]
    fn resolve_returns_exactly_the_registered_handler() {
        let mut registry = HandlerRegistry::with_default_endpoints();
        registry
            .add_handler(endpoints::CODE_CHECK, "csharp", Arc::new(NullHandler))
            .unwrap();

        assert_eq!(registry.resolve(endpoints::CODE_CHECK, "csharp").len(), 1);
        assert!(registry.resolve(endpoints::CODE_CHECK, "fsharp").is_empty());
        assert!(registry.resolve(endpoints::AUTO_COMPLETE, "csharp").is_empty());
    }

    #[test]
    fn add_handler_for_unknown_endpoint_fails() {
        let mut registry = HandlerRegistry::with_default_endpoints();
        let result = registry.add_handler("/nope", "csharp", Arc::new(NullHandler));
        assert!(matches!(result, Err(ServerError::UnknownEndpoint(_))));
    }

    #[test]
    fn mergeable_endpoint_accepts_multiple_handlers_per_language() {
        let mut registry = HandlerRegistry::with_default_endpoints();
        registry
            .add_handler(endpoints::CODE_CHECK, "csharp", Arc::new(NullHandler))
            .unwrap();
        registry
            .add_handler(endpoints::CODE_CHECK, "csharp", Arc::new(NullHandler))
            .unwrap();
        assert_eq!(registry.resolve(endpoints::CODE_CHECK, "csharp").len(), 2);
    }

    #[test]
    fn non_mergeable_endpoint_rejects_second_handler_for_same_language() {
        let mut registry = HandlerRegistry::with_default_endpoints();
        registry
            .add_handler(endpoints::CODE_FORMAT, "csharp", Arc::new(NullHandler))
            .unwrap();
        let result = registry.add_handler(endpoints::CODE_FORMAT, "csharp", Arc::new(NullHandler));
        assert!(matches!(result, Err(ServerError::DuplicateHandler { .. })));
    }

    #[test]
    fn non_mergeable_endpoint_allows_different_languages() {
        let mut registry = HandlerRegistry::with_default_endpoints();
        registry
            .add_handler(endpoints::CODE_FORMAT, "csharp", Arc::new(NullHandler))
            .unwrap();
        registry
            .add_handler(endpoints::CODE_FORMAT, "fsharp", Arc::new(NullHandler))
            .unwrap();
        assert_eq!(registry.resolve_all(endpoints::CODE_FORMAT).len(), 2);
    }

    #[test]
    fn resolve_all_spans_languages() {
        let mut registry = HandlerRegistry::with_default_endpoints();
        registry
            .add_handler(endpoints::FIND_SYMBOLS, "csharp", Arc::new(NullHandler))
            .unwrap();
        registry
            .add_handler(endpoints::FIND_SYMBOLS, "fsharp", Arc::new(NullHandler))
            .unwrap();
        assert_eq!(registry.resolve_all(endpoints::FIND_SYMBOLS).len(), 2);
    }

    #[test]
    fn has_handler_reflects_registrations() {
        let mut registry = HandlerRegistry::with_default_endpoints();
        assert!(!registry.has_handler(endpoints::CODE_CHECK, "csharp"));
        registry
            .add_handler(endpoints::CODE_CHECK, "csharp", Arc::new(NullHandler))
            .unwrap();
        assert!(registry.has_handler(endpoints::CODE_CHECK, "csharp"));
    }
}
