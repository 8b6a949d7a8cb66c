//! The endpoint dispatcher: one full request/response cycle.
//!
//! For each packet the dispatcher looks up the endpoint descriptor,
//! decodes the envelope, replays any carried buffer changes through
//! the buffer manager, resolves the handler(s) via the predicate
//! layer, invokes them, folds aggregate results, and translates
//! response positions back into the wire convention.
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use lingo_core::convention::IndexConvention;
use lingo_protocol::endpoints::{self, DispatchKind, EndpointDescriptor};
use lingo_protocol::request::{RequestEnvelope, RequestPacket, UpdateBufferRequest};
use lingo_protocol::response::Response;

use lingo_workspace::buffer::BufferManager;

use crate::error::ServerError;
use crate::handler::{RequestContext, RequestHandler};
use crate::predicate::LanguageSelector;
use crate::registry::HandlerRegistry;

/// What happens when one of several fan-out handlers fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartialFailurePolicy {
    /// The first handler error fails the whole request.
    #[default]
    FailFast,
    /// Failed handlers are dropped from the fold; the request fails
    /// only when every handler errored.
    ReturnPartial,
}

/// Orchestrates request/response cycles over the shared workspace.
pub struct EndpointDispatcher {
    registry: HandlerRegistry,
    buffers: Arc<BufferManager>,
    selector: LanguageSelector,
    convention: IndexConvention,
    partial_failure: PartialFailurePolicy,
    timeout: Duration,
}

impl EndpointDispatcher {
    /// Create a dispatcher with zero-based wire positions, fail-fast
    /// aggregation, and a two-second budget for timeout-sensitive
    /// endpoints.
    pub fn new(
        registry: HandlerRegistry,
        buffers: Arc<BufferManager>,
        selector: LanguageSelector,
    ) -> Self {
        Self {
            registry,
            buffers,
            selector,
            convention: IndexConvention::ZeroBased,
            partial_failure: PartialFailurePolicy::default(),
            timeout: Duration::from_secs(2),
        }
    }

    /// Use `convention` at the wire boundary.
    pub fn with_convention(mut self, convention: IndexConvention) -> Self {
        self.convention = convention;
        self
    }

    /// Use `policy` when folding fan-out results.
    pub fn with_partial_failure(mut self, policy: PartialFailurePolicy) -> Self {
        self.partial_failure = policy;
        self
    }

    /// Budget for timeout-sensitive endpoints.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The wire convention in effect.
    pub fn convention(&self) -> IndexConvention {
        self.convention
    }

    /// Serve one request packet, returning the wire-ready response
    /// body.
    ///
    /// Errors propagate to the transport, which formats them for its
    /// protocol; a failed request never affects other in-flight
    /// requests or workspace consistency.
    pub async fn dispatch(&self, packet: &RequestPacket) -> Result<serde_json::Value, ServerError> {
        let descriptor = self
            .registry
            .descriptor(&packet.command)
            .ok_or_else(|| ServerError::UnknownEndpoint(packet.command.clone()))?;

        let envelope = self.parse_envelope(&packet.arguments)?;

        // Replay buffer content carried on the request before any
        // analysis runs, so handlers see the editor's view of the
        // text. The buffer endpoints themselves are exempt.
        if descriptor.name != endpoints::UPDATE_BUFFER
            && descriptor.name != endpoints::CHANGE_BUFFER
            && envelope.has_buffer_content()
        {
            let update = UpdateBufferRequest {
                from_disk: false,
                envelope: envelope.clone(),
            };
            self.buffers.update(&update).await?;
        }

        let handlers = self.resolve_handlers(descriptor, &envelope)?;
        let context = RequestContext::new(envelope, packet.arguments.clone(), self.convention);

        let response = if handlers.len() == 1 {
            self.invoke(descriptor, &handlers[0], &context).await?
        } else {
            self.invoke_many(descriptor, &handlers, &context).await?
        };

        Ok(response.to_wire(self.convention))
    }

    fn parse_envelope(&self, arguments: &serde_json::Value) -> Result<RequestEnvelope, ServerError> {
        // Some endpoints (files-changed) take a list payload; those
        // have no common envelope.
        if !arguments.is_object() {
            return Ok(RequestEnvelope::default());
        }
        let envelope: RequestEnvelope = serde_json::from_value(arguments.clone())
            .map_err(lingo_protocol::error::ProtocolError::from)?;
        Ok(envelope.decoded(self.convention))
    }

    fn resolve_handlers(
        &self,
        descriptor: &EndpointDescriptor,
        envelope: &RequestEnvelope,
    ) -> Result<Vec<Arc<dyn RequestHandler>>, ServerError> {
        let (handlers, language) = match &descriptor.dispatch {
            DispatchKind::FanOut => (self.registry.resolve_all(descriptor.name), String::new()),
            DispatchKind::Static(tag) => {
                (self.registry.resolve(descriptor.name, tag), tag.to_string())
            }
            DispatchKind::LanguageOwned => {
                let language = envelope
                    .file_name
                    .as_deref()
                    .and_then(|file| self.selector.language_for(Path::new(file)));
                match language {
                    Some(language) => {
                        let handlers = self.registry.resolve(descriptor.name, &language);
                        if handlers.is_empty() {
                            // The language is known but unserved; fall
                            // back to the any-language handler.
                            (
                                self.registry.resolve(descriptor.name, endpoints::LANG_ANY),
                                language,
                            )
                        } else {
                            (handlers, language)
                        }
                    }
                    None => (
                        self.registry.resolve(descriptor.name, endpoints::LANG_ANY),
                        endpoints::LANG_ANY.to_string(),
                    ),
                }
            }
        };

        if handlers.is_empty() {
            return Err(ServerError::NoHandler {
                endpoint: descriptor.name.to_string(),
                language,
            });
        }
        if handlers.len() > 1 && !descriptor.mergeable {
            return Err(lingo_protocol::error::ProtocolError::NotMergeable(descriptor.name).into());
        }
        Ok(handlers)
    }

    async fn invoke(
        &self,
        descriptor: &EndpointDescriptor,
        handler: &Arc<dyn RequestHandler>,
        context: &RequestContext,
    ) -> Result<Response, ServerError> {
        if descriptor.timeout_sensitive {
            match tokio::time::timeout(self.timeout, handler.handle(context)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(endpoint = descriptor.name, "handler timed out");
                    Err(ServerError::Timeout(self.timeout.as_millis() as u64))
                }
            }
        } else {
            handler.handle(context).await
        }
    }

    async fn invoke_many(
        &self,
        descriptor: &EndpointDescriptor,
        handlers: &[Arc<dyn RequestHandler>],
        context: &RequestContext,
    ) -> Result<Response, ServerError> {
        let mut merged: Option<Response> = None;
        let mut first_error: Option<ServerError> = None;

        for handler in handlers {
            match self.invoke(descriptor, handler, context).await {
                Ok(response) => {
                    merged = Some(match merged.take() {
                        Some(accumulated) => accumulated.merge(response)?,
                        None => response,
                    });
                }
                Err(error) => match self.partial_failure {
                    PartialFailurePolicy::FailFast => return Err(error),
                    PartialFailurePolicy::ReturnPartial => {
                        tracing::warn!(
                            endpoint = descriptor.name,
                            %error,
                            "dropping failed handler from aggregate"
                        );
                        if first_error.is_none() {
                            first_error = Some(error);
                        }
                    }
                },
            }
        }

        match merged {
            Some(response) => Ok(response),
            // Every handler failed; surface the first error.
            None => Err(first_error.unwrap_or_else(|| ServerError::NoHandler {
                endpoint: descriptor.name.to_string(),
                language: String::new(),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use lingo_protocol::response::{QuickFix, QuickFixResponse};
    use lingo_workspace::events::NullEmitter;
    use lingo_workspace::project::Project;
    use lingo_workspace::project_system::ProjectSystemHost;
    use lingo_workspace::workspace::Workspace;

    /// Handler returning a fixed finding, counting its invocations.
    struct FixedHandler {
        file: String,
        text: String,
        calls: AtomicUsize,
    }

    impl FixedHandler {
        fn new(file: &str, text: &str) -> Arc<Self> {
            Arc::new(Self {
                file: file.to_string(),
                text: text.to_string(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RequestHandler for FixedHandler {
        async fn handle(&self, _context: &RequestContext) -> Result<Response, ServerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Response::QuickFixes(QuickFixResponse {
                quick_fixes: vec![QuickFix {
                    file_name: self.file.clone(),
                    text: self.text.clone(),
                    ..Default::default()
                }],
            }))
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl RequestHandler for FailingHandler {
        async fn handle(&self, _context: &RequestContext) -> Result<Response, ServerError> {
            Err(ServerError::Handler("analysis engine crashed".into()))
        }
    }

    struct SlowHandler;

    #[async_trait]
    impl RequestHandler for SlowHandler {
        async fn handle(&self, _context: &RequestContext) -> Result<Response, ServerError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Response::Empty)
        }
    }

    /// Handler that reports the workspace's current text for the
    /// request file, proving buffer updates ran first.
    struct EchoTextHandler {
        workspace: Arc<Workspace>,
    }

    #[async_trait]
    impl RequestHandler for EchoTextHandler {
        async fn handle(&self, context: &RequestContext) -> Result<Response, ServerError> {
            let file = context.envelope.file_name.clone().unwrap_or_default();
            let text = self
                .workspace
                .snapshot()
                .document_for_path(Path::new(&file))
                .map(|d| d.text.to_string())
                .unwrap_or_default();
            Ok(Response::QuickFixes(QuickFixResponse {
                quick_fixes: vec![QuickFix {
                    file_name: file,
                    text,
                    ..Default::default()
                }],
            }))
        }
    }

    struct Fixture {
        workspace: Arc<Workspace>,
        registry: HandlerRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                workspace: Arc::new(Workspace::new()),
                registry: HandlerRegistry::with_default_endpoints(),
            }
        }

        fn with_csharp_project(self, files: &[(&str, &str)]) -> Self {
            let project = self
                .workspace
                .add_project(Project::new("dir", "demo", "csharp"));
            for (path, text) in files {
                self.workspace
                    .add_document(project, PathBuf::from(path), text)
                    .unwrap();
            }
            self
        }

        fn dispatcher(self) -> EndpointDispatcher {
            let buffers = Arc::new(BufferManager::new(self.workspace.clone()));
            let systems = Arc::new(ProjectSystemHost::new(Arc::new(NullEmitter)));
            let selector = LanguageSelector::new(self.workspace, systems);
            EndpointDispatcher::new(self.registry, buffers, selector)
        }
    }

    fn packet(command: &str, arguments: serde_json::Value) -> RequestPacket {
        RequestPacket {
            command: command.to_string(),
            seq: 1,
            arguments,
        }
    }

    #[tokio::test]
    async fn unknown_endpoint_is_a_routing_error() {
        let dispatcher = Fixture::new().dispatcher();
        let result = dispatcher.dispatch(&packet("/nope", serde_json::json!({}))).await;
        assert!(matches!(result, Err(ServerError::UnknownEndpoint(_))));
    }

    #[tokio::test]
    async fn owned_file_routes_to_language_handler_exactly_once() {
        let mut fixture = Fixture::new().with_csharp_project(&[("/src/a.cs", "class A {}")]);
        let handler = FixedHandler::new("/src/a.cs", "CS0001");
        fixture
            .registry
            .add_handler(endpoints::CODE_CHECK, "csharp", handler.clone())
            .unwrap();
        let dispatcher = fixture.dispatcher();

        let body = dispatcher
            .dispatch(&packet(
                endpoints::CODE_CHECK,
                serde_json::json!({"FileName": "/src/a.cs"}),
            ))
            .await
            .unwrap();

        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert_eq!(body["QuickFixes"][0]["Text"], "CS0001");
    }

    #[tokio::test]
    async fn unserved_language_is_a_configuration_error() {
        let fixture = Fixture::new().with_csharp_project(&[("/src/a.cs", "")]);
        let dispatcher = fixture.dispatcher();

        let result = dispatcher
            .dispatch(&packet(
                endpoints::CODE_CHECK,
                serde_json::json!({"FileName": "/src/a.cs"}),
            ))
            .await;
        match result {
            Err(ServerError::NoHandler { endpoint, language }) => {
                assert_eq!(endpoint, endpoints::CODE_CHECK);
                assert_eq!(language, "csharp");
            }
            other => panic!("expected NoHandler, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn unclaimed_file_falls_back_to_any_language_handler() {
        let mut fixture = Fixture::new();
        let handler = FixedHandler::new("/loose.xyz", "fallback");
        fixture
            .registry
            .add_handler(endpoints::CODE_CHECK, endpoints::LANG_ANY, handler.clone())
            .unwrap();
        let dispatcher = fixture.dispatcher();

        dispatcher
            .dispatch(&packet(
                endpoints::CODE_CHECK,
                serde_json::json!({"FileName": "/loose.xyz"}),
            ))
            .await
            .unwrap();
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn buffer_content_is_applied_before_the_handler_runs() {
        let mut fixture = Fixture::new().with_csharp_project(&[("/src/a.cs", "stale")]);
        let workspace = fixture.workspace.clone();
        fixture
            .registry
            .add_handler(
                endpoints::CODE_CHECK,
                "csharp",
                Arc::new(EchoTextHandler { workspace }),
            )
            .unwrap();
        let dispatcher = fixture.dispatcher();

        let body = dispatcher
            .dispatch(&packet(
                endpoints::CODE_CHECK,
                serde_json::json!({"FileName": "/src/a.cs", "Buffer": "fresh from editor"}),
            ))
            .await
            .unwrap();

        assert_eq!(body["QuickFixes"][0]["Text"], "fresh from editor");
    }

    #[tokio::test]
    async fn fan_out_invokes_every_handler_and_merges() {
        let mut fixture = Fixture::new();
        let csharp = FixedHandler::new("/a.cs", "from-csharp");
        let fsharp = FixedHandler::new("/b.fs", "from-fsharp");
        fixture
            .registry
            .register_endpoint(EndpointDescriptor::fan_out("/broadcastcheck"))
            .unwrap();
        fixture
            .registry
            .add_handler("/broadcastcheck", "csharp", csharp.clone())
            .unwrap();
        fixture
            .registry
            .add_handler("/broadcastcheck", "fsharp", fsharp.clone())
            .unwrap();
        let dispatcher = fixture.dispatcher();

        let body = dispatcher
            .dispatch(&packet("/broadcastcheck", serde_json::json!({})))
            .await
            .unwrap();

        assert_eq!(csharp.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fsharp.calls.load(Ordering::SeqCst), 1);
        let fixes = body["QuickFixes"].as_array().unwrap();
        assert_eq!(fixes.len(), 2);
    }

    #[tokio::test]
    async fn fail_fast_policy_fails_the_whole_request() {
        let mut fixture = Fixture::new();
        fixture
            .registry
            .register_endpoint(EndpointDescriptor::fan_out("/broadcastcheck"))
            .unwrap();
        fixture
            .registry
            .add_handler("/broadcastcheck", "csharp", Arc::new(FailingHandler))
            .unwrap();
        fixture
            .registry
            .add_handler("/broadcastcheck", "fsharp", FixedHandler::new("/b.fs", "ok"))
            .unwrap();
        let dispatcher = fixture.dispatcher();

        let result = dispatcher
            .dispatch(&packet("/broadcastcheck", serde_json::json!({})))
            .await;
        assert!(matches!(result, Err(ServerError::Handler(_))));
    }

    #[tokio::test]
    async fn return_partial_policy_keeps_surviving_results() {
        let mut fixture = Fixture::new();
        fixture
            .registry
            .register_endpoint(EndpointDescriptor::fan_out("/broadcastcheck"))
            .unwrap();
        fixture
            .registry
            .add_handler("/broadcastcheck", "csharp", Arc::new(FailingHandler))
            .unwrap();
        fixture
            .registry
            .add_handler("/broadcastcheck", "fsharp", FixedHandler::new("/b.fs", "ok"))
            .unwrap();
        let dispatcher = fixture
            .dispatcher()
            .with_partial_failure(PartialFailurePolicy::ReturnPartial);

        let body = dispatcher
            .dispatch(&packet("/broadcastcheck", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(body["QuickFixes"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn return_partial_with_all_failures_still_errors() {
        let mut fixture = Fixture::new();
        fixture
            .registry
            .register_endpoint(EndpointDescriptor::fan_out("/broadcastcheck"))
            .unwrap();
        fixture
            .registry
            .add_handler("/broadcastcheck", "csharp", Arc::new(FailingHandler))
            .unwrap();
        fixture
            .registry
            .add_handler("/broadcastcheck", "fsharp", Arc::new(FailingHandler))
            .unwrap();
        let dispatcher = fixture
            .dispatcher()
            .with_partial_failure(PartialFailurePolicy::ReturnPartial);

        let result = dispatcher
            .dispatch(&packet("/broadcastcheck", serde_json::json!({})))
            .await;
        assert!(matches!(result, Err(ServerError::Handler(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_sensitive_endpoint_gives_up() {
        let mut fixture = Fixture::new();
        fixture
            .registry
            .add_handler(endpoints::FIND_SYMBOLS, endpoints::LANG_ANY, Arc::new(SlowHandler))
            .unwrap();
        let dispatcher = fixture
            .dispatcher()
            .with_timeout(Duration::from_millis(100));

        let result = dispatcher
            .dispatch(&packet(endpoints::FIND_SYMBOLS, serde_json::json!({})))
            .await;
        assert!(matches!(result, Err(ServerError::Timeout(100))));
    }

    #[tokio::test]
    async fn one_based_convention_translates_both_directions() {
        let mut fixture = Fixture::new().with_csharp_project(&[("/src/a.cs", "text")]);

        struct PositionEcho;
        #[async_trait]
        impl RequestHandler for PositionEcho {
            async fn handle(&self, context: &RequestContext) -> Result<Response, ServerError> {
                // The envelope must already be zero-based.
                assert_eq!(context.envelope.line, 0);
                assert_eq!(context.envelope.column, 4);
                Ok(Response::QuickFixes(QuickFixResponse {
                    quick_fixes: vec![QuickFix {
                        file_name: "/src/a.cs".into(),
                        line: 0,
                        column: 4,
                        end_line: 0,
                        end_column: 5,
                        text: "here".into(),
                        log_level: None,
                    }],
                }))
            }
        }

        fixture
            .registry
            .add_handler(endpoints::CODE_CHECK, "csharp", Arc::new(PositionEcho))
            .unwrap();
        let dispatcher = fixture
            .dispatcher()
            .with_convention(IndexConvention::OneBased);

        let body = dispatcher
            .dispatch(&packet(
                endpoints::CODE_CHECK,
                serde_json::json!({"FileName": "/src/a.cs", "Line": 1, "Column": 5}),
            ))
            .await
            .unwrap();
        assert_eq!(body["QuickFixes"][0]["Line"], 1);
        assert_eq!(body["QuickFixes"][0]["Column"], 5);
    }

    #[tokio::test]
    async fn handler_error_propagates_without_poisoning_dispatcher() {
        let mut fixture = Fixture::new().with_csharp_project(&[("/src/a.cs", "")]);
        fixture
            .registry
            .add_handler(endpoints::CODE_CHECK, "csharp", Arc::new(FailingHandler))
            .unwrap();
        let ok = FixedHandler::new("/src/a.cs", "fine");
        fixture
            .registry
            .add_handler(endpoints::AUTO_COMPLETE, "csharp", ok.clone())
            .unwrap();
        let dispatcher = fixture.dispatcher();

        let failed = dispatcher
            .dispatch(&packet(
                endpoints::CODE_CHECK,
                serde_json::json!({"FileName": "/src/a.cs"}),
            ))
            .await;
        assert!(failed.is_err());

        // A later request on another endpoint still succeeds.
        dispatcher
            .dispatch(&packet(
                endpoints::AUTO_COMPLETE,
                serde_json::json!({"FileName": "/src/a.cs"}),
            ))
            .await
            .unwrap();
        assert_eq!(ok.calls.load(Ordering::SeqCst), 1);
    }
}
