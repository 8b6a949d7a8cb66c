//! The request-handler contract.
use async_trait::async_trait;

use lingo_core::convention::IndexConvention;
use lingo_protocol::request::RequestEnvelope;
use lingo_protocol::response::Response;

use crate::error::ServerError;

/// Everything a handler sees for one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The common envelope, already decoded to zero-based positions.
    pub envelope: RequestEnvelope,
    /// The raw wire payload, for handlers with endpoint-specific
    /// request fields. Positions in here are still in the wire
    /// convention.
    pub payload: serde_json::Value,
    /// The wire convention, for decoding endpoint-specific positions.
    pub convention: IndexConvention,
}

impl RequestContext {
    /// Build a context from an already-decoded envelope.
    pub fn new(
        envelope: RequestEnvelope,
        payload: serde_json::Value,
        convention: IndexConvention,
    ) -> Self {
        Self {
            envelope,
            payload,
            convention,
        }
    }
}

/// Implements one endpoint for one language.
///
/// Handlers are registered with the [`crate::HandlerRegistry`] at
/// composition time and live for the process lifetime. A handler
/// failure fails the single request it was serving; the dispatcher
/// and other in-flight requests are unaffected.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Serve one request.
    async fn handle(&self, context: &RequestContext) -> Result<Response, ServerError>;
}
