//! lingo-server — endpoint dispatch for the language-intelligence
//! server.
//!
//! This crate implements the request/response cycle: a capability
//! registry mapping (endpoint, language) pairs to handlers, the
//! predicate layer that decides which language a request is for, and
//! the dispatcher that replays buffer updates, invokes the matched
//! handler(s), and folds aggregate responses.
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod host_handlers;
pub mod predicate;
pub mod registry;

// Re-export key types for convenience.
pub use dispatch::{EndpointDispatcher, PartialFailurePolicy};
pub use error::ServerError;
pub use handler::{RequestContext, RequestHandler};
pub use host_handlers::register_host_handlers;
pub use predicate::LanguageSelector;
pub use registry::HandlerRegistry;
