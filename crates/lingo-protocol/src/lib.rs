//! lingo-protocol — the request/response model shared by every
//! transport.
//!
//! Endpoints are string paths (`/codecheck`, `/updatebuffer`, …) with a
//! descriptor declaring how requests are routed and whether multiple
//! handlers may contribute to one response. Wire shapes use PascalCase
//! field names and deserialize with serde.
pub mod endpoints;
pub mod error;
pub mod request;
pub mod response;

// Re-export key types for convenience.
pub use endpoints::{DispatchKind, EndpointDescriptor};
pub use error::ProtocolError;
pub use request::{
    ChangeBufferRequest, ChangeKind, FileEvent, FilesChangedRequest, RequestEnvelope,
    RequestPacket, ResponsePacket, UpdateBufferRequest,
};
pub use response::{
    CompletionItem, CompletionResponse, ModifiedFile, QuickFix, QuickFixResponse, Response,
};
