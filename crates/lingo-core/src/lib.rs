//! lingo-core — positions, index conventions, and text-change
//! application for the lingo language-intelligence server.
//!
//! Everything in this crate is synchronous and side-effect free; it is
//! the vocabulary shared by the protocol, workspace, and dispatch
//! layers.
pub mod change;
pub mod convention;
pub mod position;

// Re-export key types for convenience.
pub use change::TextChange;
pub use convention::IndexConvention;
pub use position::{Position, Range};
