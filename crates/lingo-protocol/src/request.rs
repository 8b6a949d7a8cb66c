//! Request envelopes and per-endpoint request shapes.
//!
//! Every file-scoped request shares a common envelope: a position, an
//! optional full-buffer override, and an optional ordered list of
//! incremental changes. Endpoint-specific requests deserialize from
//! the same payload, so a handler can read both the envelope and its
//! own fields.
use serde::{Deserialize, Serialize};

use lingo_core::change::TextChange;
use lingo_core::convention::IndexConvention;
use lingo_core::position::Position;

/// The common fields carried by file-scoped requests.
///
/// `Line` and `Column` arrive in the wire convention and must be
/// decoded before the internal zero-based model sees them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RequestEnvelope {
    pub line: usize,
    pub column: usize,
    pub buffer: Option<String>,
    pub changes: Option<Vec<TextChange>>,
    pub apply_changes_together: bool,
    pub file_name: Option<String>,
}

impl RequestEnvelope {
    /// The request position.
    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    /// Whether the request carries buffer content that must be applied
    /// to the workspace before analysis runs.
    pub fn has_buffer_content(&self) -> bool {
        self.buffer.is_some() || self.changes.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// Translate wire positions into the zero-based internal form.
    pub fn decoded(&self, convention: IndexConvention) -> Self {
        Self {
            line: convention.decode_index(self.line),
            column: convention.decode_index(self.column),
            buffer: self.buffer.clone(),
            changes: self
                .changes
                .as_ref()
                .map(|cs| cs.iter().map(|c| c.decoded(convention)).collect()),
            apply_changes_together: self.apply_changes_together,
            file_name: self.file_name.clone(),
        }
    }
}

/// Request shape for `/updatebuffer`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UpdateBufferRequest {
    /// Replace the buffer with the file's on-disk content instead of
    /// editor-supplied text.
    pub from_disk: bool,
    #[serde(flatten)]
    pub envelope: RequestEnvelope,
}

/// Request shape for `/changebuffer`: one span replacement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ChangeBufferRequest {
    pub file_name: Option<String>,
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub new_text: String,
}

impl ChangeBufferRequest {
    /// The replacement as a [`TextChange`], decoded from the wire
    /// convention.
    pub fn to_change(&self, convention: IndexConvention) -> TextChange {
        TextChange {
            start_line: convention.decode_index(self.start_line),
            start_column: convention.decode_index(self.start_column),
            end_line: convention.decode_index(self.end_line),
            end_column: convention.decode_index(self.end_column),
            new_text: self.new_text.clone(),
        }
    }
}

/// The kind of a file-system change notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    #[default]
    Unspecified,
    Create,
    Change,
    Delete,
}

/// One entry in a `/filesChanged` broadcast.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FileEvent {
    pub file_name: String,
    pub change_type: ChangeKind,
}

/// Request shape for `/filesChanged`: a batch of change notifications.
pub type FilesChangedRequest = Vec<FileEvent>;

/// A transport-level request: the endpoint path plus its payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestPacket {
    #[serde(rename = "Command")]
    pub command: String,
    #[serde(rename = "Seq", default)]
    pub seq: u64,
    #[serde(rename = "Arguments", default)]
    pub arguments: serde_json::Value,
}

/// A transport-level reply paired to a [`RequestPacket`] by sequence
/// number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsePacket {
    #[serde(rename = "Request_seq")]
    pub request_seq: u64,
    #[serde(rename = "Command")]
    pub command: String,
    #[serde(rename = "Success")]
    pub success: bool,
    #[serde(rename = "Message", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "Body")]
    pub body: serde_json::Value,
    #[serde(rename = "Type")]
    pub kind: String,
}

impl ResponsePacket {
    /// A successful reply carrying `body`.
    pub fn success(request: &RequestPacket, body: serde_json::Value) -> Self {
        Self {
            request_seq: request.seq,
            command: request.command.clone(),
            success: true,
            message: None,
            body,
            kind: "response".to_string(),
        }
    }

    /// A failed reply carrying an error message.
    pub fn failure(request: &RequestPacket, message: impl Into<String>) -> Self {
        Self {
            request_seq: request.seq,
            command: request.command.clone(),
            success: false,
            message: Some(message.into()),
            body: serde_json::Value::Null,
            kind: "response".to_string(),
        }
    }
}
