//! Index convention translation between the wire format and the
//! zero-based internal model.
//!
//! Some editors speak one-based lines and columns, others zero-based.
//! Internally everything is zero-based; the active convention is an
//! explicit value passed into encode/decode at the serialization
//! boundary, never a process-wide toggle.
use crate::position::{Position, Range};

/// Which base the wire format counts lines and columns from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexConvention {
    /// Wire positions are already zero-based.
    #[default]
    ZeroBased,
    /// Wire positions are one-based (e.g. Vim-style clients).
    OneBased,
}

impl IndexConvention {
    /// Convert a wire index to the zero-based internal form.
    ///
    /// In one-based mode a wire value of 0 (technically out of range)
    /// saturates to 0 instead of underflowing.
    pub fn decode_index(&self, value: usize) -> usize {
        match self {
            IndexConvention::ZeroBased => value,
            IndexConvention::OneBased => value.saturating_sub(1),
        }
    }

    /// Convert a zero-based internal index to the wire form.
    pub fn encode_index(&self, value: usize) -> usize {
        match self {
            IndexConvention::ZeroBased => value,
            IndexConvention::OneBased => value + 1,
        }
    }

    /// Decode a wire position into internal form.
    pub fn decode_position(&self, pos: Position) -> Position {
        Position::new(self.decode_index(pos.line), self.decode_index(pos.col))
    }

    /// Encode an internal position into wire form.
    pub fn encode_position(&self, pos: Position) -> Position {
        Position::new(self.encode_index(pos.line), self.encode_index(pos.col))
    }

    /// Decode both ends of a wire range.
    pub fn decode_range(&self, range: Range) -> Range {
        Range {
            start: self.decode_position(range.start),
            end: self.decode_position(range.end),
        }
    }

    /// Encode both ends of an internal range.
    pub fn encode_range(&self, range: Range) -> Range {
        Range {
            start: self.encode_position(range.start),
            end: self.encode_position(range.end),
        }
    }
}
