//! Span-based text changes and their application to rope buffers.
//!
//! A [`TextChange`] replaces the text between two line/column positions
//! with new text. Changes arrive from editors either as a list applied
//! one after another (each against the text the previous one produced)
//! or as one combined edit covering everything they touched.
use ropey::Rope;

use crate::convention::IndexConvention;
use crate::position::{Position, Range};

/// A single text replacement over a line/column span.
///
/// Field names match the wire shape (`StartLine`, `StartColumn`, …) so
/// the same type deserializes straight out of a request payload.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TextChange {
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub new_text: String,
}

impl TextChange {
    /// Create a change replacing `range` with `new_text`.
    pub fn new(range: Range, new_text: impl Into<String>) -> Self {
        Self {
            start_line: range.start.line,
            start_column: range.start.col,
            end_line: range.end.line,
            end_column: range.end.col,
            new_text: new_text.into(),
        }
    }

    /// The replaced span as a [`Range`].
    pub fn range(&self) -> Range {
        Range::new(
            Position::new(self.start_line, self.start_column),
            Position::new(self.end_line, self.end_column),
        )
    }

    /// Translate wire positions into the zero-based internal form.
    pub fn decoded(&self, convention: IndexConvention) -> Self {
        Self {
            start_line: convention.decode_index(self.start_line),
            start_column: convention.decode_index(self.start_column),
            end_line: convention.decode_index(self.end_line),
            end_column: convention.decode_index(self.end_column),
            new_text: self.new_text.clone(),
        }
    }
}

/// Resolve a position to a char index in `rope`, clamping to the
/// buffer when the position lies outside it.
///
/// Columns clamp to the end of the line (before its terminating
/// newline); lines past the end of the buffer clamp to the buffer end.
pub fn char_index(rope: &Rope, pos: Position) -> usize {
    if pos.line >= rope.len_lines() {
        return rope.len_chars();
    }
    let line = rope.line(pos.line);
    let mut max_col = line.len_chars();
    if max_col > 0 && line.char(max_col - 1) == '\n' {
        max_col -= 1;
    }
    if max_col > 0 && line.char(max_col.saturating_sub(1)) == '\r' {
        max_col -= 1;
    }
    rope.line_to_char(pos.line) + pos.col.min(max_col)
}

/// Apply a single change to `rope`.
pub fn apply_change(rope: &mut Rope, change: &TextChange) {
    let range = change.range();
    let start = char_index(rope, range.start);
    let end = char_index(rope, range.end).max(start);
    rope.remove(start..end);
    if !change.new_text.is_empty() {
        rope.insert(start, &change.new_text);
    }
}

/// Apply `changes` one after another, in list order.
///
/// Each change is interpreted against the text produced by the
/// previous one, so positions in later changes are never stale.
/// Overlapping spans are not validated; a later change simply sees
/// whatever text the earlier ones left behind (last write wins).
pub fn apply_changes_sequential(rope: &mut Rope, changes: &[TextChange]) {
    for change in changes {
        apply_change(rope, change);
    }
}

/// Collapse `changes` into one composite change against `rope`.
///
/// Later changes address already-edited text, so once an earlier
/// change has shifted the text the replaced span cannot be read off
/// the raw input spans. Instead the changes run against a scratch copy
/// and the composite is recovered as the smallest window where the
/// before and after texts disagree. Applying the result once is
/// equivalent to applying the originals in order, which lets the
/// caller hand the compiler a single incremental edit.
pub fn combine_changes(rope: &Rope, changes: &[TextChange]) -> Option<TextChange> {
    match changes {
        [] => None,
        [only] => Some(only.clone()),
        _ => {
            let mut scratch = rope.clone();
            apply_changes_sequential(&mut scratch, changes);

            let len_before = rope.len_chars();
            let len_after = scratch.len_chars();
            let max_common = len_before.min(len_after);

            let mut prefix = 0;
            let mut before = rope.chars();
            let mut after = scratch.chars();
            while prefix < max_common {
                match (before.next(), after.next()) {
                    (Some(a), Some(b)) if a == b => prefix += 1,
                    _ => break,
                }
            }

            let mut suffix = 0;
            let mut before = rope.chars_at(len_before);
            let mut after = scratch.chars_at(len_after);
            while suffix < max_common - prefix {
                match (before.prev(), after.prev()) {
                    (Some(a), Some(b)) if a == b => suffix += 1,
                    _ => break,
                }
            }

            let mut start = prefix;
            let mut end = len_before - suffix;
            // A column cannot address the \n of a \r\n pair alone, so
            // widen the window rather than split the pair.
            if splits_crlf(rope, start) {
                start -= 1;
            }
            if splits_crlf(rope, end) {
                end += 1;
            }

            let new_text = scratch
                .slice(start..len_after - (len_before - end))
                .to_string();
            let span = Range::new(position_of(rope, start), position_of(rope, end));
            Some(TextChange::new(span, new_text))
        }
    }
}

fn splits_crlf(rope: &Rope, idx: usize) -> bool {
    idx > 0 && idx < rope.len_chars() && rope.char(idx) == '\n' && rope.char(idx - 1) == '\r'
}

/// The line/column position of a char index in `rope`.
fn position_of(rope: &Rope, char_idx: usize) -> Position {
    let line = rope.char_to_line(char_idx);
    Position::new(line, char_idx - rope.line_to_char(line))
}
