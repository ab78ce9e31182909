/// Position and range geometry.
///
/// Editor positions are 0-based `(line, character)` pairs; [`Span`] spans
/// are 1-based with an exclusive end column.  Everything in this module
/// converts between the two and answers "does this node contain the
/// cursor" questions for the position resolver.
use tower_lsp::lsp_types::{Position, Range};

use crate::ast::{Span, NodeRef};

/// Anything that may carry a source span.
pub trait Spanned {
    fn span(&self) -> Option<&Span>;
}

impl Spanned for NodeRef<'_> {
    fn span(&self) -> Option<&Span> {
        self.from()
    }
}

impl Spanned for Span {
    fn span(&self) -> Option<&Span> {
        Some(self)
    }
}

impl<T: Spanned> Spanned for &T {
    fn span(&self) -> Option<&Span> {
        (**self).span()
    }
}

pub fn start_position(from: &Span) -> Position {
    Position {
        line: from.start_line.saturating_sub(1),
        character: from.start_col.saturating_sub(1),
    }
}

pub fn end_position(from: &Span) -> Position {
    Position {
        line: from.end_line.saturating_sub(1),
        character: from.end_col.saturating_sub(1),
    }
}

pub fn to_range(from: &Span) -> Range {
    Range {
        start: start_position(from),
        end: end_position(from),
    }
}

/// Exact containment.
///
/// On the start line the cursor must sit at or after the start column, on
/// the end line at or before the end column; interior lines always match.
/// The end bound is inclusive so a cursor placed right after the last
/// character still counts as inside.
pub fn contains(from: &Span, pos: Position) -> bool {
    let start = start_position(from);
    let end = end_position(from);
    if pos.line < start.line || pos.line > end.line {
        return false;
    }
    if pos.line == start.line && pos.character < start.character {
        return false;
    }
    if pos.line == end.line && pos.character > end.character {
        return false;
    }
    true
}

/// Line-only containment: the cursor's line lies within the span's lines.
pub fn contains_line(from: &Span, pos: Position) -> bool {
    let start = start_position(from);
    let end = end_position(from);
    pos.line >= start.line && pos.line <= end.line
}

/// Whether `inner` lies entirely within `outer`.
pub fn encloses(outer: &Span, inner: &Span) -> bool {
    contains(outer, start_position(inner)) && contains(outer, end_position(inner))
}

/// Coarse size of a span: line span dominates column span.
pub fn range_size(from: &Span) -> i64 {
    let lines = i64::from(from.end_line) - i64::from(from.start_line);
    let cols = i64::from(from.end_col) - i64::from(from.start_col);
    lines * 1000 + cols
}

/// Choose the more specific of two candidates that both contain the cursor.
///
/// A candidate without a span loses.  Otherwise the smaller [`range_size`]
/// wins, however close the two sizes are.  Ties keep `a`.
pub fn pick_smaller<T: Spanned>(a: Option<T>, b: Option<T>) -> Option<T> {
    let (a, b) = match (a, b) {
        (None, b) => return b,
        (a, None) => return a,
        (Some(a), Some(b)) => (a, b),
    };
    let (size_a, size_b) = match (a.span(), b.span()) {
        (None, _) => return Some(b),
        (_, None) => return Some(a),
        (Some(fa), Some(fb)) => (range_size(fa), range_size(fb)),
    };
    if size_b < size_a { Some(b) } else { Some(a) }
}
