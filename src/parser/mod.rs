/// Origami source parsing.
///
/// The surface syntax of Origami is PHP-compatible, so the heavy lifting is
/// done by `mago_syntax`.  Its arena-allocated tree only lives as long as
/// the parse call, so this module lowers it into the owned tree of
/// [`crate::ast`] before returning.
///
/// Sub-modules:
/// - [`statements`]: statements, bodies and control flow
/// - [`classes`]: functions, classes, interfaces, traits, enums and members
/// - [`expressions`]: expressions, arguments and closures
/// - [`use_statements`]: `use` imports
mod classes;
mod expressions;
mod statements;
mod use_statements;

use std::sync::Arc;

use mago_span::HasSpan;
use tracing::error;

use crate::ast::{NodeId, Program, Span};
use crate::error::EngineError;

/// A syntax error reported by the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseDiagnostic {
    pub message: String,
    pub from: Option<Span>,
}

/// Result of parsing one document.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub program: Arc<Program>,
    /// Constructs that were lowered to `Unsupported` nodes.
    pub unsupported: Vec<EngineError>,
    pub parse_errors: Vec<ParseDiagnostic>,
}

impl ParsedFile {
    fn empty(uri: &str) -> Self {
        Self {
            program: Arc::new(Program {
                source: Arc::from(uri),
                statements: Vec::new(),
            }),
            unsupported: Vec::new(),
            parse_errors: Vec::new(),
        }
    }
}

/// Parse `content` (the text of the document at `uri`).
///
/// The parser is error tolerant: a file with syntax errors still yields
/// every statement it could recover.  A panic inside the parser yields an
/// empty program.
pub fn parse_program(uri: &str, content: &str) -> ParsedFile {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let arena = bumpalo::Bump::new();
        let file_id = mago_database::file::FileId::new(uri);
        let program = mago_syntax::parser::parse_file_content(&arena, file_id, content);

        let lines = LineIndex::new(content);
        let mut lowering = Lowering::new(uri, content, &lines);
        let statements = lowering.statements(program.statements.iter());

        let parse_errors = program
            .errors
            .iter()
            .map(|err| ParseDiagnostic {
                message: err.to_string(),
                from: lowering.span(err.span()),
            })
            .collect();

        ParsedFile {
            program: Arc::new(Program {
                source: lowering.source.clone(),
                statements,
            }),
            unsupported: lowering.unsupported,
            parse_errors,
        }
    }));

    match result {
        Ok(parsed) => parsed,
        Err(_) => {
            error!(uri, "parser panicked; treating the document as empty");
            ParsedFile::empty(uri)
        }
    }
}

// ─── Line index ─────────────────────────────────────────────────────────────

/// Byte offset to 1-based `(line, column)` conversion.
///
/// Columns count characters, not bytes.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            line_starts,
            len: text.len(),
        }
    }

    pub fn position(&self, text: &str, offset: usize) -> (u32, u32) {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next.saturating_sub(1),
        };
        let start = self.line_starts.get(line).copied().unwrap_or(0);
        let col = text
            .get(start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - start);
        (line as u32 + 1, col as u32 + 1)
    }
}

// ─── Lowering state ─────────────────────────────────────────────────────────

/// State shared by every lowering routine of one parse.
pub(crate) struct Lowering<'s> {
    pub(crate) source: Arc<str>,
    text: &'s str,
    lines: &'s LineIndex,
    next_id: u32,
    pub(crate) unsupported: Vec<EngineError>,
}

impl<'s> Lowering<'s> {
    fn new(uri: &str, text: &'s str, lines: &'s LineIndex) -> Self {
        Self {
            source: Arc::from(uri),
            text,
            lines,
            next_id: 0,
            unsupported: Vec::new(),
        }
    }

    pub(crate) fn id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn span(&self, span: mago_span::Span) -> Option<Span> {
        let start = span.start.offset as usize;
        let end = span.end.offset as usize;
        if end < start || start > self.text.len() {
            return None;
        }
        let (start_line, start_col) = self.lines.position(self.text, start);
        let (end_line, end_col) = self.lines.position(self.text, end);
        Some(Span {
            source: self.source.clone(),
            start_line,
            start_col,
            end_line,
            end_col,
        })
    }

    pub(crate) fn span_of(&self, node: &impl HasSpan) -> Option<Span> {
        self.span(node.span())
    }

    /// Source text covered by `node`.
    pub(crate) fn text_of(&self, node: &impl HasSpan) -> &'s str {
        let span = node.span();
        self.text
            .get(span.start.offset as usize..span.end.offset as usize)
            .unwrap_or("")
    }

    /// Source text of a type hint with whitespace removed, e.g. `?Foo`,
    /// `int|string`.
    pub(crate) fn hint(&self, hint: &impl HasSpan) -> String {
        self.text_of(hint)
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect()
    }

    /// Record a construct that has no node shape and return its description.
    pub(crate) fn unsupported(&mut self, node: &impl HasSpan, kind: &str) -> String {
        let snippet: String = self
            .text_of(node)
            .split(|c: char| c.is_whitespace() || c == '(' || c == ';')
            .find(|s| !s.is_empty())
            .unwrap_or("")
            .chars()
            .take(24)
            .collect();
        let what = if snippet.is_empty() {
            kind.to_string()
        } else {
            format!("{kind} `{snippet}`")
        };
        self.unsupported.push(EngineError::Unsupported {
            what: what.clone(),
            from: self.span_of(node),
        });
        what
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprKind, MemberKind, StmtKind};

    #[test]
    fn line_index_counts_characters() {
        let text = "ab\nçd\n";
        let idx = LineIndex::new(text);
        assert_eq!(idx.position(text, 0), (1, 1));
        assert_eq!(idx.position(text, 2), (1, 3));
        assert_eq!(idx.position(text, 3), (2, 1));
        // `ç` is two bytes but one column.
        assert_eq!(idx.position(text, 5), (2, 2));
        assert_eq!(idx.position(text, 100), (3, 1));
    }

    #[test]
    fn lowers_functions_with_spans() {
        let parsed = parse_program(
            "file:///hello.zy",
            "<?php\nfunction hello() { return \"hi\"; }\necho hello();\n",
        );
        assert!(parsed.parse_errors.is_empty());
        let stmts = &parsed.program.statements;
        assert_eq!(stmts.len(), 2);

        let StmtKind::Function(func) = &stmts[0].kind else {
            panic!("expected a function, got {:?}", stmts[0].kind);
        };
        assert_eq!(func.name, "hello");
        let from = stmts[0].from.as_ref().expect("function span");
        assert_eq!((from.start_line, from.start_col), (2, 1));
        assert_eq!(from.end_line, 2);
        assert_eq!(from.source(), "file:///hello.zy");

        let StmtKind::Echo(values) = &stmts[1].kind else {
            panic!("expected echo");
        };
        assert!(matches!(values[0].kind, ExprKind::Call { .. }));
    }

    #[test]
    fn lowers_class_members() {
        let parsed = parse_program(
            "file:///a.zy",
            "<?php\nnamespace App;\nclass A extends Base implements I {\n    private int $count = 0;\n    const MAX = 3;\n    public static function make(): static { return new static(); }\n}\n",
        );
        let StmtKind::Namespace(ns) = &parsed.program.statements[0].kind else {
            panic!("expected namespace");
        };
        assert_eq!(ns.name.as_deref(), Some("App"));
        let class = ns
            .statements
            .iter()
            .find_map(|s| match &s.kind {
                StmtKind::Class(c) => Some(c),
                _ => None,
            })
            .expect("class");
        assert_eq!(class.extends.as_deref(), Some("Base"));
        assert_eq!(class.implements, vec!["I".to_string()]);
        let kinds: Vec<_> = class
            .members
            .iter()
            .map(|m| match &m.kind {
                MemberKind::Property(p) => format!("prop {} {:?}", p.name, p.hint),
                MemberKind::Constant(_) => "const".to_string(),
                MemberKind::Method(m) => format!("method {} {}", m.name, m.is_static),
                other => format!("{other:?}"),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "prop count Some(\"int\")".to_string(),
                "const".to_string(),
                "method make true".to_string(),
            ]
        );
    }

    #[test]
    fn node_ids_are_unique() {
        let parsed = parse_program("file:///ids.zy", "<?php\n$a = 1; $b = [$a, 2]; foo($a, $b);\n");
        let mut ids = Vec::new();
        crate::walker::for_each_node(&parsed.program, |node| ids.push(node.id()));
        let count = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), count);
        assert!(count > 6);
    }

    #[test]
    fn syntax_errors_are_reported_not_fatal() {
        let parsed = parse_program("file:///bad.zy", "<?php\nfunction ok() {}\nclass {\n");
        assert!(!parsed.parse_errors.is_empty());
        assert!(
            parsed
                .program
                .statements
                .iter()
                .any(|s| matches!(&s.kind, StmtKind::Function(f) if f.name == "ok"))
        );
    }
}
