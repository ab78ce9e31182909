/// Diagnostics published on open and change.
///
/// Syntax errors are reported as errors.  Declarations the registry
/// rejected because another file already owns the name are reported as
/// warnings on the rejected declaration.
use tower_lsp::lsp_types::*;

use crate::error::RegistryError;
use crate::parser::ParseDiagnostic;
use crate::position::to_range;

const SOURCE: &str = "origami-lsp";

fn range_or_start(from: Option<&crate::ast::Span>) -> Range {
    from.map(to_range).unwrap_or_default()
}

pub fn parse_error_diagnostics(errors: &[ParseDiagnostic]) -> Vec<Diagnostic> {
    errors
        .iter()
        .map(|err| Diagnostic {
            range: range_or_start(err.from.as_ref()),
            severity: Some(DiagnosticSeverity::ERROR),
            source: Some(SOURCE.to_string()),
            message: err.message.clone(),
            ..Diagnostic::default()
        })
        .collect()
}

pub fn conflict_diagnostics(conflicts: &[RegistryError]) -> Vec<Diagnostic> {
    conflicts
        .iter()
        .map(|conflict| {
            let RegistryError::NamingConflict { from, .. } = conflict;
            Diagnostic {
                range: range_or_start(from.as_ref()),
                severity: Some(DiagnosticSeverity::WARNING),
                source: Some(SOURCE.to_string()),
                message: conflict.to_string(),
                ..Diagnostic::default()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;
    use crate::registry::SymbolTables;

    #[test]
    fn syntax_errors_are_errors() {
        let parsed = parse_program("file:///bad.zy", "<?php\nfunction ( {\n");
        let diagnostics = parse_error_diagnostics(&parsed.parse_errors);
        assert!(!diagnostics.is_empty());
        assert!(diagnostics
            .iter()
            .all(|d| d.severity == Some(DiagnosticSeverity::ERROR)));
    }

    #[test]
    fn conflicts_point_at_the_rejected_declaration() {
        let mut symbols = SymbolTables::default();
        let first = parse_program("file:///a.zy", "<?php\nclass Dup {}\n");
        let second = parse_program("file:///b.zy", "<?php\n\n\nclass Dup {}\n");
        assert!(symbols.index_file("file:///a.zy", &first.program).is_empty());
        let conflicts = symbols.index_file("file:///b.zy", &second.program);
        let diagnostics = conflict_diagnostics(&conflicts);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(diagnostics[0].range.start.line, 3);
        assert!(diagnostics[0].message.contains("Dup"));
    }
}
