/// Document symbols (outline).
///
/// Classes, interfaces, traits and enums nest their methods, properties,
/// constants and enum cases.  Free functions and top-level constants are
/// listed at the root; namespace blocks are flattened.
use tower_lsp::lsp_types::{DocumentSymbol, Position, Range, SymbolKind};

use crate::Backend;
use crate::ast::*;
use crate::position::to_range;

impl Backend {
    /// Handle a `textDocument/documentSymbol` request.
    pub fn document_symbols(&self, uri: &str) -> Vec<DocumentSymbol> {
        match self.document(uri) {
            Some(document) => collect_symbols(&document.program),
            None => Vec::new(),
        }
    }
}

pub fn collect_symbols(program: &Program) -> Vec<DocumentSymbol> {
    let mut out = Vec::new();
    statements(&program.statements, &mut out);
    out
}

fn statements(stmts: &[Stmt], out: &mut Vec<DocumentSymbol>) {
    for stmt in stmts {
        let range = range_of(stmt.from.as_ref());
        match &stmt.kind {
            StmtKind::Namespace(ns) => statements(&ns.statements, out),
            StmtKind::Function(func) => out.push(symbol(
                &func.name,
                Some(signature(&func.params, func.return_hint.as_deref())),
                SymbolKind::FUNCTION,
                range,
                None,
            )),
            StmtKind::Class(class) => {
                let kind = match class.kind {
                    ClassKind::Class | ClassKind::Trait => SymbolKind::CLASS,
                    ClassKind::Interface => SymbolKind::INTERFACE,
                    ClassKind::Enum => SymbolKind::ENUM,
                };
                out.push(symbol(
                    &class.name,
                    class.extends.as_ref().map(|p| format!("extends {p}")),
                    kind,
                    range,
                    Some(members(&class.members)),
                ));
            }
            StmtKind::Interface(iface) => out.push(symbol(
                &iface.name,
                None,
                SymbolKind::INTERFACE,
                range,
                Some(members(&iface.members)),
            )),
            StmtKind::Const(items) => {
                for item in items {
                    out.push(symbol(
                        &item.name,
                        None,
                        SymbolKind::CONSTANT,
                        range_of(item.from.as_ref()),
                        None,
                    ));
                }
            }
            _ => {}
        }
    }
}

fn members(members: &[ClassMember]) -> Vec<DocumentSymbol> {
    let mut out = Vec::new();
    for member in members {
        let range = range_of(member.from.as_ref());
        match &member.kind {
            MemberKind::Method(method) => {
                let kind = if method.name.eq_ignore_ascii_case("__construct") {
                    SymbolKind::CONSTRUCTOR
                } else {
                    SymbolKind::METHOD
                };
                out.push(symbol(
                    &method.name,
                    Some(signature(&method.params, method.return_hint.as_deref())),
                    kind,
                    range,
                    None,
                ));
            }
            MemberKind::Property(property) => out.push(symbol(
                &format!("${}", property.name),
                property.hint.clone(),
                SymbolKind::PROPERTY,
                range,
                None,
            )),
            MemberKind::Constant(constant) => {
                for item in &constant.items {
                    out.push(symbol(
                        &item.name,
                        constant.hint.clone(),
                        SymbolKind::CONSTANT,
                        range_of(item.from.as_ref().or(member.from.as_ref())),
                        None,
                    ));
                }
            }
            MemberKind::EnumCase(name) => {
                out.push(symbol(name, None, SymbolKind::ENUM_MEMBER, range, None))
            }
            MemberKind::TraitUse(_) | MemberKind::Unsupported(_) => {}
        }
    }
    out
}

fn signature(params: &[Param], return_hint: Option<&str>) -> String {
    let params = params
        .iter()
        .map(|p| match &p.hint {
            Some(hint) => format!("{hint} {}", p.name),
            None => p.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ");
    match return_hint {
        Some(ret) => format!("({params}): {ret}"),
        None => format!("({params})"),
    }
}

fn range_of(from: Option<&Span>) -> Range {
    from.map(to_range).unwrap_or(Range {
        start: Position::default(),
        end: Position::default(),
    })
}

#[allow(deprecated)]
fn symbol(
    name: &str,
    detail: Option<String>,
    kind: SymbolKind,
    range: Range,
    children: Option<Vec<DocumentSymbol>>,
) -> DocumentSymbol {
    DocumentSymbol {
        name: name.to_string(),
        detail,
        kind,
        tags: None,
        deprecated: None,
        range,
        selection_range: range,
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    #[test]
    fn classes_nest_their_members() {
        let src = "<?php\nnamespace App;\nconst VERSION = 1;\nfunction boot(): void {}\nclass User extends Model {\n  const TABLE = 'users';\n  public string $name;\n  public function __construct() {}\n  public function save(array $opts): bool {}\n}\nenum Status { case Active; }\n";
        let parsed = parse_program("file:///sym.zy", src);
        let symbols = collect_symbols(&parsed.program);
        let names: Vec<&str> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["VERSION", "boot", "User", "Status"]);

        let user = &symbols[2];
        assert_eq!(user.kind, SymbolKind::CLASS);
        assert_eq!(user.detail.as_deref(), Some("extends Model"));
        let children: Vec<(&str, SymbolKind)> = user
            .children
            .as_ref()
            .expect("members")
            .iter()
            .map(|c| (c.name.as_str(), c.kind))
            .collect();
        assert_eq!(
            children,
            vec![
                ("TABLE", SymbolKind::CONSTANT),
                ("$name", SymbolKind::PROPERTY),
                ("__construct", SymbolKind::CONSTRUCTOR),
                ("save", SymbolKind::METHOD),
            ]
        );
        assert_eq!(user.range.start.line, 4);
        assert_eq!(symbols[1].detail.as_deref(), Some("(): void"));
        assert_eq!(symbols[3].kind, SymbolKind::ENUM);
    }
}
