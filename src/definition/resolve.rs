/// Definition dispatch.
///
/// The located node decides what is being asked for:
///
///   - a name used as a callee → the free function
///   - a name in class position (`new X`, `X::`, `#[X]`) → the class
///   - a call, `new`, method call, static call, property or constant
///     fetch → the declaration it targets
///   - `$this`, `self`, `static`, `parent` → the class they denote
///
/// When nothing else matches, a free function with the same name is
/// offered so the jump still lands somewhere useful.
use tower_lsp::lsp_types::{Location, Url};

use crate::ast::*;
use crate::infer::Inferencer;
use crate::locate::Located;
use crate::position::to_range;
use crate::scope::ScopeRef;

use super::member::{MemberKind, instance_member, static_member};

/// Turn a declaration span into an LSP location.
pub(crate) fn location_of(from: &Span) -> Option<Location> {
    let uri = Url::parse(from.source()).ok()?;
    Some(Location {
        uri,
        range: to_range(from),
    })
}

/// Resolve the located node to its declaration(s).
pub fn resolve(located: &Located<'_>, inferencer: &Inferencer<'_>) -> Vec<Location> {
    let scope = located.scope();
    let (found, word) = match located.node {
        NodeRef::Expr(expr) => resolve_expr(located, inferencer, scope, expr),
        NodeRef::Annotation(annotation) => (
            class_location(inferencer, &annotation.name),
            Some(annotation.name.as_str()),
        ),
        NodeRef::Catch(catch) => (
            catch
                .types
                .iter()
                .flat_map(|t| class_location(inferencer, t))
                .collect(),
            None,
        ),
        _ => (Vec::new(), None),
    };
    if !found.is_empty() {
        return found;
    }
    match word {
        Some(word) => function_location(inferencer, word),
        None => Vec::new(),
    }
}

/// Returns the candidates plus the identifier used for the final
/// same-named-function fallback.
fn resolve_expr<'e>(
    located: &Located<'_>,
    inferencer: &Inferencer<'_>,
    scope: ScopeRef<'_>,
    expr: &'e Expr,
) -> (Vec<Location>, Option<&'e str>) {
    match &expr.kind {
        ExprKind::Name(name) => {
            let found = match located.parent().and_then(|p| p.as_expr()).map(|p| &p.kind) {
                Some(ExprKind::Call { callee, .. }) if callee.id == expr.id => {
                    function_location(inferencer, name)
                }
                Some(
                    ExprKind::New { class, .. }
                    | ExprKind::StaticCall { class, .. }
                    | ExprKind::StaticPropertyFetch { class, .. }
                    | ExprKind::ClassConstFetch { class, .. },
                ) if class.id == expr.id => class_location(inferencer, name),
                _ => {
                    let classes = class_location(inferencer, name);
                    if classes.is_empty() {
                        function_location(inferencer, name)
                    } else {
                        classes
                    }
                }
            };
            (found, Some(name.as_str()))
        }
        ExprKind::Call { callee, .. } => match &callee.kind {
            ExprKind::Name(name) => (function_location(inferencer, name), Some(name.as_str())),
            _ => (Vec::new(), None),
        },
        ExprKind::New { class, .. } => (class_of_location(inferencer, scope, class), None),
        ExprKind::This | ExprKind::SelfRef | ExprKind::StaticRef | ExprKind::ParentRef => {
            (class_of_location(inferencer, scope, expr), None)
        }
        ExprKind::MethodCall { object, method, .. } => (
            instance_member(inferencer, scope, object, method, MemberKind::Method),
            Some(method.as_str()),
        ),
        ExprKind::StaticCall { class, method, .. } => (
            static_member(inferencer, scope, class, method, MemberKind::Method),
            Some(method.as_str()),
        ),
        ExprKind::PropertyFetch {
            object, property, ..
        } => (
            instance_member(inferencer, scope, object, property, MemberKind::Property),
            None,
        ),
        ExprKind::StaticPropertyFetch { class, property } => (
            static_member(inferencer, scope, class, property, MemberKind::Property),
            None,
        ),
        ExprKind::ClassConstFetch { class, constant } => {
            if constant.eq_ignore_ascii_case("class") {
                return (class_of_location(inferencer, scope, class), None);
            }
            (
                static_member(inferencer, scope, class, constant, MemberKind::Constant),
                None,
            )
        }
        _ => (Vec::new(), None),
    }
}

/// Declaration of the class named `name` as written in the current file.
fn class_location(inferencer: &Inferencer<'_>, name: &str) -> Vec<Location> {
    let resolved = inferencer.names.resolve_class(name);
    inferencer
        .symbols
        .class_like(&resolved)
        .or_else(|| inferencer.symbols.class_like(name))
        .and_then(|class| class.from.as_ref())
        .and_then(location_of)
        .into_iter()
        .collect()
}

fn class_of_location(inferencer: &Inferencer<'_>, scope: ScopeRef<'_>, expr: &Expr) -> Vec<Location> {
    match inferencer.class_of(expr, scope) {
        Some(class) => class_location(inferencer, &format!("\\{class}")),
        None => Vec::new(),
    }
}

fn function_location(inferencer: &Inferencer<'_>, name: &str) -> Vec<Location> {
    let resolved = inferencer.names.resolve_function(name);
    inferencer
        .symbols
        .get_func(&resolved)
        .or_else(|| inferencer.symbols.get_func(name))
        .and_then(|func| func.from.as_ref())
        .and_then(location_of)
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_lsp::lsp_types::Position;

    use super::*;
    use crate::locate::find_node_at;
    use crate::parser::parse_program;
    use crate::registry::SymbolTables;

    const URI: &str = "file:///def.zy";

    /// Resolve at `(line, character)` and return the 0-based start lines.
    fn lines_at(src: &str, line: u32, character: u32) -> Vec<u32> {
        let parsed = parse_program(URI, src);
        let mut symbols = SymbolTables::default();
        symbols.index_file(URI, &parsed.program);
        let names = Arc::new(crate::declarations::name_context(&parsed.program));
        let inferencer = Inferencer::new(&symbols, names);
        let Some(located) = find_node_at(&parsed.program, &inferencer, Position { line, character })
        else {
            return Vec::new();
        };
        resolve(&located, &inferencer)
            .into_iter()
            .map(|l| l.range.start.line)
            .collect()
    }

    #[test]
    fn function_call_jumps_to_function() {
        let src = "<?php\nfunction hello() { return \"hi\"; }\necho hello();\n";
        assert_eq!(lines_at(src, 2, 6), vec![1]);
    }

    #[test]
    fn chained_call_resolves_on_the_return_type() {
        let src = "<?php\nclass A {\n  function b(): B {}\n  function c() {}\n}\nclass B {\n  function c(): void {}\n}\n$a = new A();\n$a->b()->c();\n";
        // Cursor on `c` in `->c()`.
        assert_eq!(lines_at(src, 9, 9), vec![6]);
        // Cursor on `b`.
        assert_eq!(lines_at(src, 9, 4), vec![2]);
    }

    #[test]
    fn inherited_method_resolves_to_parent() {
        let src = "<?php\nclass Base {\n  function save() {}\n}\nclass User extends Base {}\n$u = new User();\n$u->save();\n";
        assert_eq!(lines_at(src, 6, 6), vec![2]);
    }

    #[test]
    fn unknown_receiver_scans_every_class() {
        let src = "<?php\nclass A {\n  function run() {}\n}\nclass B {\n  function run() {}\n}\nfunction go($x) { $x->run(); }\n";
        assert_eq!(lines_at(src, 7, 23), vec![2, 5]);
    }

    #[test]
    fn static_self_and_constants() {
        let src = "<?php\nclass Config {\n  const NAME = 'x';\n  public static $cache;\n  static function make() { return self::NAME; }\n}\nConfig::make();\nConfig::$cache;\n";
        // `self::NAME` inside make().
        assert_eq!(lines_at(src, 4, 42), vec![2]);
        // `Config::make()`.
        assert_eq!(lines_at(src, 6, 10), vec![4]);
        // `Config::$cache`.
        assert_eq!(lines_at(src, 7, 10), vec![3]);
        // The class name itself.
        assert_eq!(lines_at(src, 6, 2), vec![1]);
    }

    #[test]
    fn new_expression_jumps_to_class() {
        let src = "<?php\nnamespace App;\nclass Mailer {}\n$m = new Mailer();\n";
        assert_eq!(lines_at(src, 3, 11), vec![2]);
    }

    #[test]
    fn falls_back_to_same_named_function() {
        let src = "<?php\nfunction render() {}\nclass View {}\n$v = new View();\n$v->render();\n";
        assert_eq!(lines_at(src, 4, 6), vec![1]);
    }
}
