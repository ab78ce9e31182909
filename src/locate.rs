/// Position resolver.
///
/// [`find_node_at`] walks a program and returns the most specific node
/// whose span contains the cursor, together with a snapshot of the scope
/// that was active when the walker reached it and the chain of enclosing
/// nodes.
///
/// Containment is exact first.  Only when no node contains the cursor
/// exactly are call-like nodes (calls, `new`, method and static calls)
/// matched by line, which keeps completion working on a line that is
/// being typed past the end of the call.
///
/// Bodies of functions, methods, classes and closures that do not contain
/// the cursor line are skipped: their bindings live in their own scope and
/// cannot affect the answer.
use std::collections::HashMap;

use tower_lsp::lsp_types::Position;
use tracing::trace;

use crate::ast::*;
use crate::infer::{Inferencer, TypeCache};
use crate::position::{Spanned, contains, contains_line, pick_smaller, start_position};
use crate::scope::{ScopeId, ScopeRef, ScopeTree};
use crate::walker;

/// The node under the cursor and the context needed to resolve it.
#[derive(Debug)]
pub struct Located<'p> {
    pub node: NodeRef<'p>,
    /// Scope chain as it was when the node was visited.
    pub scopes: ScopeTree,
    pub scope_id: ScopeId,
    /// `false` when the node was only matched by line.
    pub exact: bool,
    parents: HashMap<NodeId, NodeRef<'p>>,
    types: TypeCache,
}

impl<'p> Located<'p> {
    pub fn scope(&self) -> ScopeRef<'_> {
        self.scopes.scope_ref(self.scope_id)
    }

    pub fn parent(&self) -> Option<NodeRef<'p>> {
        self.parent_of(self.node.id())
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeRef<'p>> {
        self.parents.get(&id).copied()
    }

    /// Enclosing nodes, innermost first.
    pub fn ancestors(&self) -> Vec<NodeRef<'p>> {
        let mut out = Vec::new();
        let mut cursor = self.parent();
        while let Some(node) = cursor {
            out.push(node);
            cursor = self.parent_of(node.id());
        }
        out
    }

    /// Type the walker inferred for `id`, if any.
    pub fn cached_type(&self, id: NodeId) -> Option<&crate::types::Types> {
        self.types.get(id)
    }
}

struct Candidate<'p> {
    node: NodeRef<'p>,
    scopes: ScopeTree,
    scope_id: ScopeId,
}

impl Spanned for Candidate<'_> {
    fn span(&self) -> Option<&Span> {
        self.node.from()
    }
}

impl<'p> Candidate<'p> {
    fn new(node: NodeRef<'p>, scope: ScopeRef<'_>) -> Self {
        let (scopes, scope_id) = scope.tree.snapshot(scope.id);
        Self {
            node,
            scopes,
            scope_id,
        }
    }
}

/// Find the smallest node of `program` enclosing `pos`.
pub fn find_node_at<'p>(
    program: &'p Program,
    inferencer: &Inferencer<'_>,
    pos: Position,
) -> Option<Located<'p>> {
    let mut exact: Option<Candidate<'p>> = None;
    let mut by_line: Option<Candidate<'p>> = None;
    let mut parents: HashMap<NodeId, NodeRef<'p>> = HashMap::new();

    let output = walker::walk(program, inferencer, |scope, parent, node| {
        if let Some(parent) = parent {
            parents.insert(node.id(), parent);
        }
        let Some(from) = node.from() else {
            return true;
        };
        if contains(from, pos) {
            if is_better(exact.as_ref(), node) {
                exact = Some(Candidate::new(node, scope));
            }
        } else if is_call_like(node) && contains_line(from, pos) {
            if is_better(by_line.as_ref(), node) {
                by_line = Some(Candidate::new(node, scope));
            }
        } else if owns_scope(node) && !contains_line(from, pos) {
            return false;
        }
        true
    });

    let (best, is_exact) = match (exact, by_line) {
        (Some(c), _) => (c, true),
        (None, Some(c)) => (c, false),
        (None, None) => return None,
    };
    trace!(
        kind = best.node.kind_name(),
        exact = is_exact,
        "node at {}:{}",
        pos.line,
        pos.character
    );
    Some(Located {
        node: best.node,
        scopes: best.scopes,
        scope_id: best.scope_id,
        exact: is_exact,
        parents,
        types: output.types,
    })
}

/// The scope in effect at `pos`.
///
/// Bindings are those made by the last node visited before the cursor in
/// a scope that encloses it, so assignments further down the file do not
/// show through.  The scope chain itself is the innermost one owning the
/// cursor; scopes entered without any node before the cursor start empty.
pub fn scope_at(
    program: &Program,
    inferencer: &Inferencer<'_>,
    pos: Position,
) -> (ScopeTree, ScopeId) {
    let mut latest: Option<ScopeTree> = None;
    let output = walker::walk(program, inferencer, |scope, _, node| {
        let Some(from) = node.from() else {
            return true;
        };
        let start = start_position(from);
        if (start.line, start.character) >= (pos.line, pos.character) {
            return false;
        }
        if covers(scope, pos) {
            latest = Some(scope.tree.snapshot(scope.id).0);
        }
        !(owns_scope(node) && !contains(from, pos))
    });
    let target = output.scopes.innermost_at(pos);
    output.scopes.snapshot_with_bindings(target, latest.as_ref())
}

/// Whether every scope of the chain is owned by a node containing `pos`.
fn covers(scope: ScopeRef<'_>, pos: Position) -> bool {
    let mut cursor = Some(scope);
    while let Some(current) = cursor {
        if let Some(owner) = current.scope().and_then(|s| s.owner.as_ref())
            && !contains(owner, pos)
        {
            return false;
        }
        cursor = current.parent();
    }
    true
}

/// Whether `node` beats the current best.  Ties keep the earlier node,
/// except that a node nested inside the current best always wins.
fn is_better(current: Option<&Candidate<'_>>, node: NodeRef<'_>) -> bool {
    let Some(current) = current else {
        return true;
    };
    let Some(node_from) = node.from() else {
        return false;
    };
    if let Some(current_from) = current.node.from()
        && current_from == node_from
    {
        // Same span: the later (inner) node is the more specific one.
        return true;
    }
    match pick_smaller(Some(current.node), Some(node)) {
        Some(winner) => winner.id() == node.id(),
        None => false,
    }
}

fn is_call_like(node: NodeRef<'_>) -> bool {
    matches!(
        node.as_expr().map(|e| &e.kind),
        Some(
            ExprKind::Call { .. }
                | ExprKind::New { .. }
                | ExprKind::MethodCall { .. }
                | ExprKind::StaticCall { .. }
        )
    )
}

fn owns_scope(node: NodeRef<'_>) -> bool {
    match node {
        NodeRef::Stmt(stmt) => matches!(
            stmt.kind,
            StmtKind::Function(_) | StmtKind::Class(_) | StmtKind::Interface(_)
        ),
        NodeRef::Member(member) => matches!(member.kind, MemberKind::Method(_)),
        NodeRef::Expr(expr) => matches!(
            expr.kind,
            ExprKind::Closure(_) | ExprKind::ArrowFunction(_)
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::parser::parse_program;
    use crate::registry::SymbolTables;
    use crate::types::{NameContext, Types};

    fn locate_kind(src: &str, line: u32, character: u32) -> Option<(String, Option<String>)> {
        let parsed = parse_program("file:///loc.zy", src);
        let symbols = SymbolTables::default();
        let inferencer = Inferencer::new(&symbols, Arc::new(NameContext::default()));
        let found = find_node_at(&parsed.program, &inferencer, Position { line, character })?;
        Some((
            found.node.kind_name().to_string(),
            found.parent().map(|p| p.kind_name().to_string()),
        ))
    }

    #[test]
    fn picks_the_callee_inside_a_call() {
        let src = "<?php\nfunction hello() { return \"hi\"; }\necho hello();\n";
        // Cursor on `hello` in the echo.
        let (kind, parent) = locate_kind(src, 2, 7).expect("node");
        assert_eq!(kind, "name");
        assert_eq!(parent.as_deref(), Some("call"));
    }

    #[test]
    fn smallest_enclosing_node_wins() {
        let src = "<?php\n$a = foo(bar(1));\n";
        // Cursor on `bar`.
        let (kind, parent) = locate_kind(src, 1, 10).expect("node");
        assert_eq!(kind, "name");
        assert_eq!(parent.as_deref(), Some("call"));
        // Cursor on the literal argument.
        let (kind, _) = locate_kind(src, 1, 13).expect("node");
        assert_eq!(kind, "literal");
    }

    #[test]
    fn returns_none_outside_every_node() {
        let src = "<?php\n\n\n$a = 1;\n";
        assert!(locate_kind(src, 1, 0).is_none());
    }

    #[test]
    fn result_contains_cursor_for_every_column() {
        let src = "<?php\n$user->profile()->save($x, 42);\n";
        let parsed = parse_program("file:///loc.zy", src);
        let symbols = SymbolTables::default();
        let inferencer = Inferencer::new(&symbols, Arc::new(NameContext::default()));
        for character in 0..31 {
            let pos = Position { line: 1, character };
            let found = find_node_at(&parsed.program, &inferencer, pos).expect("node");
            let from = found.node.from().expect("span");
            assert!(found.exact);
            assert!(contains(from, pos), "column {character}");
        }
    }

    #[test]
    fn line_only_fallback_matches_calls() {
        let src = "<?php\nfoo();   \n";
        let (kind, _) = locate_kind(src, 1, 8).expect("line match");
        assert_eq!(kind, "call");
    }

    #[test]
    fn scope_snapshot_reflects_the_cursor_position() {
        let src = "<?php\nclass A {}\n$v = 1;\nfunction f() {\n  $v = new A();\n  $v;\n}\n$v;\n";
        let parsed = parse_program("file:///loc.zy", src);
        let mut symbols = SymbolTables::default();
        symbols.index_file("file:///loc.zy", &parsed.program);
        let inferencer = Inferencer::new(&symbols, Arc::new(NameContext::default()));

        let inside = find_node_at(&parsed.program, &inferencer, Position { line: 5, character: 3 })
            .expect("inside");
        assert_eq!(inside.scope().get_variable_type("$v"), Some(&Types::class("A")));
        assert_eq!(inside.scope().enclosing_function(), Some("f"));

        let outside = find_node_at(&parsed.program, &inferencer, Position { line: 7, character: 1 })
            .expect("outside");
        assert_eq!(outside.scope().get_variable_type("$v"), Some(&Types::base("int")));
        assert_eq!(outside.cached_type(outside.node.id()), Some(&Types::base("int")));
    }

    #[test]
    fn scope_at_ignores_later_assignments() {
        let src = "<?php\nclass A {}\nclass B {}\n$x = new A();\n$x;\n$x = new B();\n$late = 1;\n";
        let parsed = parse_program("file:///loc.zy", src);
        let mut symbols = SymbolTables::default();
        symbols.index_file("file:///loc.zy", &parsed.program);
        let inferencer = Inferencer::new(&symbols, Arc::new(NameContext::default()));

        let (scopes, id) = scope_at(&parsed.program, &inferencer, Position { line: 4, character: 2 });
        let scope = scopes.scope_ref(id);
        assert_eq!(scope.get_variable_type("$x"), Some(&Types::class("A")));
        assert_eq!(scope.get_variable_type("$late"), None);

        let (scopes, id) = scope_at(&parsed.program, &inferencer, Position { line: 7, character: 0 });
        let scope = scopes.scope_ref(id);
        assert_eq!(scope.get_variable_type("$x"), Some(&Types::class("B")));
        assert_eq!(scope.get_variable_type("$late"), Some(&Types::base("int")));
    }

    #[test]
    fn scope_at_inside_a_function_sees_only_earlier_locals() {
        let src = "<?php\n$g = 1;\nfunction f() {\n  $a = 1;\n  \n  $b = 2;\n}\n";
        let parsed = parse_program("file:///loc.zy", src);
        let symbols = SymbolTables::default();
        let inferencer = Inferencer::new(&symbols, Arc::new(NameContext::default()));

        let (scopes, id) = scope_at(&parsed.program, &inferencer, Position { line: 4, character: 2 });
        let scope = scopes.scope_ref(id);
        assert_eq!(scope.enclosing_function(), Some("f"));
        let names: Vec<&str> = scope.visible_bindings().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["$a", "$g"]);
    }
}
