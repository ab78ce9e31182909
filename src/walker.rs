/// AST walker.
///
/// [`walk`] performs a total pre-order traversal of a [`Program`], calling
/// a visitor for every node together with the scope active at that node.
/// Every node shape is matched explicitly; shapes the frontend could not
/// model arrive as `Unsupported` nodes, are visited as leaves and are
/// reported in [`WalkOutput::unsupported`].
///
/// Scope rules:
///
///   - function and method bodies get a child scope labelled
///     `function:<name>`, closures and arrow functions `function:{closure}`
///   - class, trait, enum and interface bodies get `class:<FQN>`
///   - `if`, loops, `switch` and `try` bodies are walked in the enclosing
///     scope, so a variable assigned in one branch is visible in the next
///
/// Before a node is visited the walker binds what it introduces: variable
/// and constant declarations, assignments (including list destructuring),
/// parameters, `global` names, `catch` variables and `foreach` targets.
/// Visitors therefore observe every binding made earlier in the walk.
///
/// A visitor returning `false` skips that node's children only.
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use crate::ast::*;
use crate::error::EngineError;
use crate::infer::{Inferencer, TypeCache};
use crate::registry::SymbolTables;
use crate::scope::{CLASS_LABEL_PREFIX, FUNCTION_LABEL_PREFIX, ScopeId, ScopeRef, ScopeTree};
use crate::types::{NameContext, Types};

/// Function name used in the scope label of closures.
pub const CLOSURE_NAME: &str = "{closure}";

/// Everything a walk leaves behind.
#[derive(Debug, Default)]
pub struct WalkOutput {
    /// Every scope created during the walk, in creation order.
    pub scopes: ScopeTree,
    pub types: TypeCache,
    pub unsupported: Vec<EngineError>,
}

/// Walk `program` from a fresh root scope.
pub fn walk<'p, F>(program: &'p Program, inferencer: &Inferencer<'_>, visit: F) -> WalkOutput
where
    F: FnMut(ScopeRef<'_>, Option<NodeRef<'p>>, NodeRef<'p>) -> bool,
{
    let tree = ScopeTree::new();
    let root = tree.root();
    walk_statements(&program.statements, tree, root, inferencer, visit)
}

/// Walk `statements` starting in `scope` of an existing tree.
pub fn walk_statements<'p, F>(
    statements: &'p [Stmt],
    tree: ScopeTree,
    scope: ScopeId,
    inferencer: &Inferencer<'_>,
    visit: F,
) -> WalkOutput
where
    F: FnMut(ScopeRef<'_>, Option<NodeRef<'p>>, NodeRef<'p>) -> bool,
{
    let mut walker = Walker {
        tree,
        types: TypeCache::default(),
        unsupported: Vec::new(),
        infer: inferencer,
        visit,
        current: scope,
        namespace: inferencer.names.namespace.clone(),
        _program: PhantomData,
    };
    walker.statements(statements, None);
    if !walker.unsupported.is_empty() {
        debug!(count = walker.unsupported.len(), "walk met unsupported nodes");
    }
    WalkOutput {
        scopes: walker.tree,
        types: walker.types,
        unsupported: walker.unsupported,
    }
}

/// Call `f` on every node of `program` in walk order, without a registry.
pub fn for_each_node<'p>(program: &'p Program, mut f: impl FnMut(NodeRef<'p>)) {
    let symbols = SymbolTables::default();
    let inferencer = Inferencer::new(&symbols, Arc::new(NameContext::default()));
    walk(program, &inferencer, |_, _, node| {
        f(node);
        true
    });
}

struct Walker<'p, 'i, 'r, F> {
    tree: ScopeTree,
    types: TypeCache,
    unsupported: Vec<EngineError>,
    infer: &'i Inferencer<'r>,
    visit: F,
    current: ScopeId,
    /// Namespace in effect, used to qualify class scope labels.
    namespace: Option<String>,
    _program: PhantomData<&'p Program>,
}

impl<'p, 'i, 'r, F> Walker<'p, 'i, 'r, F>
where
    F: FnMut(ScopeRef<'_>, Option<NodeRef<'p>>, NodeRef<'p>) -> bool,
{
    // ─── Visiting ───────────────────────────────────────────────────────

    /// Bind, report, then visit.  Returns whether to descend.
    fn enter(&mut self, parent: Option<NodeRef<'p>>, node: NodeRef<'p>) -> bool {
        self.bind(node);
        if let Some(what) = unsupported_description(node) {
            self.unsupported.push(EngineError::Unsupported {
                what: what.to_string(),
                from: node.from().cloned(),
            });
        }
        let scope = self.tree.scope_ref(self.current);
        (self.visit)(scope, parent, node)
    }

    fn with_scope(&mut self, label: String, owner: Option<Span>, f: impl FnOnce(&mut Self)) {
        let saved = self.current;
        self.current = self.tree.create_child_scope(saved, &label, owner);
        f(self);
        self.current = saved;
    }

    fn with_loop(&mut self, label: &str, f: impl FnOnce(&mut Self)) {
        let scope = self.current;
        self.tree.push_loop(scope, label);
        f(self);
        self.tree.pop_loop(scope);
    }

    // ─── Binding ────────────────────────────────────────────────────────

    fn infer_here(&self, expr: &Expr) -> Option<Types> {
        self.infer.infer(expr, self.tree.scope_ref(self.current))
    }

    fn set(&mut self, name: &str, ty: Types) {
        self.tree.set_variable_type(self.current, name, ty);
    }

    fn bind(&mut self, node: NodeRef<'p>) {
        match node {
            NodeRef::VarItem(item) => {
                let ty = item
                    .value
                    .as_ref()
                    .and_then(|v| self.infer_here(v))
                    .unwrap_or_else(Types::mixed);
                self.set(&item.name, ty);
            }
            NodeRef::ConstItem(item) => {
                if let Some(ty) = self.infer_here(&item.value) {
                    self.set(&item.name, ty);
                }
            }
            NodeRef::Param(param) => {
                let ty = param
                    .hint
                    .as_deref()
                    .and_then(|h| self.hint_type(h))
                    .unwrap_or_else(Types::mixed);
                self.set(&param.name, ty);
            }
            NodeRef::Catch(catch) => {
                if let Some(variable) = &catch.variable {
                    let caught: Vec<Types> = catch
                        .types
                        .iter()
                        .filter_map(|t| self.hint_type(t))
                        .collect();
                    let ty = if caught.is_empty() {
                        Types::mixed()
                    } else {
                        Types::union(caught)
                    };
                    self.set(variable, ty);
                }
            }
            NodeRef::Stmt(stmt) => match &stmt.kind {
                StmtKind::Global(names) => {
                    let root = self.tree.root();
                    for name in names {
                        let ty = self
                            .tree
                            .get_variable_type(root, name)
                            .cloned()
                            .unwrap_or_else(Types::mixed);
                        self.set(name, ty);
                    }
                }
                StmtKind::Foreach(foreach) => {
                    let element = self
                        .infer_here(&foreach.subject)
                        .as_ref()
                        .and_then(element_type);
                    if let Some(key) = &foreach.key {
                        self.bind_target(key, None);
                    }
                    self.bind_target(&foreach.value, element);
                }
                _ => {}
            },
            NodeRef::Expr(expr) => match &expr.kind {
                ExprKind::Assign { target, value } => {
                    let ty = self.infer_here(value);
                    if let Some(ty) = &ty {
                        self.types.record(value.id, ty.clone());
                    }
                    self.bind_target(target, ty);
                }
                ExprKind::Variable(_) | ExprKind::This => {
                    if let Some(ty) = self.infer_here(expr) {
                        self.types.record(expr.id, ty);
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }

    /// Bind the variables of an assignment target; `[$a, $b] = ...` binds
    /// each element.
    fn bind_target(&mut self, target: &Expr, ty: Option<Types>) {
        match &target.kind {
            ExprKind::Variable(name) => self.set(name, ty.unwrap_or_else(Types::mixed)),
            ExprKind::Array(items) | ExprKind::List(items) => {
                let element = ty.as_ref().and_then(element_type);
                for item in items {
                    self.bind_target(&item.value, element.clone());
                }
            }
            _ => {}
        }
    }

    /// Resolve a declared hint; `self`/`static` name the enclosing class.
    fn hint_type(&self, hint: &str) -> Option<Types> {
        let class = self.tree.scope_ref(self.current).enclosing_class();
        let symbols = self.infer.symbols;
        let names = &self.infer.names;
        Types::from_hint(hint, &|n: &str| match n.to_ascii_lowercase().as_str() {
            "self" | "static" | "$this" => class.unwrap_or(n).to_string(),
            "parent" => class
                .and_then(|c| symbols.class_like(c))
                .and_then(|c| c.parent.clone())
                .unwrap_or_else(|| n.to_string()),
            _ => names.resolve_class(n),
        })
    }

    fn qualify(&self, name: &str) -> String {
        match &self.namespace {
            Some(ns) if !ns.is_empty() => format!("{ns}\\{name}"),
            _ => name.to_string(),
        }
    }

    // ─── Statements ─────────────────────────────────────────────────────

    fn statements(&mut self, statements: &'p [Stmt], parent: Option<NodeRef<'p>>) {
        for stmt in statements {
            self.stmt(stmt, parent);
        }
    }

    fn stmt(&mut self, stmt: &'p Stmt, parent: Option<NodeRef<'p>>) {
        let node = NodeRef::Stmt(stmt);
        if !self.enter(parent, node) {
            return;
        }
        let me = Some(node);
        match &stmt.kind {
            StmtKind::Namespace(ns) => {
                let saved = std::mem::replace(&mut self.namespace, ns.name.clone());
                self.statements(&ns.statements, me);
                self.namespace = saved;
            }
            StmtKind::Use(_)
            | StmtKind::Global(_)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Unsupported(_) => {}
            StmtKind::Function(func) => {
                self.annotations(&func.annotations, me);
                let label = format!("{FUNCTION_LABEL_PREFIX}{}", func.name);
                self.with_scope(label, stmt.from.clone(), |w| {
                    w.params(&func.params, me);
                    w.statements(&func.body, me);
                });
            }
            StmtKind::Class(class) => {
                self.annotations(&class.annotations, me);
                let label = format!("{CLASS_LABEL_PREFIX}{}", self.qualify(&class.name));
                self.with_scope(label, stmt.from.clone(), |w| w.members(&class.members, me));
            }
            StmtKind::Interface(iface) => {
                self.annotations(&iface.annotations, me);
                let label = format!("{CLASS_LABEL_PREFIX}{}", self.qualify(&iface.name));
                self.with_scope(label, stmt.from.clone(), |w| w.members(&iface.members, me));
            }
            StmtKind::Var(items) => {
                for item in items {
                    let node = NodeRef::VarItem(item);
                    if self.enter(me, node)
                        && let Some(value) = &item.value
                    {
                        self.expr(value, Some(node));
                    }
                }
            }
            StmtKind::Const(items) => {
                for item in items {
                    self.const_item(item, me);
                }
            }
            StmtKind::Expr(expr) => self.expr(expr, me),
            StmtKind::Echo(values) => self.exprs(values, me),
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.expr(value, me);
                }
            }
            StmtKind::Block(body) => self.statements(body, me),
            StmtKind::If(if_stmt) => {
                self.expr(&if_stmt.condition, me);
                self.statements(&if_stmt.then_branch, me);
                for else_if in &if_stmt.else_ifs {
                    self.expr(&else_if.condition, me);
                    self.statements(&else_if.body, me);
                }
                if let Some(else_branch) = &if_stmt.else_branch {
                    self.statements(else_branch, me);
                }
            }
            StmtKind::For(for_stmt) => {
                self.exprs(&for_stmt.init, me);
                self.exprs(&for_stmt.condition, me);
                self.exprs(&for_stmt.update, me);
                self.with_loop("for", |w| w.statements(&for_stmt.body, me));
            }
            StmtKind::Foreach(foreach) => {
                self.expr(&foreach.subject, me);
                if let Some(key) = &foreach.key {
                    self.expr(key, me);
                }
                self.expr(&foreach.value, me);
                self.with_loop("foreach", |w| w.statements(&foreach.body, me));
            }
            StmtKind::While(while_stmt) => {
                self.expr(&while_stmt.condition, me);
                self.with_loop("while", |w| w.statements(&while_stmt.body, me));
            }
            StmtKind::DoWhile(while_stmt) => {
                self.with_loop("do", |w| w.statements(&while_stmt.body, me));
                self.expr(&while_stmt.condition, me);
            }
            StmtKind::Switch(switch) => {
                self.expr(&switch.subject, me);
                for case in &switch.cases {
                    let node = NodeRef::SwitchCase(case);
                    if !self.enter(me, node) {
                        continue;
                    }
                    if let Some(test) = &case.test {
                        self.expr(test, Some(node));
                    }
                    self.statements(&case.body, Some(node));
                }
            }
            StmtKind::Try(try_stmt) => {
                self.statements(&try_stmt.body, me);
                for catch in &try_stmt.catches {
                    let node = NodeRef::Catch(catch);
                    if self.enter(me, node) {
                        self.statements(&catch.body, Some(node));
                    }
                }
                if let Some(finally) = &try_stmt.finally {
                    self.statements(finally, me);
                }
            }
        }
    }

    fn const_item(&mut self, item: &'p ConstItem, parent: Option<NodeRef<'p>>) {
        let node = NodeRef::ConstItem(item);
        if self.enter(parent, node) {
            self.expr(&item.value, Some(node));
        }
    }

    fn annotations(&mut self, annotations: &'p [Annotation], parent: Option<NodeRef<'p>>) {
        for annotation in annotations {
            self.enter(parent, NodeRef::Annotation(annotation));
        }
    }

    fn params(&mut self, params: &'p [Param], parent: Option<NodeRef<'p>>) {
        for param in params {
            let node = NodeRef::Param(param);
            if self.enter(parent, node)
                && let Some(default) = &param.default
            {
                self.expr(default, Some(node));
            }
        }
    }

    fn members(&mut self, members: &'p [ClassMember], parent: Option<NodeRef<'p>>) {
        for member in members {
            let node = NodeRef::Member(member);
            if !self.enter(parent, node) {
                continue;
            }
            let me = Some(node);
            match &member.kind {
                MemberKind::Method(method) => {
                    self.annotations(&method.annotations, me);
                    let label = format!("{FUNCTION_LABEL_PREFIX}{}", method.name);
                    self.with_scope(label, member.from.clone(), |w| {
                        w.params(&method.params, me);
                        if let Some(body) = &method.body {
                            w.statements(body, me);
                        }
                    });
                }
                MemberKind::Property(property) => {
                    if let Some(default) = &property.default {
                        self.expr(default, me);
                    }
                }
                MemberKind::Constant(constant) => {
                    for item in &constant.items {
                        self.const_item(item, me);
                    }
                }
                MemberKind::TraitUse(_) | MemberKind::EnumCase(_) | MemberKind::Unsupported(_) => {}
            }
        }
    }

    // ─── Expressions ────────────────────────────────────────────────────

    fn exprs(&mut self, exprs: &'p [Expr], parent: Option<NodeRef<'p>>) {
        for expr in exprs {
            self.expr(expr, parent);
        }
    }

    fn expr(&mut self, expr: &'p Expr, parent: Option<NodeRef<'p>>) {
        let node = NodeRef::Expr(expr);
        if !self.enter(parent, node) {
            return;
        }
        let me = Some(node);
        match &expr.kind {
            ExprKind::Literal(_)
            | ExprKind::Variable(_)
            | ExprKind::This
            | ExprKind::Name(_)
            | ExprKind::SelfRef
            | ExprKind::StaticRef
            | ExprKind::ParentRef
            | ExprKind::Unsupported(_) => {}
            ExprKind::Array(items) | ExprKind::List(items) => {
                for item in items {
                    let node = NodeRef::ArrayItem(item);
                    if !self.enter(me, node) {
                        continue;
                    }
                    if let Some(key) = &item.key {
                        self.expr(key, Some(node));
                    }
                    self.expr(&item.value, Some(node));
                }
            }
            ExprKind::Call { callee, args } => {
                self.expr(callee, me);
                self.exprs(args, me);
            }
            ExprKind::MethodCall { object, args, .. } => {
                self.expr(object, me);
                self.exprs(args, me);
            }
            ExprKind::StaticCall { class, args, .. } | ExprKind::New { class, args } => {
                self.expr(class, me);
                self.exprs(args, me);
            }
            ExprKind::PropertyFetch { object, .. } => self.expr(object, me),
            ExprKind::StaticPropertyFetch { class, .. } | ExprKind::ClassConstFetch { class, .. } => {
                self.expr(class, me)
            }
            ExprKind::ArrayAccess { array, index } => {
                self.expr(array, me);
                if let Some(index) = index {
                    self.expr(index, me);
                }
            }
            ExprKind::Assign { target, value } => {
                self.expr(target, me);
                self.expr(value, me);
            }
            ExprKind::Binary { left, right, .. } => {
                self.expr(left, me);
                self.expr(right, me);
            }
            ExprKind::Unary { operand, .. } => self.expr(operand, me),
            ExprKind::Ternary {
                condition,
                then,
                otherwise,
            } => {
                self.expr(condition, me);
                if let Some(then) = then {
                    self.expr(then, me);
                }
                self.expr(otherwise, me);
            }
            ExprKind::Closure(lambda) | ExprKind::ArrowFunction(lambda) => {
                let label = format!("{FUNCTION_LABEL_PREFIX}{CLOSURE_NAME}");
                self.with_scope(label, expr.from.clone(), |w| {
                    w.params(&lambda.params, me);
                    match &lambda.body {
                        LambdaBody::Block(body) => w.statements(body, me),
                        LambdaBody::Expr(body) => w.expr(body, me),
                    }
                });
            }
            ExprKind::Match { subject, arms } => {
                self.expr(subject, me);
                for arm in arms {
                    let node = NodeRef::MatchArm(arm);
                    if !self.enter(me, node) {
                        continue;
                    }
                    self.exprs(&arm.conditions, Some(node));
                    self.expr(&arm.body, Some(node));
                }
            }
            ExprKind::Throw(inner) | ExprKind::Clone(inner) => self.expr(inner, me),
            ExprKind::Yield(value) => {
                if let Some(value) = value {
                    self.expr(value, me);
                }
            }
        }
    }
}

fn unsupported_description(node: NodeRef<'_>) -> Option<&str> {
    match node {
        NodeRef::Stmt(Stmt {
            kind: StmtKind::Unsupported(what),
            ..
        })
        | NodeRef::Expr(Expr {
            kind: ExprKind::Unsupported(what),
            ..
        })
        | NodeRef::Member(ClassMember {
            kind: MemberKind::Unsupported(what),
            ..
        }) => Some(what),
        _ => None,
    }
}

/// Element type of a generic collection: the last type argument.
fn element_type(ty: &Types) -> Option<Types> {
    match ty {
        Types::Generic { types, .. } => types.last().cloned(),
        Types::Nullable(inner) => element_type(inner),
        _ => None,
    }
}
