/// Structural type inference.
///
/// [`Inferencer::infer`] derives a [`Types`] value for an expression from
/// its syntactic shape, the bindings visible in a scope, and the declared
/// signatures in the symbol registry.  Nothing is executed.  An expression
/// that cannot be typed yields `None`; callers treat that as "no
/// information", never as an error.
///
/// Methods and functions without a declared return type are typed by
/// walking their body in a fresh scope tree and taking the first `return`
/// whose value can be inferred.  That recursion is bounded by
/// [`MAX_INFER_DEPTH`] and memoized per request.
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::ast::{ClassKind, Expr, ExprKind, Literal, NodeId, NodeRef, Stmt, StmtKind};
use crate::inheritance::{find_constant, find_method, find_property};
use crate::registry::SymbolTables;
use crate::scope::{CLASS_LABEL_PREFIX, FUNCTION_LABEL_PREFIX, ScopeRef, ScopeTree};
use crate::types::{NameContext, ParameterInfo, Types};
use crate::walker;

/// How many method bodies deep return-type inference may go.
pub const MAX_INFER_DEPTH: u8 = 8;

// ─── Type cache ─────────────────────────────────────────────────────────────

/// Inferred types keyed by node.
///
/// The first type recorded for a node is kept; later writes are ignored, so
/// overlapping walks over the same tree cannot disagree.
#[derive(Debug, Clone, Default)]
pub struct TypeCache {
    types: HashMap<NodeId, Types>,
}

impl TypeCache {
    /// Returns `false` if the node already had a type.
    pub fn record(&mut self, id: NodeId, ty: Types) -> bool {
        if self.types.contains_key(&id) {
            return false;
        }
        self.types.insert(id, ty);
        true
    }

    pub fn get(&self, id: NodeId) -> Option<&Types> {
        self.types.get(&id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

// ─── Inferencer ─────────────────────────────────────────────────────────────

pub struct Inferencer<'r> {
    pub(crate) symbols: &'r SymbolTables,
    /// Namespace and imports of the file the expressions come from.
    pub(crate) names: Arc<NameContext>,
    depth: u8,
    /// Body-inferred return types, keyed by `class::method` or function.
    returns: Arc<Mutex<HashMap<String, Option<Types>>>>,
}

impl<'r> Inferencer<'r> {
    pub fn new(symbols: &'r SymbolTables, names: Arc<NameContext>) -> Self {
        Self {
            symbols,
            names,
            depth: 0,
            returns: Arc::default(),
        }
    }

    /// Infer the type of `expr` as seen from `scope`.
    pub fn infer(&self, expr: &Expr, scope: ScopeRef<'_>) -> Option<Types> {
        match &expr.kind {
            ExprKind::Literal(literal) => Some(Types::base(match literal {
                Literal::Int(_) => "int",
                Literal::Float(_) => "float",
                Literal::String(_) => "string",
                Literal::Bool(_) => "bool",
                Literal::Null => "null",
            })),
            ExprKind::Array(_) | ExprKind::List(_) => Some(Types::base("array")),
            ExprKind::New { class, .. } => self.class_of(class, scope).map(|c| Types::class(&c)),
            ExprKind::Variable(name) => lookup_variable(scope, name),
            ExprKind::This => scope.enclosing_class().map(Types::class),
            ExprKind::MethodCall { object, method, .. } => {
                let object_type = self.infer(object, scope)?;
                self.method_return(&object_type, method)
            }
            ExprKind::StaticCall { class, method, .. } => {
                let class = self.class_of(class, scope)?;
                self.method_return(&Types::class(&class), method)
            }
            ExprKind::Call { callee, .. } => match &callee.kind {
                ExprKind::Name(name) => self.function_return(name),
                ExprKind::Closure(lambda) | ExprKind::ArrowFunction(lambda) => lambda
                    .return_hint
                    .as_deref()
                    .and_then(|h| Types::from_hint(h, &|n: &str| self.names.resolve_class(n))),
                _ => None,
            },
            ExprKind::PropertyFetch {
                object, property, ..
            } => {
                let object_type = self.infer(object, scope)?;
                self.property_type(&object_type, property)
            }
            ExprKind::StaticPropertyFetch { class, property } => {
                let class = self.class_of(class, scope)?;
                self.property_type(&Types::class(&class), property)
            }
            ExprKind::ClassConstFetch { class, constant } => {
                if constant.eq_ignore_ascii_case("class") {
                    return Some(Types::base("string"));
                }
                let class = self.class_of(class, scope)?;
                self.constant_type(&class, constant)
            }
            ExprKind::Clone(inner) => self.infer(inner, scope),
            ExprKind::Assign { value, .. } => self.infer(value, scope),
            ExprKind::Ternary {
                condition,
                then,
                otherwise,
            } => {
                // `a ?: b` yields `a` when truthy.
                let then_type = match then {
                    Some(then) => self.infer(then, scope),
                    None => self.infer(condition, scope),
                };
                merge(then_type, self.infer(otherwise, scope))
            }
            ExprKind::Match { arms, .. } => arms
                .iter()
                .map(|arm| self.infer(&arm.body, scope))
                .fold(None, merge),
            ExprKind::Binary { op, left, right } => match op.to_ascii_lowercase().as_str() {
                "." => Some(Types::base("string")),
                "??" => merge(self.infer(left, scope), self.infer(right, scope)),
                "==" | "===" | "!=" | "!==" | "<>" | "<" | ">" | "<=" | ">=" | "&&" | "||"
                | "and" | "or" | "xor" | "instanceof" => Some(Types::base("bool")),
                _ => None,
            },
            ExprKind::Unary { op, .. } if op == "!" => Some(Types::base("bool")),
            ExprKind::Closure(_) | ExprKind::ArrowFunction(_) => Some(Types::class("Closure")),
            _ => None,
        }
    }

    /// Class names an expression's type may denote.
    pub fn infer_class_names(&self, expr: &Expr, scope: ScopeRef<'_>) -> Vec<String> {
        self.infer(expr, scope)
            .map(|t| t.class_names())
            .unwrap_or_default()
    }

    /// The class an expression in class position names: `Foo`, `self`,
    /// `static`, `parent`, or any expression whose type is a class.
    pub fn class_of(&self, expr: &Expr, scope: ScopeRef<'_>) -> Option<String> {
        match &expr.kind {
            ExprKind::Name(name) => {
                let resolved = self.names.resolve_class(name);
                if self.symbols.class_like(&resolved).is_none()
                    && let Some(written) = self.symbols.class_like(name)
                {
                    return Some(written.name.clone());
                }
                Some(self.canonical_class(&resolved))
            }
            ExprKind::SelfRef | ExprKind::StaticRef | ExprKind::This => {
                scope.enclosing_class().map(str::to_string)
            }
            ExprKind::ParentRef => {
                let class = scope.enclosing_class()?;
                self.symbols.class_like(class)?.parent.clone()
            }
            _ => self.infer(expr, scope)?.class_names().into_iter().next(),
        }
    }

    /// Registered spelling of a class name, or the name itself.
    fn canonical_class(&self, name: &str) -> String {
        self.symbols
            .class_like(name)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| name.trim_start_matches('\\').to_string())
    }

    pub fn method_return(&self, object_type: &Types, method: &str) -> Option<Types> {
        for class in object_type.class_names() {
            let Some(found) = find_method(self.symbols, &class, method) else {
                continue;
            };
            let def = found.item;
            if let Some(hint) = def.return_hint.as_deref()
                && (hint.eq_ignore_ascii_case("static") || hint == "$this")
            {
                return Some(Types::class(&self.canonical_class(&class)));
            }
            if let Some(declared) = &def.return_type {
                return Some(declared.clone());
            }
            if let Some(body) = &def.body {
                let key = format!("{}::{}", found.declared_in.name, def.name).to_ascii_lowercase();
                let inferred = self.body_return(
                    key,
                    body,
                    Some(&found.owner.name),
                    &def.name,
                    &def.parameters,
                    found.declared_in.names.clone(),
                );
                if inferred.is_some() {
                    return inferred;
                }
            }
        }
        None
    }

    pub fn function_return(&self, name: &str) -> Option<Types> {
        let func = self
            .symbols
            .get_func(&self.names.resolve_function(name))
            .or_else(|| self.symbols.get_func(name))?;
        if let Some(declared) = &func.return_type {
            return Some(declared.clone());
        }
        self.body_return(
            func.name.to_ascii_lowercase(),
            &func.body,
            None,
            func.short_name(),
            &func.parameters,
            func.names.clone(),
        )
    }

    fn property_type(&self, object_type: &Types, property: &str) -> Option<Types> {
        object_type.class_names().iter().find_map(|class| {
            find_property(self.symbols, class, property).and_then(|found| found.item.ty.clone())
        })
    }

    fn constant_type(&self, class: &str, constant: &str) -> Option<Types> {
        let found = find_constant(self.symbols, class, constant)?;
        match found.item.type_hint.as_deref() {
            Some(hint) => {
                let names = &found.declared_in.names;
                Types::from_hint(hint, &|n: &str| names.resolve_class(n))
            }
            // Enum cases are instances of the enum.
            None if found.declared_in.kind == ClassKind::Enum => {
                Some(Types::class(&found.declared_in.name))
            }
            None => None,
        }
    }

    /// Type of the first `return` in `body` whose value can be inferred.
    fn body_return(
        &self,
        key: String,
        body: &[Stmt],
        class: Option<&str>,
        name: &str,
        params: &[ParameterInfo],
        names: Arc<NameContext>,
    ) -> Option<Types> {
        if let Some(cached) = self.returns.lock().get(&key) {
            return cached.clone();
        }
        if self.depth >= MAX_INFER_DEPTH {
            trace!(key, "return inference depth limit reached");
            return None;
        }
        // Placeholder so that recursive calls terminate.
        self.returns.lock().insert(key.clone(), None);

        let inner = Inferencer {
            symbols: self.symbols,
            names,
            depth: self.depth + 1,
            returns: self.returns.clone(),
        };
        let mut tree = ScopeTree::new();
        let mut scope = tree.root();
        if let Some(class) = class {
            scope = tree.create_child_scope(scope, &format!("{CLASS_LABEL_PREFIX}{class}"), None);
        }
        scope = tree.create_child_scope(scope, &format!("{FUNCTION_LABEL_PREFIX}{name}"), None);
        for param in params {
            let ty = param.ty.clone().unwrap_or_else(Types::mixed);
            tree.set_variable_type(scope, &param.name, ty);
        }

        let mut found: Option<Types> = None;
        walker::walk_statements(body, tree, scope, &inner, |scope, _parent, node| {
            if found.is_some() {
                return false;
            }
            match node {
                NodeRef::Stmt(Stmt {
                    kind: StmtKind::Return(Some(value)),
                    ..
                }) => {
                    found = inner.infer(value, scope);
                    true
                }
                // Returns of nested functions belong to them.
                NodeRef::Stmt(Stmt {
                    kind: StmtKind::Function(_) | StmtKind::Class(_) | StmtKind::Interface(_),
                    ..
                }) => false,
                NodeRef::Expr(Expr {
                    kind: ExprKind::Closure(_) | ExprKind::ArrowFunction(_),
                    ..
                }) => false,
                _ => true,
            }
        });

        self.returns.lock().insert(key, found.clone());
        found
    }
}

/// Variables are looked up with and without the `$` sigil.
fn lookup_variable(scope: ScopeRef<'_>, name: &str) -> Option<Types> {
    let bare = name.trim_start_matches('$');
    scope
        .get_variable_type(name)
        .or_else(|| scope.get_variable_type(bare))
        .or_else(|| scope.get_variable_type(&format!("${bare}")))
        .cloned()
}

/// Simple union of two optional types.
fn merge(a: Option<Types>, b: Option<Types>) -> Option<Types> {
    match (a, b) {
        (Some(a), Some(b)) if a == b => Some(a),
        (Some(a), Some(b)) => Some(Types::union(vec![a, b])),
        (a, b) => a.or(b),
    }
}
