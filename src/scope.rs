/// Scope contexts.
///
/// Scopes form a tree stored in an arena ([`ScopeTree`]) and addressed by
/// [`ScopeId`].  Each scope knows only its parent; parents never enumerate
/// their children.  A scope holds the variable bindings introduced while
/// walking its part of the AST plus three label stacks:
///
///   - `scope_stack`: human-readable labels such as `function:foo` and
///     `class:App\User`, outermost first
///   - `function_stack`: names of the enclosing functions and methods
///   - `loop_stack`: labels of the loops currently being walked
///
/// A child starts with an empty binding map and copies of its parent's
/// stacks.  Lookups fall through to the parent chain.
use std::collections::HashMap;

use crate::ast::Span;
use crate::types::Types;

pub const CLASS_LABEL_PREFIX: &str = "class:";
pub const FUNCTION_LABEL_PREFIX: &str = "function:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub values: HashMap<String, Types>,
    pub scope_stack: Vec<String>,
    pub function_stack: Vec<String>,
    pub loop_stack: Vec<String>,
    /// Span of the declaration that opened this scope.
    pub owner: Option<Span>,
}

/// Arena of scopes for one walk.
#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// A tree containing only the root scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0 as usize)
    }

    fn get_mut(&mut self, id: ScopeId) -> Option<&mut Scope> {
        self.scopes.get_mut(id.0 as usize)
    }

    pub fn scope_ref(&self, id: ScopeId) -> ScopeRef<'_> {
        ScopeRef { tree: self, id }
    }

    /// Fork a child of `parent` labelled `label`.
    ///
    /// Labels starting with `function:` are also pushed onto the function
    /// stack.
    pub fn create_child_scope(
        &mut self,
        parent: ScopeId,
        label: &str,
        owner: Option<Span>,
    ) -> ScopeId {
        let (mut scope_stack, mut function_stack, loop_stack) = match self.get(parent) {
            Some(p) => (
                p.scope_stack.clone(),
                p.function_stack.clone(),
                p.loop_stack.clone(),
            ),
            None => Default::default(),
        };
        scope_stack.push(label.to_string());
        if let Some(name) = label.strip_prefix(FUNCTION_LABEL_PREFIX) {
            function_stack.push(name.to_string());
        }
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent: Some(parent),
            values: HashMap::new(),
            scope_stack,
            function_stack,
            loop_stack,
            owner,
        });
        id
    }

    /// Bind `name` in scope `id` itself, never in an ancestor.
    pub fn set_variable_type(&mut self, id: ScopeId, name: &str, ty: Types) {
        if let Some(scope) = self.get_mut(id) {
            scope.values.insert(name.to_string(), ty);
        }
    }

    pub fn get_variable_type(&self, id: ScopeId, name: &str) -> Option<&Types> {
        self.scope_ref(id).get_variable_type(name)
    }

    pub fn push_loop(&mut self, id: ScopeId, label: &str) {
        if let Some(scope) = self.get_mut(id) {
            scope.loop_stack.push(label.to_string());
        }
    }

    pub fn pop_loop(&mut self, id: ScopeId) {
        if let Some(scope) = self.get_mut(id) {
            scope.loop_stack.pop();
        }
    }

    /// The innermost scope whose owning declaration encloses `pos`.
    pub fn innermost_at(&self, pos: tower_lsp::lsp_types::Position) -> ScopeId {
        let mut best = self.root();
        for (i, scope) in self.scopes.iter().enumerate() {
            let Some(owner) = &scope.owner else {
                continue;
            };
            if !crate::position::contains(owner, pos) {
                continue;
            }
            let deeper = match self.get(best).and_then(|b| b.owner.as_ref()) {
                Some(current) => crate::position::encloses(current, owner),
                None => true,
            };
            if deeper {
                best = ScopeId(i as u32);
            }
        }
        best
    }

    /// Copy the chain from the root down to `id` into a fresh tree.
    ///
    /// The returned id addresses the copy of `id` in the new tree.
    pub fn snapshot(&self, id: ScopeId) -> (ScopeTree, ScopeId) {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(scope) = self.get(current) else {
                break;
            };
            chain.push(scope.clone());
            cursor = scope.parent;
        }
        chain.reverse();

        let mut scopes = Vec::with_capacity(chain.len().max(1));
        for (i, mut scope) in chain.into_iter().enumerate() {
            scope.parent = i.checked_sub(1).map(|p| ScopeId(p as u32));
            scopes.push(scope);
        }
        if scopes.is_empty() {
            scopes.push(Scope::default());
        }
        let last = ScopeId((scopes.len() - 1) as u32);
        (ScopeTree { scopes }, last)
    }

    /// [`ScopeTree::snapshot`] of `id` whose bindings come from `earlier`,
    /// an older snapshot of an ancestor-or-self of `id`.  Scopes deeper
    /// than `earlier` reaches start out empty.
    pub fn snapshot_with_bindings(
        &self,
        id: ScopeId,
        earlier: Option<&ScopeTree>,
    ) -> (ScopeTree, ScopeId) {
        let (mut tree, last) = self.snapshot(id);
        for (depth, scope) in tree.scopes.iter_mut().enumerate() {
            scope.values = earlier
                .and_then(|e| e.scopes.get(depth))
                .map(|s| s.values.clone())
                .unwrap_or_default();
        }
        (tree, last)
    }
}

/// Read-only handle on one scope of a tree.
#[derive(Debug, Clone, Copy)]
pub struct ScopeRef<'t> {
    pub tree: &'t ScopeTree,
    pub id: ScopeId,
}

impl<'t> ScopeRef<'t> {
    pub fn scope(&self) -> Option<&'t Scope> {
        self.tree.get(self.id)
    }

    pub fn parent(&self) -> Option<ScopeRef<'t>> {
        let parent = self.scope()?.parent?;
        Some(ScopeRef {
            tree: self.tree,
            id: parent,
        })
    }

    /// Local bindings first, then each ancestor in turn.
    pub fn get_variable_type(&self, name: &str) -> Option<&'t Types> {
        let mut cursor = Some(*self);
        while let Some(scope_ref) = cursor {
            let scope = scope_ref.scope()?;
            if let Some(ty) = scope.values.get(name) {
                return Some(ty);
            }
            cursor = scope_ref.parent();
        }
        None
    }

    /// Label of the innermost enclosing `class:` scope, without the prefix.
    pub fn enclosing_class(&self) -> Option<&'t str> {
        self.scope()?
            .scope_stack
            .iter()
            .rev()
            .find_map(|label| label.strip_prefix(CLASS_LABEL_PREFIX))
    }

    pub fn enclosing_function(&self) -> Option<&'t str> {
        self.scope()?.function_stack.last().map(String::as_str)
    }

    pub fn in_loop(&self) -> bool {
        self.scope().is_some_and(|s| !s.loop_stack.is_empty())
    }

    /// Every visible binding, inner scopes shadowing outer ones, sorted by
    /// name.
    pub fn visible_bindings(&self) -> Vec<(&'t str, &'t Types)> {
        let mut seen: HashMap<&'t str, &'t Types> = HashMap::new();
        let mut cursor = Some(*self);
        while let Some(scope_ref) = cursor {
            let Some(scope) = scope_ref.scope() else {
                break;
            };
            for (name, ty) in &scope.values {
                seen.entry(name.as_str()).or_insert(ty);
            }
            cursor = scope_ref.parent();
        }
        let mut out: Vec<_> = seen.into_iter().collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_up_the_parent_chain() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        tree.set_variable_type(root, "$user", Types::class("User"));
        let child = tree.create_child_scope(root, "function:run", None);
        assert_eq!(
            tree.get_variable_type(child, "$user"),
            Some(&Types::class("User"))
        );
        assert_eq!(tree.get_variable_type(child, "$missing"), None);
    }

    #[test]
    fn child_binding_does_not_leak_into_parent() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        tree.set_variable_type(root, "$x", Types::base("int"));
        let child = tree.create_child_scope(root, "function:inner", None);
        tree.set_variable_type(child, "$x", Types::class("Shadow"));
        tree.set_variable_type(child, "$only_inner", Types::base("string"));

        assert_eq!(tree.get_variable_type(child, "$x"), Some(&Types::class("Shadow")));
        assert_eq!(tree.get_variable_type(root, "$x"), Some(&Types::base("int")));
        assert_eq!(tree.get_variable_type(root, "$only_inner"), None);
    }

    #[test]
    fn child_copies_parent_stacks() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let class = tree.create_child_scope(root, "class:App\\User", None);
        tree.push_loop(class, "foreach");
        let method = tree.create_child_scope(class, "function:save", None);
        tree.pop_loop(class);

        let m = tree.scope_ref(method);
        assert_eq!(m.enclosing_class(), Some("App\\User"));
        assert_eq!(m.enclosing_function(), Some("save"));
        assert!(m.in_loop());
        assert!(!tree.scope_ref(class).in_loop());
        assert_eq!(
            m.scope().map(|s| s.scope_stack.clone()),
            Some(vec!["class:App\\User".to_string(), "function:save".to_string()])
        );
    }

    #[test]
    fn visible_bindings_prefer_inner_scope() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        tree.set_variable_type(root, "$a", Types::base("int"));
        tree.set_variable_type(root, "$b", Types::base("int"));
        let child = tree.create_child_scope(root, "function:f", None);
        tree.set_variable_type(child, "$a", Types::base("string"));

        let bindings = tree.scope_ref(child).visible_bindings();
        assert_eq!(
            bindings,
            vec![("$a", &Types::base("string")), ("$b", &Types::base("int"))]
        );
    }

    #[test]
    fn snapshot_keeps_only_the_chain() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        tree.set_variable_type(root, "$g", Types::base("int"));
        let _sibling = tree.create_child_scope(root, "function:other", None);
        let f = tree.create_child_scope(root, "function:f", None);
        tree.set_variable_type(f, "$l", Types::base("bool"));

        let (copy, id) = tree.snapshot(f);
        assert_eq!(copy.len(), 2);
        assert_eq!(copy.get_variable_type(id, "$g"), Some(&Types::base("int")));
        assert_eq!(copy.get_variable_type(id, "$l"), Some(&Types::base("bool")));
    }
}
