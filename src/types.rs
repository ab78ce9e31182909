//! Data types used throughout the Origami language server.
//!
//! This module contains the [`Types`] tagged union produced by inference
//! and consumed by resolution, plus the "model" structs that the symbol
//! registry stores for every declared class, interface and function.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::ast::{ClassKind, Span, Stmt};

pub use crate::ast::Visibility;

/// Nesting depth beyond which [`Types::class_names`] stops descending.
const MAX_TYPE_DEPTH: usize = 32;

/// Names that never denote a class.
const BUILTIN_TYPES: &[&str] = &[
    "int", "integer", "float", "double", "string", "bool", "boolean", "null", "void", "never",
    "mixed", "array", "list", "iterable", "callable", "object", "resource", "true", "false",
];

pub fn is_builtin_type(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    BUILTIN_TYPES.contains(&lower.as_str())
}

// ─── Types ──────────────────────────────────────────────────────────────────

/// A statically inferred or declared type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Types {
    /// Primitive or unresolved type name.
    Base(String),
    /// A class-like type, by fully-qualified name.
    Class(String),
    Nullable(Box<Types>),
    Union(Vec<Types>),
    Generic { name: String, types: Vec<Types> },
}

impl Types {
    pub fn base(name: &str) -> Self {
        Types::Base(name.to_string())
    }

    pub fn class(name: &str) -> Self {
        Types::Class(name.trim_start_matches('\\').to_string())
    }

    /// `mixed`: a binding exists but nothing is known about it.
    pub fn mixed() -> Self {
        Types::base("mixed")
    }

    /// Build a union, collapsing duplicates and single-member unions.
    pub fn union(members: Vec<Types>) -> Self {
        let mut flat: Vec<Types> = Vec::with_capacity(members.len());
        for member in members {
            match member {
                Types::Union(inner) => {
                    for t in inner {
                        if !flat.contains(&t) {
                            flat.push(t);
                        }
                    }
                }
                other => {
                    if !flat.contains(&other) {
                        flat.push(other);
                    }
                }
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Types::Union(flat)
        }
    }

    /// Parse a declared type hint such as `?Foo`, `A|null` or `Box<T>`.
    ///
    /// `resolve` maps a class-like name as written to its fully-qualified
    /// form; it also receives `self`, `static` and `$this` so the caller can
    /// substitute the declaring class.
    pub fn from_hint(hint: &str, resolve: &dyn Fn(&str) -> String) -> Option<Types> {
        let hint = hint.trim();
        if hint.is_empty() {
            return None;
        }
        let parts = split_top_level(hint, &['|', '&']);
        if parts.len() > 1 {
            let members: Vec<Types> = parts
                .iter()
                .filter_map(|p| Types::from_hint(p, resolve))
                .collect();
            return match members.len() {
                0 => None,
                _ => Some(Types::union(members)),
            };
        }
        if let Some(inner) = hint.strip_prefix('?') {
            return Types::from_hint(inner, resolve).map(|t| Types::Nullable(Box::new(t)));
        }
        if let Some(inner) = hint.strip_prefix('(').and_then(|h| h.strip_suffix(')')) {
            return Types::from_hint(inner, resolve);
        }
        if let Some(open) = hint.find('<')
            && hint.ends_with('>')
        {
            let name = hint[..open].trim();
            let args = &hint[open + 1..hint.len() - 1];
            let types = split_top_level(args, &[','])
                .iter()
                .filter_map(|a| Types::from_hint(a, resolve))
                .collect();
            let name = if is_builtin_type(name) {
                name.to_ascii_lowercase()
            } else {
                resolve(name)
            };
            return Some(Types::Generic { name, types });
        }
        if is_builtin_type(hint) {
            return Some(Types::Base(hint.to_ascii_lowercase()));
        }
        Some(Types::class(&resolve(hint)))
    }

    /// Every class name this type may denote, in order, without duplicates.
    ///
    /// `Nullable` and `Union` are unwrapped; a `Generic` contributes its own
    /// name when that is class-like.  Nesting deeper than an internal limit
    /// is ignored.
    pub fn class_names(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_class_names(self, 0, &mut out);
        out
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            Types::Nullable(_) => true,
            Types::Base(name) => name == "null",
            Types::Union(members) => members.iter().any(Types::is_nullable),
            _ => false,
        }
    }
}

fn collect_class_names(ty: &Types, depth: usize, out: &mut Vec<String>) {
    if depth > MAX_TYPE_DEPTH {
        return;
    }
    let mut push = |name: &str| {
        let name = name.trim_start_matches('\\');
        if !name.is_empty() && !is_builtin_type(name) && !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    };
    match ty {
        Types::Class(name) | Types::Base(name) => push(name),
        Types::Generic { name, .. } => push(name),
        Types::Nullable(inner) => collect_class_names(inner, depth + 1, out),
        Types::Union(members) => {
            for member in members {
                collect_class_names(member, depth + 1, out);
            }
        }
    }
}

/// Split on any of `separators` that sit outside `<>` and `()` nesting.
fn split_top_level<'a>(text: &'a str, separators: &[char]) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '<' | '(' => depth += 1,
            '>' | ')' => depth -= 1,
            c if depth == 0 && separators.contains(&c) => {
                parts.push(text[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

impl fmt::Display for Types {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Types::Base(name) | Types::Class(name) => write!(f, "{name}"),
            Types::Nullable(inner) => write!(f, "?{inner}"),
            Types::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
            Types::Generic { name, types } => {
                write!(f, "{name}<")?;
                for (i, t) in types.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{t}")?;
                }
                write!(f, ">")
            }
        }
    }
}

// ─── Name resolution context ────────────────────────────────────────────────

/// Namespace and import table of one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameContext {
    pub namespace: Option<String>,
    /// Local alias → fully-qualified class name.
    pub uses: HashMap<String, String>,
    /// Local alias → fully-qualified function name.
    pub function_uses: HashMap<String, String>,
}

impl NameContext {
    /// Qualify a class-like name as written in this file.
    pub fn resolve_class(&self, name: &str) -> String {
        if let Some(fq) = name.strip_prefix('\\') {
            return fq.to_string();
        }
        let (first, rest) = match name.split_once('\\') {
            Some((first, rest)) => (first, Some(rest)),
            None => (name, None),
        };
        if let Some(imported) = self.uses.get(first) {
            return match rest {
                Some(rest) => format!("{imported}\\{rest}"),
                None => imported.clone(),
            };
        }
        self.qualify(name)
    }

    /// Qualify a function name as written in this file.
    pub fn resolve_function(&self, name: &str) -> String {
        if let Some(fq) = name.strip_prefix('\\') {
            return fq.to_string();
        }
        if let Some(imported) = self.function_uses.get(name) {
            return imported.clone();
        }
        self.qualify(name)
    }

    /// Prefix a declared name with the file's namespace.
    pub fn qualify(&self, name: &str) -> String {
        match &self.namespace {
            Some(ns) if !ns.is_empty() => format!("{ns}\\{name}"),
            _ => name.to_string(),
        }
    }
}

/// Last segment of a possibly namespaced name.
pub fn short_name(fqn: &str) -> &str {
    fqn.rsplit('\\').next().unwrap_or(fqn)
}

// ─── Registry entries ───────────────────────────────────────────────────────

/// Parameter of a function or method.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    /// The parameter name including the `$` prefix (e.g. "$text").
    pub name: String,
    /// Type hint as written.
    pub type_hint: Option<String>,
    pub ty: Option<Types>,
    pub is_required: bool,
    pub is_variadic: bool,
    pub is_reference: bool,
}

impl fmt::Display for ParameterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(hint) = &self.type_hint {
            write!(f, "{hint} ")?;
        }
        if self.is_reference {
            write!(f, "&")?;
        }
        if self.is_variadic {
            write!(f, "...")?;
        }
        write!(f, "{}", self.name)?;
        if !self.is_required && !self.is_variadic {
            write!(f, " = …")?;
        }
        Ok(())
    }
}

/// A class method as stored in the registry.
#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: String,
    pub from: Option<Span>,
    pub parameters: Vec<ParameterInfo>,
    /// Return type hint as written.
    pub return_hint: Option<String>,
    /// Declared return type, with `self`/`static` already bound to the
    /// declaring class.
    pub return_type: Option<Types>,
    /// Body statements, scanned for `return` when no type is declared.
    pub body: Option<Arc<[Stmt]>>,
    pub is_static: bool,
    pub visibility: Visibility,
}

impl PartialEq for MethodDef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.from == other.from
            && self.parameters == other.parameters
            && self.return_type == other.return_type
            && self.is_static == other.is_static
            && self.visibility == other.visibility
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    /// The property name WITHOUT the `$` prefix.
    pub name: String,
    pub from: Option<Span>,
    pub type_hint: Option<String>,
    pub ty: Option<Types>,
    pub is_static: bool,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantDef {
    pub name: String,
    pub from: Option<Span>,
    pub type_hint: Option<String>,
    pub visibility: Visibility,
}

/// A class, interface, trait or enum.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    /// Fully-qualified name.
    pub name: String,
    pub kind: ClassKind,
    pub from: Option<Span>,
    /// Fully-qualified parent name.  For interfaces this is the first
    /// extended interface.
    pub parent: Option<String>,
    pub interfaces: Vec<String>,
    pub traits: Vec<String>,
    pub methods: Vec<MethodDef>,
    pub properties: Vec<PropertyDef>,
    pub constants: Vec<ConstantDef>,
    /// Name context of the declaring file, used when inferring inside
    /// method bodies.
    pub names: Arc<NameContext>,
}

impl ClassDef {
    pub fn short_name(&self) -> &str {
        short_name(&self.name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodDef> {
        self.methods
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        let name = name.trim_start_matches('$');
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn constant(&self, name: &str) -> Option<&ConstantDef> {
        self.constants.iter().find(|c| c.name == name)
    }
}

/// Interfaces share the class-like shape.
pub type InterfaceDef = ClassDef;

/// A free function.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    /// Fully-qualified name.
    pub name: String,
    pub from: Option<Span>,
    pub parameters: Vec<ParameterInfo>,
    pub return_hint: Option<String>,
    pub return_type: Option<Types>,
    pub body: Arc<[Stmt]>,
    pub names: Arc<NameContext>,
}

impl PartialEq for FunctionDef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.from == other.from
            && self.parameters == other.parameters
            && self.return_type == other.return_type
    }
}

impl FunctionDef {
    pub fn short_name(&self) -> &str {
        short_name(&self.name)
    }
}

/// Render `name(params): ret`.
pub fn format_signature(name: &str, params: &[ParameterInfo], return_hint: Option<&str>) -> String {
    let params = params
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    match return_hint {
        Some(ret) => format!("{name}({params}): {ret}"),
        None => format!("{name}({params})"),
    }
}
