/// Member completion after `->`, `?->`, `.` and `::`.
///
/// The receiver text left of the operator is parsed as a standalone
/// expression and typed with the inferencer against the scope at the
/// cursor, so anything definition can resolve (variables, `$this`,
/// chained calls, property fetches, static calls) can be completed on.
///
/// Members come from [`resolve_class_with_inheritance`], which already
/// lets the most derived declaration win.  Private members are offered
/// only inside the class they belong to; protected and public members are
/// always offered.
use std::collections::HashSet;

use tower_lsp::lsp_types::*;
use tracing::debug;

use crate::ast::{Expr, ExprKind, StmtKind};
use crate::infer::Inferencer;
use crate::inheritance::{Inherited, resolve_class_with_inheritance};
use crate::parser::parse_program;
use crate::scope::ScopeRef;
use crate::types::{MethodDef, Visibility, format_signature};

const SUBJECT_URI: &str = "origami://completion-subject";

/// Which members an access operator exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    /// `->`: instance methods and properties.
    Instance,
    /// `Foo::`: static methods, static properties and constants.
    Static,
    /// `self::`, `static::`, `parent::`: as `Static`, plus instance
    /// methods (`parent::__construct()`).
    Scoped,
}

/// Completions for `subject->prefix`.
pub(crate) fn instance_completions(
    inferencer: &Inferencer<'_>,
    scope: ScopeRef<'_>,
    subject: &str,
    prefix: &str,
) -> Vec<CompletionItem> {
    let Some(expr) = parse_expression(subject) else {
        return Vec::new();
    };
    let classes = inferencer.infer_class_names(&expr, scope);
    debug!(subject, ?classes, "member completion receiver");
    members_of(inferencer, scope, &classes, prefix, Access::Instance)
}

/// Completions for `Class::prefix`.
pub(crate) fn static_completions(
    inferencer: &Inferencer<'_>,
    scope: ScopeRef<'_>,
    class: &str,
    prefix: &str,
) -> Vec<CompletionItem> {
    let Some(expr) = parse_expression(&format!("{class}::class")) else {
        return Vec::new();
    };
    let ExprKind::ClassConstFetch { class: target, .. } = &expr.kind else {
        return Vec::new();
    };
    let access = match target.kind {
        ExprKind::SelfRef | ExprKind::StaticRef | ExprKind::ParentRef => Access::Scoped,
        _ => Access::Static,
    };
    let Some(resolved) = inferencer.class_of(target, scope) else {
        return Vec::new();
    };
    debug!(class, resolved, "static completion receiver");
    members_of(inferencer, scope, &[resolved], prefix, access)
}

/// Parse `text` as a single expression statement.
fn parse_expression(text: &str) -> Option<Expr> {
    if text.trim().is_empty() {
        return None;
    }
    let parsed = parse_program(SUBJECT_URI, &format!("<?php {text};"));
    match &parsed.program.statements.first()?.kind {
        StmtKind::Expr(expr) => Some(expr.clone()),
        _ => None,
    }
}

fn members_of(
    inferencer: &Inferencer<'_>,
    scope: ScopeRef<'_>,
    classes: &[String],
    prefix: &str,
    access: Access,
) -> Vec<CompletionItem> {
    let symbols = inferencer.symbols;
    let caller = scope.enclosing_class();
    let wants_property_only = prefix.starts_with('$');
    let prefix = prefix.trim_start_matches('$').to_ascii_lowercase();

    let mut seen: HashSet<String> = HashSet::new();
    let mut items = Vec::new();

    for class in classes {
        let Some(def) = symbols.class_like(class) else {
            continue;
        };
        let merged = resolve_class_with_inheritance(symbols, def);

        let visible = |owner: &str, visibility: Visibility| {
            visibility != Visibility::Private
                || caller.is_some_and(|c| c.eq_ignore_ascii_case(owner))
        };

        if !wants_property_only {
            for method in &merged.methods {
                let m = method.item;
                let offered = match access {
                    Access::Instance => !m.is_static,
                    Access::Static => m.is_static,
                    Access::Scoped => true,
                };
                if !offered
                    || !visible(&method.owner.name, m.visibility)
                    || !m.name.to_ascii_lowercase().starts_with(&prefix)
                    || !seen.insert(format!("m:{}", m.name.to_ascii_lowercase()))
                {
                    continue;
                }
                items.push(method_item(method));
            }
        }

        for property in &merged.properties {
            let p = property.item;
            let offered = match access {
                Access::Instance => !p.is_static,
                Access::Static | Access::Scoped => p.is_static,
            };
            if !offered
                || !visible(&property.owner.name, p.visibility)
                || !p.name.to_ascii_lowercase().starts_with(&prefix)
                || !seen.insert(format!("p:{}", p.name))
            {
                continue;
            }
            // Static properties keep their sigil: `Foo::$cache`.
            let label = if p.is_static {
                format!("${}", p.name)
            } else {
                p.name.clone()
            };
            items.push(CompletionItem {
                label,
                kind: Some(CompletionItemKind::PROPERTY),
                detail: Some(match &p.type_hint {
                    Some(hint) => format!("{hint} (in {})", property.declared_in.short_name()),
                    None => format!("in {}", property.declared_in.short_name()),
                }),
                sort_text: Some(format!("1_{}", p.name.to_ascii_lowercase())),
                ..CompletionItem::default()
            });
        }

        if access == Access::Instance || wants_property_only {
            continue;
        }
        for constant in &merged.constants {
            let c = constant.item;
            if !visible(&constant.owner.name, c.visibility)
                || !c.name.to_ascii_lowercase().starts_with(&prefix)
                || !seen.insert(format!("c:{}", c.name))
            {
                continue;
            }
            items.push(CompletionItem {
                label: c.name.clone(),
                kind: Some(CompletionItemKind::CONSTANT),
                detail: Some(format!("const {}::{}", constant.declared_in.short_name(), c.name)),
                sort_text: Some(format!("2_{}", c.name.to_ascii_lowercase())),
                ..CompletionItem::default()
            });
        }
    }
    items
}

fn method_item(method: &Inherited<'_, MethodDef>) -> CompletionItem {
    let m = method.item;
    let signature = format_signature(&m.name, &m.parameters, m.return_hint.as_deref());
    let insert_text = if m.parameters.is_empty() {
        format!("{}()", m.name)
    } else {
        format!("{}($0)", m.name)
    };
    CompletionItem {
        label: m.name.clone(),
        kind: Some(CompletionItemKind::METHOD),
        detail: Some(format!("{}::{signature}", method.declared_in.short_name())),
        insert_text: Some(insert_text),
        insert_text_format: Some(InsertTextFormat::SNIPPET),
        filter_text: Some(m.name.clone()),
        sort_text: Some(format!("0_{}", m.name.to_ascii_lowercase())),
        ..CompletionItem::default()
    }
}
