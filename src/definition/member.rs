/// Member definition lookups.
///
/// The receiver of `->`/`::` is typed with the inferencer, its class names
/// are extracted (unwrapping nullable, union and generic types) and each
/// candidate class is searched with its traits and parent chain.  A
/// receiver that cannot be typed falls back to scanning every registered
/// class for a method of that name; only real method matches count, never
/// "some class".
use tower_lsp::lsp_types::Location;
use tracing::debug;

use crate::ast::Expr;
use crate::infer::Inferencer;
use crate::inheritance::{find_constant, find_method, find_property};
use crate::scope::ScopeRef;

use super::resolve::location_of;

/// What a member name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MemberKind {
    Method,
    Property,
    Constant,
}

/// Declarations of `name` on the classes `receiver` may denote.
pub(crate) fn instance_member(
    inferencer: &Inferencer<'_>,
    scope: ScopeRef<'_>,
    receiver: &Expr,
    name: &str,
    kind: MemberKind,
) -> Vec<Location> {
    let classes = inferencer.infer_class_names(receiver, scope);
    if classes.is_empty() {
        debug!(name, "receiver type unknown");
        return match kind {
            MemberKind::Method => scan_all_classes(inferencer, name),
            _ => Vec::new(),
        };
    }
    member_on_classes(inferencer, &classes, name, kind)
}

/// Declarations of `name` on the class named in static position.
pub(crate) fn static_member(
    inferencer: &Inferencer<'_>,
    scope: ScopeRef<'_>,
    class: &Expr,
    name: &str,
    kind: MemberKind,
) -> Vec<Location> {
    match inferencer.class_of(class, scope) {
        Some(class) => member_on_classes(inferencer, &[class], name, kind),
        None if kind == MemberKind::Method => scan_all_classes(inferencer, name),
        None => Vec::new(),
    }
}

pub(crate) fn member_on_classes(
    inferencer: &Inferencer<'_>,
    classes: &[String],
    name: &str,
    kind: MemberKind,
) -> Vec<Location> {
    let symbols = inferencer.symbols;
    let mut out: Vec<Location> = Vec::new();
    for class in classes {
        let from = match kind {
            MemberKind::Method => find_method(symbols, class, name).and_then(|m| m.item.from.as_ref()),
            MemberKind::Property => {
                find_property(symbols, class, name).and_then(|p| p.item.from.as_ref())
            }
            MemberKind::Constant => {
                find_constant(symbols, class, name).and_then(|c| c.item.from.as_ref())
            }
        };
        if let Some(location) = from.and_then(location_of)
            && !out.contains(&location)
        {
            out.push(location);
        }
    }
    out
}

/// Every registered class-like declaring a method called `name`.
///
/// Inherited copies are not reported: the declaration itself is.
fn scan_all_classes(inferencer: &Inferencer<'_>, name: &str) -> Vec<Location> {
    let mut out: Vec<Location> = Vec::new();
    for class in inferencer.symbols.class_likes() {
        let Some(method) = class.method(name) else {
            continue;
        };
        if let Some(location) = method.from.as_ref().and_then(location_of)
            && !out.contains(&location)
        {
            out.push(location);
        }
    }
    debug!(name, found = out.len(), "scanned all classes for method");
    out
}
