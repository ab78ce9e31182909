/// `use` import lowering.
///
/// Handles the four import forms:
///
///   - `use Foo\Bar, Baz\Qux as Q;`
///   - `use function Foo\bar;` / `use const Foo\BAR;`
///   - `use function Foo\{bar, baz};`
///   - `use Foo\{Bar, function baz, const QUX};`
use mago_syntax::ast::*;

use super::Lowering;
use crate::ast;

macro_rules! use_kind {
    ($t:expr) => {
        if $t.is_function() {
            ast::UseKind::Function
        } else if $t.is_const() {
            ast::UseKind::Const
        } else {
            ast::UseKind::Class
        }
    };
}

impl<'s> Lowering<'s> {
    pub(crate) fn use_items(&mut self, items: &UseItems<'_>) -> Vec<ast::UseItem> {
        let mut out = Vec::new();
        match items {
            UseItems::Sequence(seq) => {
                for item in seq.items.iter() {
                    out.push(use_item(item, None, ast::UseKind::Class));
                }
            }
            UseItems::TypedSequence(seq) => {
                let kind = use_kind!(seq.r#type);
                for item in seq.items.iter() {
                    out.push(use_item(item, None, kind));
                }
            }
            UseItems::TypedList(list) => {
                let kind = use_kind!(list.r#type);
                let prefix = list.namespace.value();
                for item in list.items.iter() {
                    out.push(use_item(item, Some(prefix), kind));
                }
            }
            UseItems::MixedList(list) => {
                let prefix = list.namespace.value();
                for maybe_typed in list.items.iter() {
                    let kind = match &maybe_typed.r#type {
                        Some(t) => use_kind!(t),
                        None => ast::UseKind::Class,
                    };
                    out.push(use_item(&maybe_typed.item, Some(prefix), kind));
                }
            }
        }
        out
    }
}

/// With a group prefix the item name is relative to it: `use Foo\{Bar}`
/// imports `Foo\Bar`.
fn use_item(item: &UseItem<'_>, group_prefix: Option<&str>, kind: ast::UseKind) -> ast::UseItem {
    let item_name = item.name.value().trim_start_matches('\\');
    let name = match group_prefix {
        Some(prefix) => format!("{}\\{}", prefix.trim_start_matches('\\'), item_name),
        None => item_name.to_string(),
    };
    ast::UseItem {
        kind,
        name,
        alias: item
            .alias
            .as_ref()
            .map(|alias| alias.identifier.value.to_string()),
    }
}
