/// Hover support.
///
/// The node under the cursor decides the content:
///
///   - variables, `$this` and parameters → their inferred type
///   - function calls, `new`, method calls, property and constant fetches
///     → the signature of the declaration they resolve to
///   - declarations → their own signature
///   - language keywords → a one-line description
///
/// Everything is rendered as Markdown with a `php` code block, which is
/// what editors highlight best for Origami's PHP-compatible syntax.
use tower_lsp::lsp_types::*;
use tracing::debug;

use crate::Backend;
use crate::ast::*;
use crate::completion::keywords::keyword_doc;
use crate::infer::Inferencer;
use crate::inheritance::{Inherited, find_constant, find_method, find_property};
use crate::locate::{Located, find_node_at};
use crate::position::to_range;
use crate::types::{ClassDef, ConstantDef, FunctionDef, MethodDef, PropertyDef, Types, format_signature};
use crate::util::word_at;

impl Backend {
    /// Handle a hover request.
    pub fn hover_at(&self, uri: &str, position: Position) -> Option<Hover> {
        let document = self.document(uri)?;
        let symbols = self.registry.read();
        let inferencer = Inferencer::new(&symbols, document.names.clone());
        let word = word_at(&document.text, position);

        let located = find_node_at(&document.program, &inferencer, position);
        let from_node = located.as_ref().and_then(|located| {
            let is_expr = matches!(located.node, NodeRef::Expr(_));
            let on_keyword = word.as_deref().and_then(keyword_doc).is_some();
            if !is_expr && on_keyword {
                return None;
            }
            hover_for(located, &inferencer).map(|text| (text, located.node.from().map(to_range)))
        });

        let (value, range) = match from_node {
            Some(found) => found,
            None => {
                let word = word?;
                let doc = keyword_doc(&word)?;
                (format!("**{word}** - {doc}"), None)
            }
        };
        debug!(uri, line = position.line, "hover");
        Some(Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value,
            }),
            range,
        })
    }
}

fn code(text: &str) -> String {
    format!("```php\n{text}\n```")
}

/// Markdown for the located node.
pub(crate) fn hover_for(located: &Located<'_>, inferencer: &Inferencer<'_>) -> Option<String> {
    let scope = located.scope();
    match located.node {
        NodeRef::Expr(expr) => match &expr.kind {
            ExprKind::Variable(name) => {
                let ty = located
                    .cached_type(expr.id)
                    .cloned()
                    .or_else(|| scope.get_variable_type(name).cloned())?;
                Some(code(&format!("{ty} {name}")))
            }
            ExprKind::This | ExprKind::SelfRef | ExprKind::StaticRef | ExprKind::ParentRef => {
                let class = inferencer.class_of(expr, scope)?;
                class_hover(inferencer.symbols.class_like(&class)?)
            }
            ExprKind::Name(name) => {
                let parent = located.parent().and_then(|p| p.as_expr());
                let is_callee = matches!(
                    parent.map(|p| &p.kind),
                    Some(ExprKind::Call { callee, .. }) if callee.id == expr.id
                );
                if is_callee {
                    return function_hover(inferencer, name);
                }
                named_class(inferencer, name)
                    .and_then(class_hover)
                    .or_else(|| function_hover(inferencer, name))
            }
            ExprKind::Call { callee, .. } => match &callee.kind {
                ExprKind::Name(name) => function_hover(inferencer, name),
                _ => None,
            },
            ExprKind::New { class, .. } => {
                let class = inferencer.class_of(class, scope)?;
                class_hover(inferencer.symbols.class_like(&class)?)
            }
            ExprKind::MethodCall { object, method, .. } => {
                let classes = inferencer.infer_class_names(object, scope);
                classes
                    .iter()
                    .find_map(|c| find_method(inferencer.symbols, c, method))
                    .map(|m| method_hover(&m))
            }
            ExprKind::StaticCall { class, method, .. } => {
                let class = inferencer.class_of(class, scope)?;
                find_method(inferencer.symbols, &class, method).map(|m| method_hover(&m))
            }
            ExprKind::PropertyFetch {
                object, property, ..
            } => {
                let classes = inferencer.infer_class_names(object, scope);
                classes
                    .iter()
                    .find_map(|c| find_property(inferencer.symbols, c, property))
                    .map(|p| property_hover(&p))
            }
            ExprKind::StaticPropertyFetch { class, property } => {
                let class = inferencer.class_of(class, scope)?;
                find_property(inferencer.symbols, &class, property).map(|p| property_hover(&p))
            }
            ExprKind::ClassConstFetch { class, constant } => {
                let class = inferencer.class_of(class, scope)?;
                if constant.eq_ignore_ascii_case("class") {
                    return Some(code(&format!("string {class}::class")));
                }
                find_constant(inferencer.symbols, &class, constant).map(|c| constant_hover(&c))
            }
            _ => {
                let ty = located.cached_type(expr.id).cloned().or_else(|| inferencer.infer(expr, scope))?;
                Some(code(&ty.to_string()))
            }
        },
        NodeRef::Param(param) => {
            let ty = scope.get_variable_type(&param.name).cloned();
            Some(code(&match (ty, &param.hint) {
                (Some(ty), _) => format!("{ty} {}", param.name),
                (None, Some(hint)) => format!("{hint} {}", param.name),
                (None, None) => param.name.clone(),
            }))
        }
        NodeRef::VarItem(item) => {
            let ty = scope.get_variable_type(&item.name).cloned().unwrap_or_else(Types::mixed);
            Some(code(&format!("{ty} {}", item.name)))
        }
        NodeRef::Stmt(stmt) => match &stmt.kind {
            StmtKind::Function(func) => {
                function_hover(inferencer, &format!("\\{}", inferencer.names.qualify(&func.name)))
            }
            StmtKind::Class(class) => {
                class_hover(inferencer.symbols.class_like(&inferencer.names.qualify(&class.name))?)
            }
            StmtKind::Interface(iface) => {
                class_hover(inferencer.symbols.class_like(&inferencer.names.qualify(&iface.name))?)
            }
            _ => None,
        },
        NodeRef::Member(member) => {
            let class = scope.enclosing_class()?;
            match &member.kind {
                MemberKind::Method(method) => {
                    find_method(inferencer.symbols, class, &method.name).map(|m| method_hover(&m))
                }
                MemberKind::Property(property) => {
                    find_property(inferencer.symbols, class, &property.name)
                        .map(|p| property_hover(&p))
                }
                _ => None,
            }
        }
        NodeRef::Annotation(annotation) => named_class(inferencer, &annotation.name).and_then(class_hover),
        NodeRef::Catch(catch) => catch
            .types
            .iter()
            .find_map(|t| named_class(inferencer, t))
            .and_then(class_hover),
        _ => None,
    }
}

fn named_class<'r>(inferencer: &Inferencer<'r>, name: &str) -> Option<&'r ClassDef> {
    let resolved = inferencer.names.resolve_class(name);
    inferencer
        .symbols
        .class_like(&resolved)
        .or_else(|| inferencer.symbols.class_like(name))
}

fn function_hover(inferencer: &Inferencer<'_>, name: &str) -> Option<String> {
    let resolved = inferencer.names.resolve_function(name);
    let func: &FunctionDef = inferencer
        .symbols
        .get_func(&resolved)
        .or_else(|| inferencer.symbols.get_func(name))?;
    let signature = format_signature(&func.name, &func.parameters, func.return_hint.as_deref());
    Some(code(&format!("function {signature}")))
}

fn class_hover(class: &ClassDef) -> Option<String> {
    let mut header = format!("{} {}", class.kind.keyword(), class.name);
    if let Some(parent) = &class.parent {
        header.push_str(&format!(" extends {parent}"));
    }
    if !class.interfaces.is_empty() {
        let keyword = if class.kind == ClassKind::Interface {
            "extends"
        } else {
            "implements"
        };
        header.push_str(&format!(" {keyword} {}", class.interfaces.join(", ")));
    }
    Some(code(&header))
}

fn method_hover(method: &Inherited<'_, MethodDef>) -> String {
    let m = method.item;
    let signature = format_signature(&m.name, &m.parameters, m.return_hint.as_deref());
    let modifiers = if m.is_static {
        format!("{} static", m.visibility.keyword())
    } else {
        m.visibility.keyword().to_string()
    };
    code(&format!("{modifiers} function {}::{signature}", method.declared_in.name))
}

fn property_hover(property: &Inherited<'_, PropertyDef>) -> String {
    let p = property.item;
    let hint = p
        .type_hint
        .clone()
        .or_else(|| p.ty.as_ref().map(|t| t.to_string()))
        .unwrap_or_else(|| "mixed".to_string());
    let sigil = if p.is_static { "::$" } else { "->" };
    code(&format!(
        "{} {hint} {}{sigil}{}",
        p.visibility.keyword(),
        property.declared_in.name,
        p.name
    ))
}

fn constant_hover(constant: &Inherited<'_, ConstantDef>) -> String {
    let c = constant.item;
    match &c.type_hint {
        Some(hint) => code(&format!("const {hint} {}::{}", constant.declared_in.name, c.name)),
        None => code(&format!("const {}::{}", constant.declared_in.name, c.name)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::parser::parse_program;
    use crate::registry::SymbolTables;

    const URI: &str = "file:///hover.zy";

    fn hover_text(src: &str, line: u32, character: u32) -> Option<String> {
        let parsed = parse_program(URI, src);
        let mut symbols = SymbolTables::default();
        symbols.index_file(URI, &parsed.program);
        let names = Arc::new(crate::declarations::name_context(&parsed.program));
        let inferencer = Inferencer::new(&symbols, names);
        let located = find_node_at(&parsed.program, &inferencer, Position { line, character })?;
        hover_for(&located, &inferencer)
    }

    #[test]
    fn variables_show_their_type() {
        let src = "<?php\nclass User {}\n$u = new User();\n$u;\n";
        assert_eq!(hover_text(src, 3, 1).as_deref(), Some("```php\nUser $u\n```"));
    }

    #[test]
    fn calls_show_the_signature() {
        let src = "<?php\nfunction greet(string $name, $times = 1): string { return ''; }\ngreet('a');\n";
        assert_eq!(
            hover_text(src, 2, 2).as_deref(),
            Some("```php\nfunction greet(string $name, $times = …): string\n```")
        );
    }

    #[test]
    fn methods_and_properties_name_the_declaring_class() {
        let src = "<?php\nclass Base {\n  protected ?int $id;\n  public function save(): bool {}\n}\nclass User extends Base {}\n$u = new User();\n$u->save();\n";
        assert_eq!(
            hover_text(src, 7, 5).as_deref(),
            Some("```php\npublic function Base::save(): bool\n```")
        );
    }

    #[test]
    fn classes_show_their_header() {
        let src = "<?php\ninterface Named {}\nclass Base {}\nclass User extends Base implements Named {}\nnew User();\n";
        assert_eq!(
            hover_text(src, 4, 5).as_deref(),
            Some("```php\nclass User extends Base implements Named\n```")
        );
    }
}
