/// Class and function name completion.
///
/// Class names are ranked by where they come from:
///
///   1. names imported with `use` in the current file
///   2. classes declared in files of the same directory
///   3. every other registered class
///
/// A namespaced class that is neither imported nor in the current
/// namespace carries an auto-import edit.
use std::collections::HashSet;

use tower_lsp::lsp_types::*;

use crate::ast::ClassKind;
use crate::error::SymbolKind;
use crate::registry::SymbolTables;
use crate::types::{ClassDef, NameContext, format_signature, short_name};
use crate::util::uri_dir;

use super::use_edit::build_use_edit;

/// Which class-likes a context accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClassFilter {
    /// `new X`: concrete classes only.
    Instantiable,
    /// Anywhere a type name may appear.
    Any,
}

/// The document a completion is computed for.
pub(crate) struct Origin<'a> {
    pub uri: &'a str,
    pub content: &'a str,
    pub names: &'a NameContext,
    pub auto_import: bool,
}

fn matches(name: &str, prefix: &str) -> bool {
    prefix.is_empty() || name.to_ascii_lowercase().contains(&prefix.to_ascii_lowercase())
}

fn accepts(class: &ClassDef, filter: ClassFilter) -> bool {
    match filter {
        ClassFilter::Instantiable => class.kind == ClassKind::Class,
        ClassFilter::Any => true,
    }
}

fn item_kind(kind: ClassKind) -> CompletionItemKind {
    match kind {
        ClassKind::Class | ClassKind::Trait => CompletionItemKind::CLASS,
        ClassKind::Interface => CompletionItemKind::INTERFACE,
        ClassKind::Enum => CompletionItemKind::ENUM,
    }
}

fn namespace_of(fqn: &str) -> Option<&str> {
    fqn.rsplit_once('\\').map(|(ns, _)| ns)
}

/// Class names matching `prefix` (case-insensitive substring).
pub(crate) fn class_completions(
    symbols: &SymbolTables,
    origin: &Origin<'_>,
    prefix: &str,
    filter: ClassFilter,
) -> Vec<CompletionItem> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut items = Vec::new();

    // 1. Imports.
    let mut imports: Vec<(&String, &String)> = origin.names.uses.iter().collect();
    imports.sort();
    for (alias, fqn) in imports {
        if !matches(alias, prefix) {
            continue;
        }
        let registered = symbols.class_like(fqn);
        if registered.is_some_and(|c| !accepts(c, filter)) {
            continue;
        }
        seen.insert(fqn.to_ascii_lowercase());
        items.push(CompletionItem {
            label: alias.clone(),
            kind: Some(registered.map_or(CompletionItemKind::CLASS, |c| item_kind(c.kind))),
            detail: Some(fqn.clone()),
            sort_text: Some(format!("0_{}", alias.to_ascii_lowercase())),
            ..CompletionItem::default()
        });
    }

    // 2 and 3. Same directory, then everything else.
    let here = uri_dir(origin.uri);
    let mut local = Vec::new();
    let mut global = Vec::new();
    for class in symbols.class_likes() {
        if !accepts(class, filter)
            || !matches(class.short_name(), prefix)
            || seen.contains(&class.name.to_ascii_lowercase())
        {
            continue;
        }
        let kind = match class.kind {
            ClassKind::Interface => SymbolKind::Interface,
            _ => SymbolKind::Class,
        };
        let same_dir = symbols
            .file_of(kind, &class.name)
            .and_then(uri_dir)
            .is_some_and(|dir| Some(dir) == here);
        if same_dir {
            local.push(class);
        } else {
            global.push(class);
        }
    }

    for (rank, group) in [(1, local), (2, global)] {
        for class in group {
            seen.insert(class.name.to_ascii_lowercase());
            items.push(class_item(class, origin, rank));
        }
    }
    items
}

fn class_item(class: &ClassDef, origin: &Origin<'_>, rank: u8) -> CompletionItem {
    let short = class.short_name();
    let current_ns = origin.names.namespace.as_deref().unwrap_or("");
    let same_namespace = namespace_of(&class.name).unwrap_or("") == current_ns;

    let mut additional_text_edits = None;
    let mut insert_text = None;
    if !same_namespace {
        if origin.auto_import {
            additional_text_edits = build_use_edit(origin.content, &class.name, false);
        }
        if additional_text_edits.is_none() && !class.name.contains('\\') {
            // A global class referenced from inside a namespace.
            insert_text = Some(format!("\\{short}"));
        } else if additional_text_edits.is_none() && !origin.auto_import {
            insert_text = Some(format!("\\{}", class.name));
        }
    }

    CompletionItem {
        label: short.to_string(),
        kind: Some(item_kind(class.kind)),
        detail: Some(class.name.clone()),
        insert_text,
        filter_text: Some(short.to_string()),
        sort_text: Some(format!("{rank}_{}", short.to_ascii_lowercase())),
        additional_text_edits,
        ..CompletionItem::default()
    }
}

/// Free functions whose short name starts with `prefix`.
pub(crate) fn function_completions(
    symbols: &SymbolTables,
    origin: &Origin<'_>,
    prefix: &str,
) -> Vec<CompletionItem> {
    let lower = prefix.to_ascii_lowercase();
    let current_ns = origin.names.namespace.as_deref().unwrap_or("");
    symbols
        .functions()
        .into_iter()
        .filter(|f| f.short_name().to_ascii_lowercase().starts_with(&lower))
        .map(|f| {
            let short = f.short_name();
            let imported = origin
                .names
                .function_uses
                .values()
                .any(|fqn| fqn.eq_ignore_ascii_case(&f.name));
            let foreign = namespace_of(&f.name).unwrap_or("") != current_ns;
            let additional_text_edits = if foreign && !imported && origin.auto_import {
                build_use_edit(origin.content, &f.name, true)
            } else {
                None
            };
            CompletionItem {
                label: short.to_string(),
                kind: Some(CompletionItemKind::FUNCTION),
                detail: Some(format!(
                    "function {}",
                    format_signature(&f.name, &f.parameters, f.return_hint.as_deref())
                )),
                insert_text: Some(if f.parameters.is_empty() {
                    format!("{short}()")
                } else {
                    format!("{short}($0)")
                }),
                insert_text_format: Some(InsertTextFormat::SNIPPET),
                filter_text: Some(short.to_string()),
                sort_text: Some(format!("3_{}", short_name(&f.name).to_ascii_lowercase())),
                additional_text_edits,
                ..CompletionItem::default()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declarations::name_context;
    use crate::parser::parse_program;

    fn index(symbols: &mut SymbolTables, uri: &str, src: &str) {
        let parsed = parse_program(uri, src);
        symbols.index_file(uri, &parsed.program);
    }

    fn setup() -> SymbolTables {
        let mut symbols = SymbolTables::default();
        index(
            &mut symbols,
            "file:///app/src/Models/User.zy",
            "<?php\nnamespace App\\Models;\nclass User {}\ninterface UserContract {}\n",
        );
        index(
            &mut symbols,
            "file:///app/src/Http/UserController.zy",
            "<?php\nnamespace App\\Http;\nclass UserController {}\n",
        );
        index(
            &mut symbols,
            "file:///app/lib/UserFactory.zy",
            "<?php\nnamespace Lib;\nclass UserFactory {}\n",
        );
        symbols
    }

    #[test]
    fn ranks_imports_then_same_directory_then_global() {
        let symbols = setup();
        let content = "<?php\nnamespace App\\Http;\nuse Lib\\UserFactory;\n$x = new User";
        let parsed = parse_program("file:///app/src/Http/Home.zy", content);
        let names = name_context(&parsed.program);
        let origin = Origin {
            uri: "file:///app/src/Http/Home.zy",
            content,
            names: &names,
            auto_import: true,
        };
        let items = class_completions(&symbols, &origin, "user", ClassFilter::Instantiable);
        let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["UserFactory", "UserController", "User"]);

        // Only the foreign, unimported class needs an edit.
        assert!(items[0].additional_text_edits.is_none());
        assert!(items[1].additional_text_edits.is_none());
        let edits = items[2].additional_text_edits.as_ref().expect("auto-import");
        assert_eq!(edits[0].new_text, "use App\\Models\\User;\n");
        assert_eq!(edits[0].range.start.line, 3);
        assert_eq!(items[2].detail.as_deref(), Some("App\\Models\\User"));
    }

    #[test]
    fn interfaces_are_not_instantiable() {
        let symbols = setup();
        let names = NameContext::default();
        let origin = Origin {
            uri: "file:///other/x.zy",
            content: "<?php\n",
            names: &names,
            auto_import: false,
        };
        let strict = class_completions(&symbols, &origin, "contract", ClassFilter::Instantiable);
        assert!(strict.is_empty());
        let any = class_completions(&symbols, &origin, "contract", ClassFilter::Any);
        assert_eq!(any.len(), 1);
        assert_eq!(any[0].insert_text.as_deref(), Some("\\App\\Models\\UserContract"));
    }
}
