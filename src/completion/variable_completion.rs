/// Variable name completion.
///
/// Offers the bindings visible from the scope at the cursor, inner scopes
/// shadowing outer ones, plus `$this` inside a method.
use tower_lsp::lsp_types::*;

use crate::scope::ScopeRef;

/// Maximum number of variable completions to return.
const MAX_VARIABLE_COMPLETIONS: usize = 100;

/// Variables whose name (without `$`) starts with `prefix`.
pub(crate) fn variable_completions(scope: ScopeRef<'_>, prefix: &str) -> Vec<CompletionItem> {
    let lower = prefix.to_ascii_lowercase();
    let mut items: Vec<CompletionItem> = Vec::new();

    if let Some(class) = scope.enclosing_class()
        && scope.enclosing_function().is_some()
        && "this".starts_with(&lower)
    {
        items.push(variable_item("$this", class.to_string()));
    }

    for (name, ty) in scope.visible_bindings() {
        let Some(bare) = name.strip_prefix('$') else {
            // Constants share the scope but are not variables.
            continue;
        };
        if bare == "this" || !bare.to_ascii_lowercase().starts_with(&lower) {
            continue;
        }
        items.push(variable_item(name, ty.to_string()));
        if items.len() >= MAX_VARIABLE_COMPLETIONS {
            break;
        }
    }
    items
}

fn variable_item(name: &str, detail: String) -> CompletionItem {
    CompletionItem {
        label: name.to_string(),
        kind: Some(CompletionItemKind::VARIABLE),
        detail: Some(detail),
        insert_text: Some(name.to_string()),
        filter_text: Some(name.to_string()),
        sort_text: Some(format!("0_{}", name.to_ascii_lowercase())),
        ..CompletionItem::default()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_lsp::lsp_types::Position;

    use super::*;
    use crate::infer::Inferencer;
    use crate::parser::parse_program;
    use crate::registry::SymbolTables;
    use crate::walker;

    fn labels_at(src: &str, line: u32, prefix: &str) -> Vec<String> {
        let parsed = parse_program("file:///vars.zy", src);
        let symbols = SymbolTables::default();
        let inferencer = Inferencer::new(&symbols, Arc::default());
        let output = walker::walk(&parsed.program, &inferencer, |_, _, _| true);
        let id = output.scopes.innermost_at(Position { line, character: 2 });
        variable_completions(output.scopes.scope_ref(id), prefix)
            .into_iter()
            .map(|i| i.label)
            .collect()
    }

    #[test]
    fn function_locals_do_not_leak_out() {
        let src = "<?php\n$top = 1;\nfunction f($arg) {\n  $local = 'x';\n  $local;\n}\n$top;\n";
        assert_eq!(labels_at(src, 4, ""), vec!["$arg", "$local", "$top"]);
        assert_eq!(labels_at(src, 6, ""), vec!["$top"]);
        assert_eq!(labels_at(src, 4, "lo"), vec!["$local"]);
    }

    #[test]
    fn this_is_offered_inside_methods() {
        let src = "<?php\nclass A {\n  function run() {\n    $n = 1;\n  }\n}\n";
        assert_eq!(labels_at(src, 3, ""), vec!["$this", "$n"]);
    }
}
