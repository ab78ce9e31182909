/// Keyword and snippet tables.
///
/// Keywords double as hover documentation: [`keyword_doc`] is what the
/// hover provider shows when the cursor sits on a language keyword.
use tower_lsp::lsp_types::*;

/// `(keyword, one-line documentation)`.
pub(crate) const KEYWORDS: &[(&str, &str)] = &[
    ("abstract", "Declares a class or method that must be extended or implemented."),
    ("break", "Ends execution of the current `for`, `foreach`, `while`, `do` or `switch`."),
    ("case", "A branch of a `switch` statement."),
    ("catch", "Handles an exception thrown inside the preceding `try` block."),
    ("class", "Declares a class."),
    ("clone", "Creates a shallow copy of an object."),
    ("const", "Declares a constant."),
    ("continue", "Skips to the next iteration of the enclosing loop."),
    ("default", "The fallback branch of a `switch` or `match`."),
    ("do", "A loop whose condition is checked after each iteration."),
    ("echo", "Outputs one or more expressions."),
    ("else", "The branch taken when the `if` condition is false."),
    ("elseif", "An additional conditional branch of an `if` statement."),
    ("enum", "Declares an enumeration."),
    ("extends", "Names the parent class or the extended interfaces."),
    ("false", "The boolean false value."),
    ("final", "Prevents a class from being extended or a method from being overridden."),
    ("finally", "Runs after `try`/`catch` whether or not an exception was thrown."),
    ("fn", "Declares an arrow function that captures the enclosing scope by value."),
    ("for", "A loop with initialiser, condition and step expressions."),
    ("foreach", "Iterates over the elements of an array or traversable object."),
    ("function", "Declares a function or closure."),
    ("global", "Imports a variable from the global scope."),
    ("if", "Executes a block when its condition is true."),
    ("implements", "Names the interfaces a class implements."),
    ("instanceof", "Checks whether an object is an instance of a class."),
    ("interface", "Declares an interface."),
    ("match", "Evaluates to the arm whose condition strictly equals the subject."),
    ("namespace", "Declares the namespace of the file."),
    ("new", "Creates an instance of a class."),
    ("null", "The null value."),
    ("parent", "Refers to the parent class."),
    ("private", "Visible only inside the declaring class."),
    ("protected", "Visible inside the declaring class and its descendants."),
    ("public", "Visible everywhere."),
    ("return", "Returns a value from the current function."),
    ("self", "Refers to the class in which it is written."),
    ("static", "Declares a class-level member, or refers to the called class."),
    ("switch", "Selects a branch by loose comparison against each `case`."),
    ("throw", "Throws an exception."),
    ("trait", "Declares a trait whose members are copied into using classes."),
    ("true", "The boolean true value."),
    ("try", "Runs a block whose exceptions are handled by `catch`."),
    ("use", "Imports a name, or copies a trait into a class."),
    ("var", "Declares a variable."),
    ("while", "A loop whose condition is checked before each iteration."),
    ("yield", "Produces a value from a generator."),
];

/// `(trigger, label, snippet body)`.
const SNIPPETS: &[(&str, &str, &str)] = &[
    ("func", "function", "function ${1:name}(${2}) {\n\t$0\n}"),
    ("class", "class", "class ${1:Name} {\n\t$0\n}"),
    ("if", "if", "if (${1:condition}) {\n\t$0\n}"),
    ("foreach", "foreach", "foreach (${1:\\$items} as ${2:\\$item}) {\n\t$0\n}"),
    ("while", "while", "while (${1:condition}) {\n\t$0\n}"),
    ("for", "for", "for (${1:\\$i} = 0; ${1:\\$i} < ${2:count}; ${1:\\$i}++) {\n\t$0\n}"),
    ("switch", "switch", "switch (${1:\\$value}) {\n\tcase ${2:value}:\n\t\t$0\n\t\tbreak;\n}"),
];

pub(crate) fn keyword_doc(word: &str) -> Option<&'static str> {
    KEYWORDS
        .iter()
        .find(|(keyword, _)| keyword.eq_ignore_ascii_case(word))
        .map(|(_, doc)| *doc)
}

/// Keywords and snippets starting with `prefix`.
pub(crate) fn keyword_completions(prefix: &str) -> Vec<CompletionItem> {
    let lower = prefix.to_ascii_lowercase();
    let mut items: Vec<CompletionItem> = KEYWORDS
        .iter()
        .filter(|(keyword, _)| keyword.starts_with(&lower))
        .map(|(keyword, doc)| CompletionItem {
            label: keyword.to_string(),
            kind: Some(CompletionItemKind::KEYWORD),
            detail: Some(doc.to_string()),
            sort_text: Some(format!("5_{keyword}")),
            ..CompletionItem::default()
        })
        .collect();

    items.extend(
        SNIPPETS
            .iter()
            .filter(|(trigger, _, _)| trigger.starts_with(&lower))
            .map(|(trigger, label, body)| CompletionItem {
                label: format!("{label} …"),
                kind: Some(CompletionItemKind::SNIPPET),
                detail: Some(format!("{label} block")),
                insert_text: Some(body.to_string()),
                insert_text_format: Some(InsertTextFormat::SNIPPET),
                filter_text: Some(trigger.to_string()),
                sort_text: Some(format!("6_{trigger}")),
                ..CompletionItem::default()
            }),
    );
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_filters_keywords_and_snippets() {
        let labels: Vec<String> = keyword_completions("fore")
            .into_iter()
            .map(|i| i.label)
            .collect();
        assert_eq!(labels, vec!["foreach".to_string(), "foreach …".to_string()]);
    }

    #[test]
    fn docs_are_case_insensitive() {
        assert!(keyword_doc("Foreach").is_some());
        assert!(keyword_doc("hello").is_none());
    }
}
