mod common;

use common::{create_test_backend, hover_text, open_document};
use tower_lsp::LanguageServer;
use tower_lsp::lsp_types::*;

#[tokio::test]
async fn test_hover_on_variable_shows_inferred_class() {
    let backend = create_test_backend();
    let text = "<?php\nclass User {}\n$u = new User();\n$u;\n";
    let uri = open_document(&backend, "file:///hover.zy", text).await;
    assert_eq!(
        hover_text(&backend, &uri, 3, 1).await.as_deref(),
        Some("```php\nUser $u\n```")
    );
}

#[tokio::test]
async fn test_hover_on_inherited_method_names_declaring_class() {
    let backend = create_test_backend();
    let text = "<?php\nclass Base {\n  public function save(): bool {}\n}\nclass User extends Base {}\n$u = new User();\n$u->save();\n";
    let uri = open_document(&backend, "file:///hover.zy", text).await;
    assert_eq!(
        hover_text(&backend, &uri, 6, 5).await.as_deref(),
        Some("```php\npublic function Base::save(): bool\n```")
    );
}

#[tokio::test]
async fn test_hover_on_keyword_shows_documentation() {
    let backend = create_test_backend();
    let text = "<?php\nforeach ([1] as $x) {}\n";
    let uri = open_document(&backend, "file:///kw.zy", text).await;
    let text = hover_text(&backend, &uri, 1, 2).await.expect("keyword hover");
    assert!(text.starts_with("**foreach** - "), "got {text}");
}

#[tokio::test]
async fn test_hover_on_nothing_is_none() {
    let backend = create_test_backend();
    let text = "<?php\n\n\n";
    let uri = open_document(&backend, "file:///empty.zy", text).await;
    assert!(hover_text(&backend, &uri, 1, 0).await.is_none());
}

#[tokio::test]
async fn test_document_symbols_outline() {
    let backend = create_test_backend();
    let text = concat!(
        "<?php\n",
        "namespace App;\n",
        "function boot(): void {}\n",
        "interface Named {}\n",
        "class User implements Named {\n",
        "  public string $name;\n",
        "  public function rename(string $to): void {}\n",
        "}\n",
    );
    let uri = open_document(&backend, "file:///outline.zy", text).await;

    let response = backend
        .document_symbol(DocumentSymbolParams {
            text_document: TextDocumentIdentifier { uri },
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
        })
        .await
        .unwrap();
    let Some(DocumentSymbolResponse::Nested(symbols)) = response else {
        panic!("expected nested symbols");
    };

    let top: Vec<(&str, SymbolKind)> = symbols.iter().map(|s| (s.name.as_str(), s.kind)).collect();
    assert_eq!(
        top,
        vec![
            ("boot", SymbolKind::FUNCTION),
            ("Named", SymbolKind::INTERFACE),
            ("User", SymbolKind::CLASS),
        ]
    );
    let children: Vec<&str> = symbols[2]
        .children
        .as_ref()
        .expect("class members")
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(children, vec!["$name", "rename"]);
}
