mod common;

use common::{create_test_backend, definition_at, definition_lines, open_document};

#[tokio::test]
async fn test_function_call_resolves_to_declaration_not_statement() {
    let backend = create_test_backend();
    let text = "<?php\nfunction hello() { return \"hi\"; }\necho hello();\n";
    let uri = open_document(&backend, "file:///hello.zy", text).await;

    let locations = definition_at(&backend, &uri, 2, 6).await;
    assert_eq!(locations.len(), 1, "expected exactly one target");
    let location = &locations[0];
    assert_eq!(location.uri, uri);
    assert_eq!(location.range.start.line, 1);
    assert_eq!(location.range.start.character, 0);
    assert_eq!(location.range.end.line, 1);
}

#[tokio::test]
async fn test_chained_method_call_follows_return_types() {
    let backend = create_test_backend();
    let text = concat!(
        "<?php\n",
        "class Query {\n",
        "  function where(): Query {}\n",
        "  function first(): Row {}\n",
        "}\n",
        "class Row {\n",
        "  function save(): bool {}\n",
        "}\n",
        "$q = new Query();\n",
        "$q->where()->first()->save();\n",
    );
    let uri = open_document(&backend, "file:///chain.zy", text).await;

    // `where`
    assert_eq!(definition_lines(&backend, &uri, 9, 5).await, vec![2]);
    // `first`
    assert_eq!(definition_lines(&backend, &uri, 9, 14).await, vec![3]);
    // `save`
    assert_eq!(definition_lines(&backend, &uri, 9, 23).await, vec![6]);
}

#[tokio::test]
async fn test_definition_across_open_documents() {
    let backend = create_test_backend();
    let model = "<?php\nnamespace App\\Models;\n\nclass User {\n  public function greet(): string {}\n}\n";
    let model_uri = open_document(&backend, "file:///src/Models/User.zy", model).await;

    let consumer = "<?php\nuse App\\Models\\User;\n\n$u = new User();\n$u->greet();\n";
    let uri = open_document(&backend, "file:///src/main.zy", consumer).await;

    let class = definition_at(&backend, &uri, 3, 10).await;
    assert_eq!(class.len(), 1);
    assert_eq!(class[0].uri, model_uri);
    assert_eq!(class[0].range.start.line, 3);

    let method = definition_at(&backend, &uri, 4, 5).await;
    assert_eq!(method.len(), 1);
    assert_eq!(method[0].uri, model_uri);
    assert_eq!(method[0].range.start.line, 4);
}

#[tokio::test]
async fn test_qualified_class_name_does_not_match_another_namespace() {
    let backend = create_test_backend();
    let other = "<?php\nnamespace Other;\nclass Thing {}\n";
    let other_uri = open_document(&backend, "file:///src/Other/Thing.zy", other).await;

    let text = "<?php\n$t = new \\Missing\\Thing();\n$u = new Thing();\n";
    let uri = open_document(&backend, "file:///src/main.zy", text).await;

    // `\Missing\Thing` names a class nobody declares.
    assert!(definition_at(&backend, &uri, 1, 20).await.is_empty());
    assert!(definition_at(&backend, &uri, 1, 6).await.is_empty());

    // A bare `Thing` still finds the only class with that short name.
    let found = definition_at(&backend, &uri, 2, 11).await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].uri, other_uri);
    assert_eq!(found[0].range.start.line, 2);
}

#[tokio::test]
async fn test_this_and_parent_resolve_to_classes() {
    let backend = create_test_backend();
    let text = concat!(
        "<?php\n",
        "class Base {\n",
        "  function boot() {}\n",
        "}\n",
        "class App extends Base {\n",
        "  function boot() {\n",
        "    parent::boot();\n",
        "    $this->boot();\n",
        "  }\n",
        "}\n",
    );
    let uri = open_document(&backend, "file:///this.zy", text).await;

    // `parent::boot()` lands on the parent's method.
    assert_eq!(definition_lines(&backend, &uri, 6, 14).await, vec![2]);
    // `$this->boot()` lands on the override.
    assert_eq!(definition_lines(&backend, &uri, 7, 12).await, vec![5]);
}

#[tokio::test]
async fn test_unknown_receiver_offers_every_candidate() {
    let backend = create_test_backend();
    let text = concat!(
        "<?php\n",
        "class Cat {\n",
        "  function speak() {}\n",
        "}\n",
        "class Dog {\n",
        "  function speak() {}\n",
        "}\n",
        "function talk($pet) { $pet->speak(); }\n",
    );
    let uri = open_document(&backend, "file:///pets.zy", text).await;
    assert_eq!(definition_lines(&backend, &uri, 7, 30).await, vec![2, 5]);
}

#[tokio::test]
async fn test_unresolvable_position_returns_nothing() {
    let backend = create_test_backend();
    let text = "<?php\n$x = 1;\n";
    let uri = open_document(&backend, "file:///plain.zy", text).await;
    assert!(definition_at(&backend, &uri, 1, 5).await.is_empty());
}

#[tokio::test]
async fn test_definition_for_unknown_document_is_empty() {
    let backend = create_test_backend();
    let uri = tower_lsp::lsp_types::Url::parse("file:///never-opened.zy").unwrap();
    assert!(definition_at(&backend, &uri, 0, 0).await.is_empty());
}
