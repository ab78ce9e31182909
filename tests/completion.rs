mod common;

use common::{completion_at, completion_labels, create_test_backend, open_document};
use tower_lsp::lsp_types::*;

const MODELS: &str = concat!(
    "<?php\n",
    "namespace App\\Models;\n",
    "\n",
    "class Base {\n",
    "  public function save(): bool {}\n",
    "  protected function touch() {}\n",
    "  private function secret() {}\n",
    "}\n",
    "class User extends Base {\n",
    "  const TABLE = 'users';\n",
    "  public string $name;\n",
    "  public static $cache;\n",
    "  public static function find(int $id): static {}\n",
    "  public function setName(string $name): static {}\n",
    "}\n",
    "interface Contract {}\n",
);

#[tokio::test]
async fn test_member_completion_filters_by_prefix() {
    let backend = create_test_backend();
    open_document(&backend, "file:///src/Models/User.zy", MODELS).await;
    let text = "<?php\nuse App\\Models\\User;\n$u = new User();\n$u->s;\n";
    let uri = open_document(&backend, "file:///src/main.zy", text).await;

    let labels = completion_labels(&backend, &uri, 3, 5).await;
    assert_eq!(labels, vec!["save", "setName"]);
}

#[tokio::test]
async fn test_member_completion_hides_private_and_static_members() {
    let backend = create_test_backend();
    open_document(&backend, "file:///src/Models/User.zy", MODELS).await;
    let text = "<?php\nuse App\\Models\\User;\n$u = new User();\n$u->x;\n";
    let uri = open_document(&backend, "file:///src/main.zy", text).await;

    // Empty prefix: complete right after `->`.
    let labels = completion_labels(&backend, &uri, 3, 4).await;
    assert_eq!(labels, vec!["name", "save", "setName", "touch"]);
}

#[tokio::test]
async fn test_member_completion_on_a_chain() {
    let backend = create_test_backend();
    open_document(&backend, "file:///src/Models/User.zy", MODELS).await;
    let text = "<?php\nuse App\\Models\\User;\nUser::find(1)->setName('x')->sa;\n";
    let uri = open_document(&backend, "file:///src/main.zy", text).await;

    let items = completion_at(&backend, &uri, 2, 31).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].label, "save");
    assert_eq!(items[0].kind, Some(CompletionItemKind::METHOD));
    assert_eq!(items[0].detail.as_deref(), Some("Base::save(): bool"));
}

#[tokio::test]
async fn test_member_completion_uses_the_type_before_a_reassignment() {
    let backend = create_test_backend();
    let text = concat!(
        "<?php\n",
        "class A { function onlyA() {} }\n",
        "class B { function onlyB() {} }\n",
        "$x = new A();\n",
        "$x->o;\n",
        "$x = new B();\n",
    );
    let uri = open_document(&backend, "file:///reassign.zy", text).await;

    assert_eq!(completion_labels(&backend, &uri, 4, 5).await, vec!["onlyA"]);
}

#[tokio::test]
async fn test_static_completion_lists_static_members_and_constants() {
    let backend = create_test_backend();
    open_document(&backend, "file:///src/Models/User.zy", MODELS).await;
    let text = "<?php\nuse App\\Models\\User;\nUser::x;\n";
    let uri = open_document(&backend, "file:///src/main.zy", text).await;

    let labels = completion_labels(&backend, &uri, 2, 6).await;
    assert_eq!(labels, vec!["$cache", "TABLE", "find"]);
}

#[tokio::test]
async fn test_new_completion_adds_use_statement() {
    let backend = create_test_backend();
    open_document(&backend, "file:///src/Models/User.zy", MODELS).await;
    let text = "<?php\nnamespace App\\Http;\n\n$x = new Us;\n";
    let uri = open_document(&backend, "file:///src/Http/Home.zy", text).await;

    let items = completion_at(&backend, &uri, 3, 11).await;
    let user = items
        .iter()
        .find(|item| item.label == "User")
        .expect("User should be offered");
    assert_eq!(user.detail.as_deref(), Some("App\\Models\\User"));
    let edits = user
        .additional_text_edits
        .as_ref()
        .expect("a use statement should be inserted");
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].new_text, "use App\\Models\\User;\n");
    assert_eq!(edits[0].range.start.line, 2);

    // Interfaces cannot be instantiated.
    assert!(items.iter().all(|item| item.label != "Contract"));
}

#[tokio::test]
async fn test_new_completion_skips_edit_when_already_imported() {
    let backend = create_test_backend();
    open_document(&backend, "file:///src/Models/User.zy", MODELS).await;
    let text = "<?php\nnamespace App\\Http;\nuse App\\Models\\User;\n$x = new Us;\n";
    let uri = open_document(&backend, "file:///src/Http/Home.zy", text).await;

    let items = completion_at(&backend, &uri, 3, 11).await;
    let user = items
        .iter()
        .find(|item| item.label == "User")
        .expect("User should be offered");
    assert!(user.additional_text_edits.is_none());
}

#[tokio::test]
async fn test_variable_completion_keeps_function_locals_inside() {
    let backend = create_test_backend();
    let text = concat!(
        "<?php\n",
        "$alpha = 1;\n",
        "function f($arg) {\n",
        "  $local = 2;\n",
        "  $a;\n",
        "}\n",
        "$a;\n",
    );
    let uri = open_document(&backend, "file:///vars.zy", text).await;

    assert_eq!(completion_labels(&backend, &uri, 4, 4).await, vec!["$alpha", "$arg"]);
    assert_eq!(completion_labels(&backend, &uri, 6, 2).await, vec!["$alpha"]);
}

#[tokio::test]
async fn test_variable_completion_skips_variables_assigned_later() {
    let backend = create_test_backend();
    let text = "<?php\n$first = 1;\n$f;\n$fresh = 2;\n";
    let uri = open_document(&backend, "file:///later.zy", text).await;

    assert_eq!(completion_labels(&backend, &uri, 2, 2).await, vec!["$first"]);
}

#[tokio::test]
async fn test_this_is_offered_inside_methods() {
    let backend = create_test_backend();
    let text = "<?php\nclass Box {\n  function open() {\n    $t;\n  }\n}\n";
    let uri = open_document(&backend, "file:///box.zy", text).await;

    let items = completion_at(&backend, &uri, 3, 6).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].label, "$this");
    assert_eq!(items[0].detail.as_deref(), Some("Box"));
}

#[tokio::test]
async fn test_keyword_completion() {
    let backend = create_test_backend();
    let text = "<?php\nfore;\n";
    let uri = open_document(&backend, "file:///kw.zy", text).await;

    let labels = completion_labels(&backend, &uri, 1, 4).await;
    assert_eq!(labels, vec!["foreach", "foreach …"]);
}

#[tokio::test]
async fn test_function_names_are_completed() {
    let backend = create_test_backend();
    let text = "<?php\nfunction render_page() {}\nrender_p;\n";
    let uri = open_document(&backend, "file:///fn.zy", text).await;

    let items = completion_at(&backend, &uri, 2, 8).await;
    let labels: Vec<&str> = items.iter().map(|item| item.label.as_str()).collect();
    assert_eq!(labels, vec!["render_page"]);
    assert_eq!(items[0].kind, Some(CompletionItemKind::FUNCTION));
}

#[tokio::test]
async fn test_unknown_receiver_yields_no_items() {
    let backend = create_test_backend();
    let text = "<?php\n$mystery->go;\n";
    let uri = open_document(&backend, "file:///none.zy", text).await;
    assert!(completion_at(&backend, &uri, 1, 12).await.is_empty());
}
