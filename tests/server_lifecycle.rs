mod common;

use common::{create_test_backend, create_workspace, definition_at, open_document, workspace_uri};
use tower_lsp::LanguageServer;
use tower_lsp::lsp_types::*;

#[tokio::test]
async fn test_initialize_server_info() {
    let backend = create_test_backend();
    let result = backend.initialize(InitializeParams::default()).await.unwrap();

    let server_info = result.server_info.expect("server_info should be present");
    assert_eq!(server_info.name, "origami-lsp");
    assert_eq!(server_info.version.as_deref(), Some(env!("CARGO_PKG_VERSION")));
}

#[tokio::test]
async fn test_initialize_capabilities() {
    let backend = create_test_backend();
    let caps = backend
        .initialize(InitializeParams::default())
        .await
        .unwrap()
        .capabilities;

    let completion = caps.completion_provider.expect("completion provider");
    let triggers = completion.trigger_characters.expect("trigger characters");
    for trigger in ["$", ">", ":", "."] {
        assert!(triggers.iter().any(|t| t == trigger), "missing trigger {trigger}");
    }
    assert_eq!(caps.definition_provider, Some(OneOf::Left(true)));
    assert_eq!(caps.hover_provider, Some(HoverProviderCapability::Simple(true)));
    assert_eq!(caps.document_symbol_provider, Some(OneOf::Left(true)));
    assert_eq!(
        caps.text_document_sync,
        Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL))
    );
}

#[tokio::test]
async fn test_shutdown_succeeds() {
    let backend = create_test_backend();
    backend.initialize(InitializeParams::default()).await.unwrap();
    assert!(backend.shutdown().await.is_ok());
}

#[tokio::test]
async fn test_initialize_reads_workspace_config() {
    let (backend, dir) = create_workspace(&[(
        ".origami-lsp.toml",
        "[completion]\nkeywords = false\n",
    )]);
    let root = Url::from_file_path(dir.path()).expect("absolute path");
    #[allow(deprecated)]
    let params = InitializeParams {
        root_uri: Some(root),
        ..InitializeParams::default()
    };
    backend.initialize(params).await.unwrap();

    assert!(!backend.config().completion.keywords);
    assert_eq!(backend.workspace_root().as_deref(), Some(dir.path()));
}

#[tokio::test]
async fn test_initialized_scans_the_workspace() {
    let (backend, dir) = create_workspace(&[
        (
            "src/Models/User.zy",
            "<?php\nnamespace App\\Models;\n\nclass User {\n  public function save() {}\n}\n",
        ),
        ("src/helpers.php", "<?php\nfunction money() {}\n"),
        ("vendor/pkg/Ignored.zy", "<?php\nclass Ignored {}\n"),
        ("README.md", "class NotCode {}\n"),
    ]);
    backend.initialized(InitializedParams {}).await;

    let registry = backend.registry();
    assert!(registry.get_class("App\\Models\\User").is_some());
    assert!(registry.get_func("money").is_some());
    assert!(registry.get_class("Ignored").is_none());
    assert!(registry.get_class("NotCode").is_none());

    // Unopened files still serve as definition targets.
    let main = "<?php\nuse App\\Models\\User;\n(new User())->save();\n";
    let uri = open_document(&backend, "file:///elsewhere/main.zy", main).await;
    let locations = definition_at(&backend, &uri, 2, 16).await;
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].uri, workspace_uri(&dir, "src/Models/User.zy"));
    assert_eq!(locations[0].range.start.line, 4);
}

#[tokio::test]
async fn test_index_workspace_skips_open_documents() {
    let (backend, dir) = create_workspace(&[("lib.zy", "<?php\nclass OnDisk {}\n")]);
    let uri = workspace_uri(&dir, "lib.zy");
    open_document(&backend, uri.as_str(), "<?php\nclass InEditor {}\n").await;

    let report = backend.index_workspace().expect("workspace root is set");
    assert_eq!(report.files, 0);
    assert!(backend.registry().get_class("InEditor").is_some());
    assert!(backend.registry().get_class("OnDisk").is_none());
}

#[tokio::test]
async fn test_scan_can_be_disabled() {
    let (backend, _dir) = create_workspace(&[
        (".origami-lsp.toml", "[index]\nscan_workspace = false\n"),
        ("a.zy", "<?php\nclass Skipped {}\n"),
    ]);
    backend.initialized(InitializedParams {}).await;
    assert!(backend.registry().get_class("Skipped").is_none());
}
