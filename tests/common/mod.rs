#![allow(dead_code)]

use origami_lsp::Backend;
use std::fs;
use tower_lsp::LanguageServer;
use tower_lsp::lsp_types::*;

pub fn create_test_backend() -> Backend {
    Backend::new_test()
}

/// Helper: create a temp workspace holding `files`, then return a Backend
/// rooted there with the workspace configuration loaded.
pub fn create_workspace(files: &[(&str, &str)]) -> (Backend, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    for (rel_path, content) in files {
        let full = dir.path().join(rel_path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("failed to create dirs");
        }
        fs::write(&full, content).expect("failed to write source file");
    }
    let backend = Backend::new_test_with_workspace(dir.path().to_path_buf());
    (backend, dir)
}

/// URI of a file inside a temp workspace.
pub fn workspace_uri(dir: &tempfile::TempDir, rel_path: &str) -> Url {
    Url::from_file_path(dir.path().join(rel_path)).expect("absolute path")
}

pub async fn open_document(backend: &Backend, uri: &str, text: &str) -> Url {
    let uri = Url::parse(uri).expect("valid uri");
    backend
        .did_open(DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: uri.clone(),
                language_id: "origami".to_string(),
                version: 1,
                text: text.to_string(),
            },
        })
        .await;
    uri
}

pub async fn change_document(backend: &Backend, uri: &Url, version: i32, text: &str) {
    backend
        .did_change(DidChangeTextDocumentParams {
            text_document: VersionedTextDocumentIdentifier {
                uri: uri.clone(),
                version,
            },
            content_changes: vec![TextDocumentContentChangeEvent {
                range: None,
                range_length: None,
                text: text.to_string(),
            }],
        })
        .await;
}

pub async fn close_document(backend: &Backend, uri: &Url) {
    backend
        .did_close(DidCloseTextDocumentParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
        })
        .await;
}

fn position_params(uri: &Url, line: u32, character: u32) -> TextDocumentPositionParams {
    TextDocumentPositionParams {
        text_document: TextDocumentIdentifier { uri: uri.clone() },
        position: Position { line, character },
    }
}

/// Every location a definition request returns, flattened.
pub async fn definition_at(backend: &Backend, uri: &Url, line: u32, character: u32) -> Vec<Location> {
    let result = backend
        .goto_definition(GotoDefinitionParams {
            text_document_position_params: position_params(uri, line, character),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
        })
        .await
        .expect("definition request");
    match result {
        None => Vec::new(),
        Some(GotoDefinitionResponse::Scalar(location)) => vec![location],
        Some(GotoDefinitionResponse::Array(locations)) => locations,
        Some(GotoDefinitionResponse::Link(links)) => links
            .into_iter()
            .map(|link| Location {
                uri: link.target_uri,
                range: link.target_range,
            })
            .collect(),
    }
}

/// Start lines of the definition targets, sorted.
pub async fn definition_lines(backend: &Backend, uri: &Url, line: u32, character: u32) -> Vec<u32> {
    let mut lines: Vec<u32> = definition_at(backend, uri, line, character)
        .await
        .into_iter()
        .map(|l| l.range.start.line)
        .collect();
    lines.sort();
    lines
}

pub async fn completion_at(backend: &Backend, uri: &Url, line: u32, character: u32) -> Vec<CompletionItem> {
    let result = backend
        .completion(CompletionParams {
            text_document_position: position_params(uri, line, character),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
            context: None,
        })
        .await
        .expect("completion request");
    match result {
        None => Vec::new(),
        Some(CompletionResponse::Array(items)) => items,
        Some(CompletionResponse::List(list)) => list.items,
    }
}

/// Completion labels, sorted.
pub async fn completion_labels(backend: &Backend, uri: &Url, line: u32, character: u32) -> Vec<String> {
    let mut labels: Vec<String> = completion_at(backend, uri, line, character)
        .await
        .into_iter()
        .map(|item| item.label)
        .collect();
    labels.sort();
    labels
}

/// Markdown text of the hover at the given position.
pub async fn hover_text(backend: &Backend, uri: &Url, line: u32, character: u32) -> Option<String> {
    let hover = backend
        .hover(HoverParams {
            text_document_position_params: position_params(uri, line, character),
            work_done_progress_params: WorkDoneProgressParams::default(),
        })
        .await
        .expect("hover request")?;
    match hover.contents {
        HoverContents::Markup(markup) => Some(markup.value),
        HoverContents::Scalar(MarkedString::String(text)) => Some(text),
        HoverContents::Scalar(MarkedString::LanguageString(code)) => Some(code.value),
        HoverContents::Array(parts) => Some(
            parts
                .into_iter()
                .map(|part| match part {
                    MarkedString::String(text) => text,
                    MarkedString::LanguageString(code) => code.value,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        ),
    }
}
