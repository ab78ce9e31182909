/// LSP server trait implementation.
///
/// This module contains the `impl LanguageServer for Backend` block,
/// which handles the protocol messages (initialize, didOpen, didChange,
/// didClose, definition, completion, hover, documentSymbol) and turns
/// them into calls on the engine.
use std::sync::Arc;

use tower_lsp::LanguageServer;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tracing::{info, warn};

use crate::Backend;
use crate::config::Config;
use crate::workspace;

impl Backend {
    async fn publish(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>) {
        if let Some(client) = &self.client {
            client.publish_diagnostics(uri, diagnostics, version).await;
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        #[allow(deprecated)]
        let workspace_root = params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .map(|folder| &folder.uri)
            .or(params.root_uri.as_ref())
            .and_then(|uri| uri.to_file_path().ok());

        *self.config.write() =
            Config::load_or_default(self.config_path.as_deref(), workspace_root.as_deref());
        *self.workspace_root.write() = workspace_root;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: Some(vec![
                        "$".to_string(),
                        ">".to_string(),
                        ":".to_string(),
                        ".".to_string(),
                    ]),
                    ..CompletionOptions::default()
                }),
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                definition_provider: Some(OneOf::Left(true)),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                document_symbol_provider: Some(OneOf::Left(true)),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: self.name.clone(),
                version: Some(self.version.clone()),
            }),
            offset_encoding: None,
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let config = self.config();
        let root = self.workspace_root();

        let Some(root) = root.filter(|_| config.index.scan_workspace) else {
            self.log(MessageType::INFO, format!("{} initialized", self.name))
                .await;
            return;
        };

        let registry = Arc::clone(&self.registry);
        let documents = Arc::clone(&self.documents);
        let index = config.index.clone();
        let scan_root = root.clone();
        let report = tokio::task::spawn_blocking(move || {
            workspace::index_workspace(&registry, &scan_root, &index, |uri| {
                documents.lock().contains_key(uri)
            })
        })
        .await;

        match report {
            Ok(report) => {
                info!(files = report.files, "workspace scan finished");
                self.log(
                    MessageType::INFO,
                    format!(
                        "{} initialized: indexed {} file(s) under {}, {} naming conflict(s)",
                        self.name,
                        report.files,
                        root.display(),
                        report.conflicts.len()
                    ),
                )
                .await;
            }
            Err(err) => {
                warn!("workspace scan failed: {err}");
                self.log(MessageType::ERROR, format!("workspace scan failed: {err}"))
                    .await;
            }
        }
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        let diagnostics = self.update_document(doc.uri.as_str(), &doc.text);
        self.publish(doc.uri.clone(), diagnostics, Some(doc.version))
            .await;
        self.log(MessageType::INFO, format!("Opened file: {}", doc.uri))
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // Full sync: the last change carries the whole text.
        let Some(change) = params.content_changes.last() else {
            return;
        };
        let uri = params.text_document.uri;
        let diagnostics = self.update_document(uri.as_str(), &change.text);
        self.publish(uri, diagnostics, Some(params.text_document.version))
            .await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.close_document(uri.as_str());
        self.publish(uri.clone(), Vec::new(), None).await;
        self.log(MessageType::INFO, format!("Closed file: {uri}"))
            .await;
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let mut locations = self.resolve_definition(uri.as_str(), position);
        Ok(match locations.len() {
            0 => None,
            1 => locations.pop().map(GotoDefinitionResponse::Scalar),
            _ => Some(GotoDefinitionResponse::Array(locations)),
        })
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let items = self.completion_items(uri.as_str(), position);
        if items.is_empty() {
            return Ok(None);
        }
        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        Ok(self.hover_at(uri.as_str(), position))
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let symbols = self.document_symbols(params.text_document.uri.as_str());
        Ok(Some(DocumentSymbolResponse::Nested(symbols)))
    }
}
