/// Origami language server.
///
/// The engine answers three queries for a `(document, position)` pair
/// (hover, definition, completion) from a process-wide symbol registry
/// and a per-request walk of the document's syntax tree.
///
/// - [`parser`] lowers source text into the owned tree of [`ast`].
/// - [`registry`] holds every class, interface and function of the
///   workspace, keyed by fully-qualified name.
/// - [`walker`] traverses a tree while maintaining the [`scope`] chain;
///   [`infer`] types expressions against it.
/// - [`locate`] finds the node under the cursor.
/// - [`definition`], [`completion`], [`hover`] and [`symbols`] answer the
///   editor's requests; [`server`] wires them to `tower-lsp`.
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tower_lsp::Client;
use tower_lsp::lsp_types::Diagnostic;
use tracing::debug;

pub mod ast;
pub mod completion;
pub mod config;
pub mod declarations;
pub mod definition;
pub mod diagnostics;
pub mod error;
pub mod hover;
pub mod infer;
pub mod inheritance;
pub mod locate;
pub mod parser;
pub mod position;
pub mod registry;
pub mod scope;
mod server;
pub mod symbols;
pub mod types;
pub mod util;
pub mod walker;
pub mod workspace;

use crate::ast::Program;
use crate::config::Config;
use crate::registry::SymbolRegistry;
use crate::types::NameContext;
use crate::workspace::IndexReport;

/// An open document and what was derived from its current text.
#[derive(Debug, Clone)]
pub struct Document {
    pub text: Arc<str>,
    pub program: Arc<Program>,
    pub names: Arc<NameContext>,
    /// Published on the last open/change.
    pub diagnostics: Vec<Diagnostic>,
}

pub struct Backend {
    name: String,
    version: String,
    pub(crate) registry: Arc<SymbolRegistry>,
    /// Open documents keyed by URI.
    documents: Arc<Mutex<HashMap<String, Document>>>,
    pub(crate) config: Arc<RwLock<Config>>,
    /// `--config` given on the command line.
    config_path: Option<PathBuf>,
    workspace_root: Arc<RwLock<Option<PathBuf>>>,
    client: Option<Client>,
}

impl Backend {
    fn with_client(client: Option<Client>) -> Self {
        Self {
            name: "origami-lsp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            registry: Arc::new(SymbolRegistry::new()),
            documents: Arc::new(Mutex::new(HashMap::new())),
            config: Arc::new(RwLock::new(Config::default())),
            config_path: None,
            workspace_root: Arc::new(RwLock::new(None)),
            client,
        }
    }

    pub fn new(client: Client) -> Self {
        Self::with_client(Some(client))
    }

    /// A backend without a client, for tests.
    pub fn new_test() -> Self {
        Self::with_client(None)
    }

    /// A test backend rooted at `root`, with the workspace config loaded.
    pub fn new_test_with_workspace(root: PathBuf) -> Self {
        let backend = Self::with_client(None);
        *backend.config.write() = Config::load_or_default(None, Some(&root));
        *backend.workspace_root.write() = Some(root);
        backend
    }

    /// Use `path` as the configuration file instead of searching for one.
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn registry(&self) -> &SymbolRegistry {
        &self.registry
    }

    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    pub fn workspace_root(&self) -> Option<PathBuf> {
        self.workspace_root.read().clone()
    }

    /// The open document at `uri`.
    pub fn document(&self, uri: &str) -> Option<Document> {
        self.documents.lock().get(uri).cloned()
    }

    /// Parse `text`, re-register the document's declarations and store it
    /// as the open version of `uri`.
    ///
    /// Returns the document's diagnostics.
    pub fn update_document(&self, uri: &str, text: &str) -> Vec<Diagnostic> {
        let parsed = parser::parse_program(uri, text);
        for unsupported in &parsed.unsupported {
            debug!(uri, "{unsupported}");
        }
        let mut diagnostics = diagnostics::parse_error_diagnostics(&parsed.parse_errors);

        // Stored before indexing, so a workspace scan racing this call sees
        // the document as open and leaves its declarations alone.
        let document = Document {
            text: Arc::from(text),
            names: Arc::new(declarations::name_context(&parsed.program)),
            program: Arc::clone(&parsed.program),
            diagnostics: diagnostics.clone(),
        };
        self.documents.lock().insert(uri.to_string(), document);

        let conflicts = self.registry.index_file(uri, &parsed.program);
        if !conflicts.is_empty() {
            diagnostics.extend(diagnostics::conflict_diagnostics(&conflicts));
            if let Some(document) = self.documents.lock().get_mut(uri) {
                document.diagnostics = diagnostics.clone();
            }
        }
        diagnostics
    }

    /// Forget the open text of `uri`.  Its declarations stay registered so
    /// other files keep resolving against them.
    pub fn close_document(&self, uri: &str) {
        self.documents.lock().remove(uri);
    }

    /// Index every source file under the workspace root, skipping open
    /// documents.
    pub fn index_workspace(&self) -> Option<IndexReport> {
        let root = self.workspace_root()?;
        let index = self.config.read().index.clone();
        let documents = Arc::clone(&self.documents);
        Some(workspace::index_workspace(&self.registry, &root, &index, |uri| {
            documents.lock().contains_key(uri)
        }))
    }
}
