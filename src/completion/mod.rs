/// Completion support.
///
/// This sub-module groups all completion logic:
/// - **context**: classifying the text left of the cursor
/// - **member**: members after `->`, `?->`, `.` and `::`
/// - **class_completion**: class names (`new` context) and free functions
/// - **variable_completion**: variables visible at the cursor
/// - **keywords**: keyword and snippet tables
/// - **use_edit**: `use` statement insertion for auto-import
pub mod context;
pub(crate) mod class_completion;
pub(crate) mod keywords;
pub(crate) mod member;
pub(crate) mod use_edit;
pub(crate) mod variable_completion;

use tower_lsp::lsp_types::*;
use tracing::debug;

use crate::Backend;
use crate::infer::Inferencer;
use crate::locate;
use crate::util::line_prefix;

use class_completion::{ClassFilter, Origin, class_completions, function_completions};
use context::CompletionContext;

impl Backend {
    /// Handle a completion request.
    ///
    /// Every request walks the document once to build the scope tree the
    /// providers read bindings from, as it stood just before the cursor.
    /// An unknown document or an unresolvable receiver yields an empty list.
    pub fn completion_items(&self, uri: &str, position: Position) -> Vec<CompletionItem> {
        let Some(document) = self.document(uri) else {
            return Vec::new();
        };
        let settings = self.config.read().completion.clone();
        let line = line_prefix(&document.text, position);
        let context = context::classify(&line);
        debug!(uri, ?context, "completion context");

        let symbols = self.registry.read();
        let inferencer = Inferencer::new(&symbols, document.names.clone());
        let (scopes, scope_id) = locate::scope_at(&document.program, &inferencer, position);
        let scope = scopes.scope_ref(scope_id);

        let origin = Origin {
            uri,
            content: &document.text,
            names: &document.names,
            auto_import: settings.auto_import,
        };

        let items = match &context {
            CompletionContext::Member { subject, prefix } => {
                member::instance_completions(&inferencer, scope, subject, prefix)
            }
            CompletionContext::Static { class, prefix } => {
                member::static_completions(&inferencer, scope, class, prefix)
            }
            CompletionContext::Variable { prefix } => {
                variable_completion::variable_completions(scope, prefix)
            }
            CompletionContext::New { prefix } => {
                class_completions(&symbols, &origin, prefix, ClassFilter::Instantiable)
            }
            CompletionContext::Keyword { prefix } => {
                let mut items = Vec::new();
                if settings.keywords {
                    items.extend(keywords::keyword_completions(prefix));
                }
                items.extend(function_completions(&symbols, &origin, prefix));
                items.extend(class_completions(&symbols, &origin, prefix, ClassFilter::Any));
                items
            }
            CompletionContext::Default => {
                let mut items = variable_completion::variable_completions(scope, "");
                if settings.keywords {
                    items.extend(keywords::keyword_completions(""));
                }
                items
            }
        };
        debug!(uri, count = items.len(), "completion items");
        items
    }
}
