/// Go-to-definition support.
///
/// A request is answered in three steps:
///   1. [`crate::locate::find_node_at`] walks the document and returns the
///      smallest node under the cursor with the scope active there.
///   2. [`resolve::resolve`] dispatches on the node shape.
///   3. Every candidate declaration span is turned into an LSP `Location`.
///
/// Supported symbols:
///   - **Free functions**: `hello()`, with `use function` imports
///   - **Class-like types**: `new Foo()`, `Foo::bar()`, `#[Attr]`, bare names
///   - **Methods**: `$obj->method()`, chained `$a->b()->c()`, `Foo::make()`,
///     `self::`, `static::`, `parent::`
///   - **Properties and constants**: `$obj->prop`, `Foo::$prop`, `Foo::BAR`
///   - **`$this`, `self`, `static`, `parent`**: the class they denote
///
/// - [`resolve`]: node-kind dispatch and name lookups.
/// - [`member`]: member lookups on inferred receiver types, including the
///   registry-wide scan used when the receiver cannot be typed.
pub(crate) mod member;
pub(crate) mod resolve;

use tower_lsp::lsp_types::{Location, Position};
use tracing::debug;

use crate::Backend;
use crate::infer::Inferencer;
use crate::locate::find_node_at;

impl Backend {
    /// Handle a "go to definition" request.
    ///
    /// An empty result means nothing could be resolved; several results
    /// mean several declarations are equally plausible.
    pub fn resolve_definition(&self, uri: &str, position: Position) -> Vec<Location> {
        let Some(document) = self.document(uri) else {
            return Vec::new();
        };
        let symbols = self.registry.read();
        let inferencer = Inferencer::new(&symbols, document.names.clone());
        let Some(located) = find_node_at(&document.program, &inferencer, position) else {
            debug!(uri, line = position.line, "definition: no node at cursor");
            return Vec::new();
        };
        let locations = resolve::resolve(&located, &inferencer);
        debug!(
            uri,
            node = located.node.kind_name(),
            found = locations.len(),
            "definition resolved"
        );
        locations
    }
}
