/// Workspace indexing.
///
/// Walks a directory with `ignore` (so `.gitignore` rules and hidden
/// directories are honoured), parses every source file with a configured
/// extension and registers its declarations.  Files already open in the
/// editor are skipped: their live text is indexed by the document sync
/// handlers instead.
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::{debug, info, warn};

use crate::config::IndexConfig;
use crate::error::RegistryError;
use crate::parser::parse_program;
use crate::registry::SymbolRegistry;
use crate::util::path_to_uri;

/// Outcome of a workspace scan.
#[derive(Debug, Default)]
pub struct IndexReport {
    pub files: usize,
    pub unreadable: Vec<PathBuf>,
    pub conflicts: Vec<RegistryError>,
}

/// Source files under `root`, sorted for a deterministic indexing order.
pub fn collect_source_files(root: &Path, config: &IndexConfig) -> Vec<PathBuf> {
    let exclude = config.exclude.clone();
    let mut paths: Vec<PathBuf> = WalkBuilder::new(root)
        .hidden(true)
        .filter_entry(move |entry| {
            let name = entry.file_name().to_string_lossy();
            !exclude.iter().any(|excluded| *excluded == name)
        })
        .build()
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();
            if path.is_file() && config.is_source_file(path) {
                return Some(path.to_path_buf());
            }
            None
        })
        .collect();
    paths.sort();
    paths
}

/// Parse and register every source file under `root`.
///
/// `skip` reports URIs that must not be touched (open documents).  It is
/// asked again under the registry's write guard right before a file is
/// registered, so it must not take that lock itself.
pub fn index_workspace(
    registry: &SymbolRegistry,
    root: &Path,
    config: &IndexConfig,
    skip: impl Fn(&str) -> bool,
) -> IndexReport {
    let mut report = IndexReport::default();
    for path in collect_source_files(root, config) {
        let Some(uri) = path_to_uri(&path) else {
            continue;
        };
        if skip(&uri) {
            debug!(uri, "skipping open document");
            continue;
        }
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %path.display(), "cannot read source file: {err}");
                report.unreadable.push(path);
                continue;
            }
        };
        let parsed = parse_program(&uri, &content);
        // The document may have been opened while the file was being read.
        match registry.index_file_unless(&uri, &parsed.program, &skip) {
            Some(conflicts) => {
                report.conflicts.extend(conflicts);
                report.files += 1;
            }
            None => debug!(uri, "document opened during scan"),
        }
    }
    info!(
        root = %root.display(),
        files = report.files,
        conflicts = report.conflicts.len(),
        "workspace indexed"
    );
    report
}
