//! Error types.
//!
//! Only two situations are errors in this crate: source constructs the
//! frontend cannot model, and symbol registrations that clash with a
//! declaration owned by another file.  "Nothing found" is always an empty
//! result instead.
use std::path::PathBuf;

use thiserror::Error;

use crate::ast::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolKind {
    Class,
    Interface,
    Function,
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Function => "function",
        })
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// A source construct the engine has no node shape for.
    #[error("unsupported {what}{}", at(.from))]
    Unsupported { what: String, from: Option<Span> },
}

fn at(from: &Option<Span>) -> String {
    match from {
        Some(from) => format!(" at {from}"),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{kind} `{name}` is already defined in {existing}; ignoring the declaration in {incoming}")]
    NamingConflict {
        kind: SymbolKind,
        name: String,
        existing: String,
        incoming: String,
        /// Span of the rejected declaration.
        from: Option<Span>,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration in {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
}
