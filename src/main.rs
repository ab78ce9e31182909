use std::path::PathBuf;

use clap::Parser;
use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

use origami_lsp::Backend;
use origami_lsp::config::Config;
use origami_lsp::error::SymbolKind;
use origami_lsp::registry::SymbolRegistry;
use origami_lsp::workspace;

/// Language server for the Origami scripting language.
#[derive(Debug, Parser)]
#[command(name = "origami-lsp", version, about)]
struct Cli {
    /// Tracing filter, e.g. `info` or `origami_lsp=debug`.  `RUST_LOG`
    /// takes precedence.
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,

    /// Configuration file to use instead of the default lookup.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Index a directory, print every registered symbol and exit.
    #[arg(long, value_name = "DIR")]
    index: Option<PathBuf>,

    /// With `--index`, print one JSON object per symbol.
    #[arg(long, requires = "index")]
    json: bool,
}

fn init_tracing(cli: &Cli, config: &Config) {
    let fallback = cli
        .log_level
        .clone()
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| "warn".to_string());
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    // stdout carries the protocol.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn print_index(root: &std::path::Path, config: &Config, json: bool) -> std::process::ExitCode {
    let registry = SymbolRegistry::new();
    let report = workspace::index_workspace(&registry, root, &config.index, |_| false);
    for (key, (file, from)) in registry.snapshot() {
        let line = from.map(|f| f.start_line).unwrap_or(0);
        let kind = key.kind.to_string();
        let name = match key.kind {
            SymbolKind::Function => registry.get_func(&key.name).map(|f| f.name),
            SymbolKind::Class => registry.get_class(&key.name).map(|c| c.name),
            SymbolKind::Interface => registry.get_interface(&key.name).map(|c| c.name),
        }
        .unwrap_or(key.name);
        if json {
            let entry = serde_json::json!({ "kind": kind, "name": name, "uri": file, "line": line });
            println!("{entry}");
        } else {
            println!("{kind} {name} {file}:{line}");
        }
    }
    for conflict in &report.conflicts {
        if json {
            let entry = serde_json::json!({ "kind": "conflict", "message": conflict.to_string() });
            println!("{entry}");
        } else {
            println!("conflict: {conflict}");
        }
    }
    for path in &report.unreadable {
        eprintln!("unreadable: {}", path.display());
    }
    std::process::ExitCode::SUCCESS
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let workspace = cli.index.clone().or_else(|| std::env::current_dir().ok());
    let config = Config::load_or_default(cli.config.as_deref(), workspace.as_deref());
    init_tracing(&cli, &config);

    if let Some(root) = &cli.index {
        return print_index(root, &config, cli.json);
    }

    let config_path = cli.config.clone();
    let (service, socket) =
        LspService::new(|client| Backend::new(client).with_config_path(config_path));
    Server::new(tokio::io::stdin(), tokio::io::stdout(), socket)
        .serve(service)
        .await;
    std::process::ExitCode::SUCCESS
}
