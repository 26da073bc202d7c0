use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tower_lsp::{LspService, Server};
use tracing::info;

use elm_completion_server::logging::init_logger;
use elm_completion_server::lsp::backend::{BackendConfig, ElmBackend};
use elm_completion_server::project::LoaderConfig;

#[derive(Parser, Debug)]
#[command(
    name = "elm-completion-server",
    version,
    about = "Language server offering completion for Elm projects"
)]
struct Args {
    /// Log level for stderr (overrides RUST_LOG), e.g. "debug" or "elm_completion_server=trace"
    #[arg(long)]
    log_level: Option<String>,

    /// Disable ANSI colors in stderr logs
    #[arg(long)]
    no_color: bool,

    /// Do not write a session log file to the user cache directory
    #[arg(long)]
    no_file_logging: bool,

    /// Root of the Elm package cache (defaults to $ELM_HOME, then ~/.elm)
    #[arg(long, value_name = "DIR")]
    elm_home: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let _guard = init_logger(args.no_color, args.log_level.as_deref(), !args.no_file_logging)
        .context("failed to initialize logging")?;

    let loader = match args.elm_home {
        Some(root) => LoaderConfig::with_package_root(root),
        None => LoaderConfig::from_env(),
    };
    info!(
        "Starting {} {} (package root: {:?})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        loader.package_root()
    );

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let config = BackendConfig { loader };
    let (service, socket) = LspService::new(|client| ElmBackend::new(client, config.clone()));

    Server::new(stdin, stdout, socket).serve(service).await;

    info!("Server stopped");
    Ok(())
}
