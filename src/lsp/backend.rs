//! LSP backend for Elm completion
//!
//! Thin glue between `tower-lsp` and the completion engine:
//! - open documents are tracked as ropes so completion sees unsaved edits
//! - saves invalidate the module cache entry of the saved file
//! - manifest changes refresh the project resolver

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tower_lsp::Client;
use tower_lsp::lsp_types::MessageType;
use tracing::info;

use crate::lsp::features::completion::CompletionEngine;
use crate::parsers::elm_parser::TreeSitterElmParser;
use crate::project::fs::{DiskFileSystem, FileSystem};
use crate::project::resolver::ProjectResolver;

pub mod module_cache;

mod handlers;
mod manifest_watcher;
mod state;

pub use state::{BackendConfig, ElmBackend};

use module_cache::ModuleCache;

impl ElmBackend {
    /// Creates a backend reading from the real file system. Workspace roots are
    /// filled in by the `initialize` request.
    pub fn new(client: Client, config: BackendConfig) -> Self {
        let fs: Arc<dyn FileSystem> = Arc::new(DiskFileSystem::new());
        let resolver = Arc::new(ProjectResolver::new(fs.clone(), Vec::new(), config.loader.clone()));
        let cache = Arc::new(ModuleCache::new(fs, Arc::new(TreeSitterElmParser::new())));
        let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

        info!("Creating Elm backend with {:?}", config);

        Self {
            client,
            documents: Arc::new(DashMap::new()),
            engine: CompletionEngine::new(resolver, cache),
            manifest_watcher: Arc::new(Mutex::new(None)),
            shutdown_tx: Arc::new(shutdown_tx),
        }
    }

    pub fn engine(&self) -> &CompletionEngine {
        &self.engine
    }

    /// Reloads project definitions after a manifest change. Cached modules are
    /// dropped since dependency directories may have changed with the manifest.
    pub(super) async fn reload_projects(&self) {
        let projects = self.engine.resolver().refresh().await;
        self.engine.cache().clear();

        let roots: Vec<String> = projects.iter().map(|p| p.root().display().to_string()).collect();
        self.client
            .log_message(
                MessageType::INFO,
                format!("Reloaded {} Elm project(s): {}", projects.len(), roots.join(", ")),
            )
            .await;
    }

    #[allow(deprecated)]
    pub(super) fn roots_from_params(params: &tower_lsp::lsp_types::InitializeParams) -> Vec<PathBuf> {
        let from_folders: Vec<PathBuf> = params
            .workspace_folders
            .iter()
            .flatten()
            .filter_map(|folder| folder.uri.to_file_path().ok())
            .collect();
        if !from_folders.is_empty() {
            return from_folders;
        }

        params
            .root_uri
            .as_ref()
            .and_then(|uri| uri.to_file_path().ok())
            .into_iter()
            .collect()
    }
}
