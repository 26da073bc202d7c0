//! Backend state management
//!
//! This module defines the ElmBackend struct, which holds the open editor
//! buffers, the completion engine (with its project resolver and module cache)
//! and the manifest watcher.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use notify::RecommendedWatcher;
use ropey::Rope;
use tower_lsp::Client;
use tower_lsp::lsp_types::Url;

use crate::lsp::features::completion::CompletionEngine;

/// Configuration the server is started with.
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    pub loader: crate::project::package_cache::LoaderConfig,
}

/// The Elm language server backend.
#[derive(Clone)]
pub struct ElmBackend {
    pub(super) client: Client,
    /// Text of every open document (full sync)
    pub(super) documents: Arc<DashMap<Url, Rope>>,
    pub(super) engine: CompletionEngine,
    pub(super) manifest_watcher: Arc<Mutex<Option<RecommendedWatcher>>>,
    pub(super) shutdown_tx: Arc<tokio::sync::broadcast::Sender<()>>,
}

impl std::fmt::Debug for ElmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElmBackend")
            .field("documents_count", &self.documents.len())
            .field("engine", &self.engine)
            .finish()
    }
}
