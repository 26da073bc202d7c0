//! LSP protocol handler implementations
//!
//! - Lifecycle (initialize, initialized, shutdown)
//! - Document lifecycle (did_open, did_change, did_save, did_close)
//! - Watched files (manifest refresh, module cache invalidation)
//! - Completion and completion-item resolve

use serde::{Deserialize, Serialize};
use tower_lsp::jsonrpc::Result as LspResult;
use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionOptions, CompletionParams, CompletionResponse,
    DidChangeTextDocumentParams, DidChangeWatchedFilesParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, DidSaveTextDocumentParams, Documentation, InitializeParams,
    InitializeResult, InitializedParams, MarkupContent, MarkupKind, ServerCapabilities, ServerInfo,
    TextDocumentSyncCapability, TextDocumentSyncKind, TextDocumentSyncOptions, TextDocumentSyncSaveOptions,
};
use tower_lsp::{LanguageServer, jsonrpc};
use tracing::{debug, info, warn};

use ropey::Rope;

use super::manifest_watcher::is_manifest;
use super::state::ElmBackend;
use crate::lsp::features::completion::{CandidateKind, CompletionCandidate, ItemDocumentation};

/// Payload stored on completion items so `completionItem/resolve` can find
/// the declaration again.
#[derive(Debug, Serialize, Deserialize)]
struct ResolveData {
    path: std::path::PathBuf,
    module: String,
}

fn to_completion_item(candidate: CompletionCandidate, data: &ResolveData) -> CompletionItem {
    let kind = match candidate.kind {
        CandidateKind::Function => CompletionItemKind::FUNCTION,
        CandidateKind::Constructor => CompletionItemKind::ENUM_MEMBER,
        CandidateKind::Module => CompletionItemKind::MODULE,
    };
    let data = match candidate.kind {
        CandidateKind::Module => None,
        _ => serde_json::to_value(ResolveData {
            path: data.path.clone(),
            module: candidate.module.clone(),
        })
        .ok(),
    };

    CompletionItem {
        label: candidate.label,
        kind: Some(kind),
        detail: candidate.detail,
        data,
        ..Default::default()
    }
}

fn documentation_markdown(doc: &ItemDocumentation, module: &str) -> String {
    let mut markdown = String::new();
    match &doc.type_annotation {
        Some(annotation) => markdown.push_str(&format!("```elm\n{} : {}\n```\n", doc.name, annotation)),
        None => markdown.push_str(&format!("```elm\n{}\n```\n", doc.name)),
    }
    markdown.push_str(&format!("*{}*", module));
    if let Some(comment) = &doc.comment {
        markdown.push_str("\n\n");
        markdown.push_str(comment);
    }
    markdown
}

#[tower_lsp::async_trait]
impl LanguageServer for ElmBackend {
    async fn initialize(&self, params: InitializeParams) -> jsonrpc::Result<InitializeResult> {
        info!("Received initialize from {:?}", params.client_info.as_ref().map(|c| &c.name));

        let roots = Self::roots_from_params(&params);
        if roots.is_empty() {
            warn!("No workspace root provided; completion will only see open files");
        } else {
            info!("Workspace roots: {:?}", roots);
            self.spawn_manifest_watcher(&roots);
        }
        self.engine.resolver().set_roots(roots).await;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
                    open_close: Some(true),
                    change: Some(TextDocumentSyncKind::FULL),
                    save: Some(TextDocumentSyncSaveOptions::Supported(true)),
                    ..Default::default()
                })),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![".".to_string()]),
                    resolve_provider: Some(true),
                    ..Default::default()
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("Initialized");
    }

    async fn shutdown(&self) -> LspResult<()> {
        info!("Received shutdown request");
        let _ = self.shutdown_tx.send(());
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        debug!("Opening document: URI={}", params.text_document.uri);
        self.documents
            .insert(params.text_document.uri, Rope::from_str(&params.text_document.text));
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // Full sync: the last change carries the whole text.
        if let Some(change) = params.content_changes.into_iter().last() {
            self.documents
                .insert(params.text_document.uri, Rope::from_str(&change.text));
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        debug!("textDocument/didSave: {}", params.text_document.uri);
        if let Ok(path) = params.text_document.uri.to_file_path() {
            self.engine.cache().invalidate(&path);
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        debug!("textDocument/didClose: {}", params.text_document.uri);
        self.documents.remove(&params.text_document.uri);
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        let mut manifest_changed = false;
        for change in params.changes {
            let Ok(path) = change.uri.to_file_path() else {
                continue;
            };
            if is_manifest(&path) {
                manifest_changed = true;
            } else {
                self.engine.cache().invalidate(&path);
            }
        }
        if manifest_changed {
            self.reload_projects().await;
        }
    }

    async fn completion(&self, params: CompletionParams) -> LspResult<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let Ok(path) = uri.to_file_path() else {
            debug!("Completion for non-file URI {}", uri);
            return Ok(None);
        };
        let Some(text) = self.documents.get(&uri).map(|doc| doc.value().to_string()) else {
            debug!("Document not found: {}", uri);
            return Ok(None);
        };

        let candidates = self.engine.complete(&text, &path, &position).await;
        debug!("Completion at {}:{:?} produced {} candidate(s)", uri, position, candidates.len());

        let data = ResolveData { path, module: String::new() };
        let items: Vec<CompletionItem> = candidates
            .into_iter()
            .map(|candidate| to_completion_item(candidate, &data))
            .collect();
        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn completion_resolve(&self, mut item: CompletionItem) -> LspResult<CompletionItem> {
        let Some(data) = item
            .data
            .clone()
            .and_then(|value| serde_json::from_value::<ResolveData>(value).ok())
        else {
            return Ok(item);
        };

        if let Some(doc) = self.engine.describe(&data.path, &data.module, &item.label).await {
            if item.detail.is_none() {
                item.detail = doc.type_annotation.clone();
            }
            item.documentation = Some(Documentation::MarkupContent(MarkupContent {
                kind: MarkupKind::Markdown,
                value: documentation_markdown(&doc, &data.module),
            }));
        }
        Ok(item)
    }
}
