//! Completion engine for Elm modules
//!
//! Given the editor buffer, its path and the cursor position, [`CompletionEngine::complete`]
//! classifies the request (see [`context`]) and assembles candidates from:
//! - the current module's own declarations
//! - the exposed surface of imported modules, resolved through the
//!   [`ProjectResolver`] and parsed through the [`ModuleCache`]
//!
//! Every failure (no project, unresolvable import, broken file) shrinks the
//! result instead of surfacing an error. Documentation for a candidate is looked
//! up separately and lazily via [`CompletionEngine::describe`].

pub mod context;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use ropey::Rope;
use tower_lsp::lsp_types::Position;
use tracing::debug;

use crate::ir::elm_module::{Import, ParsedModule};
use crate::ir::exposed_view::ExposedView;
use crate::lsp::backend::module_cache::ModuleCache;
use crate::project::resolver::{ProjectResolver, ResolvedModule};

pub use context::{CompletionContext, classify, determine_context};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateKind {
    Function,
    Constructor,
    Module,
}

/// One completion suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCandidate {
    pub label: String,
    pub kind: CandidateKind,
    /// Module that declares the item; for module-name candidates, the full module name
    pub module: String,
    /// Short one-line detail (type annotation, owning type, ...)
    pub detail: Option<String>,
}

impl CompletionCandidate {
    fn function(module: &str, name: &str, annotation: Option<&str>) -> Self {
        Self {
            label: name.to_string(),
            kind: CandidateKind::Function,
            module: module.to_string(),
            detail: annotation.map(str::to_string),
        }
    }

    fn constructor(module: &str, name: &str, type_name: &str) -> Self {
        Self {
            label: name.to_string(),
            kind: CandidateKind::Constructor,
            module: module.to_string(),
            detail: Some(type_name.to_string()),
        }
    }

    fn module_name(label: String, module: &str) -> Self {
        Self {
            label,
            kind: CandidateKind::Module,
            module: module.to_string(),
            detail: Some(format!("module {}", module)),
        }
    }
}

/// Documentation for a single item, fetched on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDocumentation {
    pub name: String,
    pub type_annotation: Option<String>,
    pub comment: Option<String>,
}

/// An import that resolved to a parsed module.
struct ResolvedImport<'i> {
    import: &'i Import,
    resolved: ResolvedModule,
}

impl ResolvedImport<'_> {
    fn view(&self) -> ExposedView<'_> {
        ExposedView::new(&self.resolved.module)
    }
}

/// Stateless engine; all persistent state lives in the resolver and cache.
#[derive(Debug, Clone)]
pub struct CompletionEngine {
    resolver: Arc<ProjectResolver>,
    cache: Arc<ModuleCache>,
}

impl CompletionEngine {
    pub fn new(resolver: Arc<ProjectResolver>, cache: Arc<ModuleCache>) -> Self {
        Self { resolver, cache }
    }

    pub fn resolver(&self) -> &Arc<ProjectResolver> {
        &self.resolver
    }

    pub fn cache(&self) -> &Arc<ModuleCache> {
        &self.cache
    }

    /// Completion candidates for the cursor at `position` in `document_text`,
    /// the current (possibly unsaved) contents of `file_path`.
    ///
    /// Order: own declarations, imported functions, imported constructors,
    /// then module-name or member completions, each in import order.
    pub async fn complete(
        &self,
        document_text: &str,
        file_path: &Path,
        position: &Position,
    ) -> Vec<CompletionCandidate> {
        let rope = Rope::from_str(document_text);
        let Some(context) = determine_context(&rope, position) else {
            return Vec::new();
        };

        // The buffer is assumed newer than whatever was cached for this file.
        self.cache.invalidate(file_path);
        let Some(current) = self.cache.get_with_source(file_path, document_text) else {
            debug!("Current file {:?} does not parse; no completions", file_path);
            return Vec::new();
        };

        debug!("Completion context at {:?}: {:?}", position, context);
        match context {
            CompletionContext::Function { text } => self.function_candidates(&current, file_path, &text).await,
            CompletionContext::Module { prefix, .. } => self.module_candidates(&current, file_path, &prefix).await,
            CompletionContext::Import { partial } => self.import_candidates(&current, file_path, &partial).await,
        }
    }

    async fn resolve_imports<'m>(
        &self,
        imports: impl Iterator<Item = &'m Import>,
        file_path: &Path,
    ) -> Vec<ResolvedImport<'m>> {
        let mut resolved = Vec::new();
        for import in imports {
            match self.resolver.module_by_name(&self.cache, file_path, &import.module).await {
                Some(module) => resolved.push(ResolvedImport { import, resolved: module }),
                None => debug!("Dropping unresolved import {}", import.module),
            }
        }
        resolved
    }

    async fn function_candidates(
        &self,
        current: &ParsedModule,
        file_path: &Path,
        text: &str,
    ) -> Vec<CompletionCandidate> {
        let mut candidates: Vec<CompletionCandidate> = current
            .function_declarations
            .iter()
            .map(|f| CompletionCandidate::function(&current.name, &f.name, f.type_annotation.as_deref()))
            .collect();

        let imports = current
            .imports
            .iter()
            .filter(|import| qualifier_matching(import, text).is_some());
        let resolved = self.resolve_imports(imports, file_path).await;

        for entry in &resolved {
            candidates.extend(entry.view().functions().map(|f| {
                CompletionCandidate::function(&entry.import.module, &f.name, f.type_annotation.as_deref())
            }));
        }
        for entry in &resolved {
            candidates.extend(
                entry
                    .view()
                    .constructors()
                    .map(|(ty, ctor)| CompletionCandidate::constructor(&entry.import.module, ctor, &ty.name)),
            );
        }

        candidates
    }

    async fn module_candidates(
        &self,
        current: &ParsedModule,
        file_path: &Path,
        prefix: &str,
    ) -> Vec<CompletionCandidate> {
        let imports = current
            .imports
            .iter()
            .filter(|import| qualifier_matching(import, prefix).is_some());
        let resolved = self.resolve_imports(imports, file_path).await;

        let mut candidates = Vec::new();
        let mut seen_modules = HashSet::new();

        for entry in &resolved {
            let Some(qualifier) = qualifier_matching(entry.import, prefix) else {
                continue;
            };
            let remaining = remaining_segments(qualifier, prefix);

            if remaining.is_empty() {
                // `Module.` offers the module's members.
                let view = entry.view();
                candidates.extend(view.functions().map(|f| {
                    CompletionCandidate::function(&entry.import.module, &f.name, f.type_annotation.as_deref())
                }));
                candidates.extend(
                    view.constructors()
                        .map(|(ty, ctor)| CompletionCandidate::constructor(&entry.import.module, ctor, &ty.name)),
                );
            } else {
                let label = remaining.join(".");
                if seen_modules.insert(label.clone()) {
                    candidates.push(CompletionCandidate::module_name(label, &entry.import.module));
                }
            }
        }

        // A bare capitalized word may also be a constructor used as a value.
        if prefix.is_empty() {
            for entry in &resolved {
                candidates.extend(
                    entry
                        .view()
                        .constructors()
                        .map(|(ty, ctor)| CompletionCandidate::constructor(&entry.import.module, ctor, &ty.name)),
                );
            }
        }

        candidates
    }

    async fn import_candidates(
        &self,
        current: &ParsedModule,
        file_path: &Path,
        partial: &str,
    ) -> Vec<CompletionCandidate> {
        let Some(project) = self.resolver.project_for_path(file_path).await else {
            return Vec::new();
        };
        self.resolver
            .workspace_modules(&project)
            .await
            .into_iter()
            .filter(|name| *name != current.name && name.starts_with(partial))
            .map(|name| CompletionCandidate::module_name(name.clone(), &name))
            .collect()
    }

    /// Looks up documentation for `item_name` declared in `module_name`, as
    /// seen from `contextual_path`.
    pub async fn describe(
        &self,
        contextual_path: &Path,
        module_name: &str,
        item_name: &str,
    ) -> Option<ItemDocumentation> {
        let resolved = self
            .resolver
            .module_by_name(&self.cache, contextual_path, module_name)
            .await?;
        let module = &resolved.module;

        if let Some(function) = module.function(item_name) {
            return Some(ItemDocumentation {
                name: function.name.clone(),
                type_annotation: function.type_annotation.clone(),
                comment: function.comment.clone(),
            });
        }
        if let Some(custom_type) = module.custom_type(item_name) {
            return Some(ItemDocumentation {
                name: custom_type.name.clone(),
                type_annotation: None,
                comment: custom_type.comment.clone(),
            });
        }
        if let Some(owner) = module.type_of_constructor(item_name) {
            return Some(ItemDocumentation {
                name: item_name.to_string(),
                type_annotation: Some(owner.name.clone()),
                comment: owner.comment.clone(),
            });
        }
        if let Some(alias) = module.type_alias(item_name) {
            return Some(ItemDocumentation {
                name: alias.name.clone(),
                type_annotation: None,
                comment: alias.comment.clone(),
            });
        }

        debug!("{} not declared in {}", item_name, module_name);
        None
    }
}

/// The name under which `import` is referenced that starts with `prefix`:
/// the alias when it matches, otherwise the full module name.
fn qualifier_matching<'i>(import: &'i Import, prefix: &str) -> Option<&'i str> {
    import
        .alias
        .as_deref()
        .filter(|alias| alias.starts_with(prefix))
        .or_else(|| Some(import.module.as_str()).filter(|m| m.starts_with(prefix)))
}

/// Segments of `qualifier` left after removing the leading segments already
/// typed in `prefix`.
fn remaining_segments<'q>(qualifier: &'q str, prefix: &str) -> Vec<&'q str> {
    let typed: Vec<&str> = if prefix.is_empty() { Vec::new() } else { prefix.split('.').collect() };
    let segments: Vec<&str> = qualifier.split('.').collect();
    let common = segments
        .iter()
        .zip(typed.iter())
        .take_while(|(a, b)| a == b)
        .count();
    segments[common..].to_vec()
}
