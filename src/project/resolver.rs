//! Project resolution service
//!
//! Owns the list of [`ProjectDefinition`]s for the workspace. The list is
//! loaded lazily on first use and reloaded only when [`ProjectResolver::refresh`]
//! is called (the server does so whenever a manifest changes on disk).
//!
//! Module lookup walks the owning project's source directories first and then
//! each dependency's `src` directory, so a local module shadows a package
//! module with the same name.

use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, trace};

use super::fs::{FileSystem, GlobPattern};
use super::manifest::{self, ProjectDefinition};
use super::package_cache::LoaderConfig;
use crate::lsp::backend::module_cache::ModuleCache;
use crate::ir::elm_module::ParsedModule;

pub const ELM_EXTENSION: &str = "elm";

type ProjectList = Arc<Vec<Arc<ProjectDefinition>>>;

/// A module found on disk together with the file it came from.
#[derive(Debug, Clone)]
pub struct ResolvedModule {
    pub path: PathBuf,
    pub module: Arc<ParsedModule>,
}

pub struct ProjectResolver {
    fs: Arc<dyn FileSystem>,
    config: LoaderConfig,
    roots: RwLock<Vec<PathBuf>>,
    projects: RwLock<Option<ProjectList>>,
}

impl std::fmt::Debug for ProjectResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectResolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ProjectResolver {
    pub fn new(fs: Arc<dyn FileSystem>, roots: Vec<PathBuf>, config: LoaderConfig) -> Self {
        Self {
            fs,
            config,
            roots: RwLock::new(roots),
            projects: RwLock::new(None),
        }
    }

    /// Replaces the workspace roots. Takes effect on the next load or refresh.
    pub async fn set_roots(&self, roots: Vec<PathBuf>) {
        *self.roots.write().await = roots;
    }

    pub async fn roots(&self) -> Vec<PathBuf> {
        self.roots.read().await.clone()
    }

    /// Loads project definitions if they have not been loaded yet.
    pub async fn initialize(&self) -> ProjectList {
        if let Some(projects) = self.projects.read().await.as_ref() {
            return projects.clone();
        }

        let mut guard = self.projects.write().await;
        // Another caller may have loaded while we waited for the write lock.
        if let Some(projects) = guard.as_ref() {
            return projects.clone();
        }
        let projects = self.load().await;
        *guard = Some(projects.clone());
        projects
    }

    /// Discards the current project list and loads it again from disk.
    pub async fn refresh(&self) -> ProjectList {
        let projects = self.load().await;
        info!("Refreshed project definitions ({} project(s))", projects.len());
        *self.projects.write().await = Some(projects.clone());
        projects
    }

    async fn load(&self) -> ProjectList {
        let roots = self.roots().await;
        let projects = manifest::load_projects(self.fs.as_ref(), &roots, &self.config).await;
        Arc::new(projects.into_iter().map(Arc::new).collect())
    }

    /// The first project (in discovery order) with a source directory containing `path`.
    pub async fn project_for_path(&self, path: &Path) -> Option<Arc<ProjectDefinition>> {
        let projects = self.initialize().await;
        let project = projects.iter().find(|p| p.owns(path)).cloned();
        if project.is_none() {
            trace!("No project owns {:?}", path);
        }
        project
    }

    /// Every file that could hold `module_name` for `project`, in lookup order:
    /// local source directories, then each dependency's `src` directory.
    pub fn module_path_candidates(project: &ProjectDefinition, module_name: &str) -> Vec<PathBuf> {
        let relative = module_relative_path(module_name);

        project
            .source_directories
            .iter()
            .cloned()
            .chain(project.dependencies.iter().map(|d| d.source_dir()))
            .map(|dir| dir.join(&relative))
            .collect()
    }

    /// Resolves `module_name` as seen from the file at `contextual_path`.
    pub async fn module_by_name(
        &self,
        cache: &ModuleCache,
        contextual_path: &Path,
        module_name: &str,
    ) -> Option<ResolvedModule> {
        let project = self.project_for_path(contextual_path).await?;

        for candidate in Self::module_path_candidates(&project, module_name) {
            if let Some(module) = cache.get(&candidate).await {
                trace!("Resolved {} to {:?}", module_name, candidate);
                return Some(ResolvedModule { path: candidate, module });
            }
        }

        debug!("Module {} not found for {:?}", module_name, contextual_path);
        None
    }

    /// Module names defined in the project's local source directories, sorted.
    pub async fn workspace_modules(&self, project: &ProjectDefinition) -> Vec<String> {
        let pattern = GlobPattern::extension(ELM_EXTENSION).excluding(manifest::EXCLUDED_DIRS);
        let mut names = Vec::new();
        for dir in &project.source_directories {
            for file in self.fs.glob(std::slice::from_ref(dir), &pattern).await {
                if let Some(name) = module_name_for_path(dir, &file) {
                    names.push(name);
                }
            }
        }
        names.sort();
        names.dedup();
        names
    }
}

/// `Html.Attributes` -> `Html/Attributes.elm` (platform separator)
pub fn module_relative_path(module_name: &str) -> PathBuf {
    let mut relative = module_name.replace('.', &MAIN_SEPARATOR.to_string());
    relative.push('.');
    relative.push_str(ELM_EXTENSION);
    PathBuf::from(relative)
}

/// Inverse of [`module_relative_path`] for a file inside `source_dir`.
pub fn module_name_for_path(source_dir: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(source_dir).ok()?;
    if relative.extension().and_then(|e| e.to_str()) != Some(ELM_EXTENSION) {
        return None;
    }
    let segments = relative
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_str().map(str::to_string))
        .collect::<Option<Vec<String>>>()?;
    // Elm module segments are capitalized identifiers.
    if segments
        .iter()
        .all(|s| s.chars().next().is_some_and(char::is_uppercase))
    {
        Some(segments.join("."))
    } else {
        None
    }
}
