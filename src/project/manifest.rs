//! Manifest discovery and project definitions
//!
//! Finds `elm.json` (and legacy `elm-package.json`) files under the workspace
//! roots and turns each into a [`ProjectDefinition`]. A manifest that cannot be
//! read or parsed is dropped without affecting the others.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use super::fs::{FileSystem, FsError, GlobPattern};
use super::package_cache::{LoaderConfig, compiler_version, lower_bound, package_path};

pub const ELM_JSON: &str = "elm.json";
pub const LEGACY_ELM_PACKAGE_JSON: &str = "elm-package.json";

/// Directories that hold downloaded dependencies and are never searched for manifests.
pub const EXCLUDED_DIRS: [&str; 2] = ["elm-stuff", "node_modules"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectType {
    Application,
    Package,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub version: String,
    /// Root of the installed package; may not exist on disk
    pub package_path: PathBuf,
}

impl Dependency {
    /// Directory holding the package's modules.
    pub fn source_dir(&self) -> PathBuf {
        self.package_path.join("src")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDefinition {
    pub manifest_path: PathBuf,
    pub project_type: ProjectType,
    pub elm_version: String,
    /// Absolute, lexically normalized source directories in manifest order
    pub source_directories: Vec<PathBuf>,
    pub dependencies: Vec<Dependency>,
}

impl ProjectDefinition {
    pub fn root(&self) -> &Path {
        self.manifest_path.parent().unwrap_or(Path::new("/"))
    }

    /// True when `path` lies inside one of the source directories. Comparison
    /// is per path component, so `src` does not own `src-extra/Main.elm`.
    pub fn owns(&self, path: &Path) -> bool {
        self.source_directories.iter().any(|dir| path.starts_with(dir))
    }
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error(transparent)]
    Read(#[from] FsError),

    #[error("invalid manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("manifest {path} is missing {field}")]
    MissingField { path: PathBuf, field: &'static str },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ElmJson {
    Application(ApplicationManifest),
    Package(PackageManifest),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ApplicationManifest {
    elm_version: String,
    source_directories: Vec<String>,
    dependencies: ApplicationDependencies,
}

#[derive(Debug, Deserialize)]
struct ApplicationDependencies {
    direct: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct PackageManifest {
    elm_version: String,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct LegacyManifest {
    elm_version: Option<String>,
    source_directories: Vec<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

/// Discovers and parses every manifest under `roots`.
///
/// Never fails: unreadable or malformed manifests are logged at debug level
/// and skipped. Results follow glob order.
pub async fn load_projects(
    fs: &dyn FileSystem,
    roots: &[PathBuf],
    config: &LoaderConfig,
) -> Vec<ProjectDefinition> {
    let pattern = GlobPattern::file_names([ELM_JSON, LEGACY_ELM_PACKAGE_JSON]).excluding(EXCLUDED_DIRS);
    let manifests = fs.glob(roots, &pattern).await;
    debug!("Found {} manifest(s) under {:?}", manifests.len(), roots);

    let mut projects = Vec::with_capacity(manifests.len());
    for manifest in manifests {
        match load_project(fs, &manifest, config).await {
            Ok(project) => projects.push(project),
            Err(e) => debug!("Skipping project: {}", e),
        }
    }

    info!("Loaded {} Elm project(s)", projects.len());
    projects
}

/// Reads and parses a single manifest.
pub async fn load_project(
    fs: &dyn FileSystem,
    manifest_path: &Path,
    config: &LoaderConfig,
) -> Result<ProjectDefinition, ManifestError> {
    let bytes = fs.read_file(manifest_path).await?;
    let installed = match config.package_root() {
        Some(root) => fs.list_dirs(&root).await,
        None => Vec::new(),
    };
    parse_manifest(manifest_path, &bytes, config, &installed)
}

/// Builds a project definition from manifest contents. `installed_compilers`
/// lists the version directories present under the package-cache root.
pub fn parse_manifest(
    manifest_path: &Path,
    bytes: &[u8],
    config: &LoaderConfig,
    installed_compilers: &[String],
) -> Result<ProjectDefinition, ManifestError> {
    let parse_error = |source| ManifestError::Parse {
        path: manifest_path.to_path_buf(),
        source,
    };
    let manifest_dir = manifest_path.parent().unwrap_or(Path::new("/"));
    let is_legacy = manifest_path.file_name().and_then(|n| n.to_str()) == Some(LEGACY_ELM_PACKAGE_JSON);

    if is_legacy {
        let legacy: LegacyManifest = serde_json::from_slice(bytes).map_err(parse_error)?;
        let elm_version = legacy
            .elm_version
            .as_deref()
            .map(|v| lower_bound(v).to_string())
            .ok_or_else(|| ManifestError::MissingField {
                path: manifest_path.to_path_buf(),
                field: "elm-version",
            })?;
        let packages = manifest_dir.join("elm-stuff").join("packages");
        let dependencies = legacy
            .dependencies
            .iter()
            .map(|(name, range)| {
                let version = lower_bound(range).to_string();
                let mut package_path = packages.clone();
                package_path.extend(name.split('/'));
                package_path.push(&version);
                Dependency { name: name.clone(), version, package_path }
            })
            .collect();

        return Ok(ProjectDefinition {
            manifest_path: manifest_path.to_path_buf(),
            project_type: ProjectType::Application,
            elm_version,
            source_directories: resolve_dirs(manifest_dir, &legacy.source_directories),
            dependencies,
        });
    }

    let (project_type, elm_version, source_directories, declared) =
        match serde_json::from_slice::<ElmJson>(bytes).map_err(parse_error)? {
            ElmJson::Application(app) => (
                ProjectType::Application,
                app.elm_version,
                resolve_dirs(manifest_dir, &app.source_directories),
                app.dependencies.direct,
            ),
            ElmJson::Package(pkg) => (
                ProjectType::Package,
                compiler_version(&pkg.elm_version, installed_compilers),
                vec![manifest_dir.join("src")],
                pkg.dependencies,
            ),
        };

    let dependencies = match config.package_root() {
        Some(root) => declared
            .iter()
            .map(|(name, constraint)| {
                let version = lower_bound(constraint).to_string();
                Dependency {
                    name: name.clone(),
                    package_path: package_path(&root, &elm_version, name, &version),
                    version,
                }
            })
            .collect(),
        None => {
            debug!("No package cache root; ignoring dependencies of {:?}", manifest_path);
            Vec::new()
        }
    };

    Ok(ProjectDefinition {
        manifest_path: manifest_path.to_path_buf(),
        project_type,
        elm_version,
        source_directories,
        dependencies,
    })
}

fn resolve_dirs(base: &Path, dirs: &[String]) -> Vec<PathBuf> {
    dirs.iter().map(|dir| normalize(&base.join(dir))).collect()
}

/// Removes `.` and resolves `..` without touching the file system.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
