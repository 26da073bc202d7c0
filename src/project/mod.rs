//! Project discovery: manifests, package locations and module resolution.

pub mod fs;
pub mod manifest;
pub mod package_cache;
pub mod resolver;

pub use fs::{DiskFileSystem, FileSystem, FsError, GlobPattern};
pub use manifest::{Dependency, ManifestError, ProjectDefinition, ProjectType, load_projects};
pub use package_cache::LoaderConfig;
pub use resolver::{ProjectResolver, ResolvedModule};
