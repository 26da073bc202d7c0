//! File-system collaborator
//!
//! Everything that touches the disk goes through [`FileSystem`] so the project
//! resolver and module cache stay independent of how files are discovered or
//! read.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Error)]
pub enum FsError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    fn from_io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            FsError::NotFound(path.to_path_buf())
        } else {
            FsError::Io { path: path.to_path_buf(), source }
        }
    }
}

/// Which files a [`FileSystem::glob`] call should return.
#[derive(Debug, Clone, Default)]
pub struct GlobPattern {
    /// Exact file names to match, e.g. `elm.json`
    pub file_names: Vec<String>,
    /// File extension to match (without the dot), e.g. `elm`
    pub extension: Option<String>,
    /// Directory names that are never descended into
    pub excluded_dirs: Vec<String>,
}

impl GlobPattern {
    pub fn file_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            file_names: names.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn extension(ext: impl Into<String>) -> Self {
        Self {
            extension: Some(ext.into()),
            ..Default::default()
        }
    }

    pub fn excluding<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    fn matches_file(&self, path: &Path) -> bool {
        let name_matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| self.file_names.iter().any(|f| f == n));
        let ext_matches = match &self.extension {
            Some(ext) => path.extension().and_then(|e| e.to_str()) == Some(ext.as_str()),
            None => false,
        };
        name_matches || ext_matches
    }

    fn descends_into(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        entry
            .file_name()
            .to_str()
            .map_or(true, |name| !self.excluded_dirs.iter().any(|d| d == name))
    }
}

#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Returns every file under `roots` matching `pattern`, in walk order.
    async fn glob(&self, roots: &[PathBuf], pattern: &GlobPattern) -> Vec<PathBuf>;

    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError>;

    /// Names of the immediate subdirectories of `path`, sorted. Empty when
    /// `path` cannot be listed.
    async fn list_dirs(&self, path: &Path) -> Vec<String>;
}

/// [`FileSystem`] over the real disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskFileSystem;

impl DiskFileSystem {
    pub fn new() -> Self {
        Self
    }

    fn walk(roots: &[PathBuf], pattern: &GlobPattern) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for root in roots {
            for entry in WalkDir::new(root)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| pattern.descends_into(e))
                .filter_map(|e| e.ok())
            {
                if entry.file_type().is_file() && pattern.matches_file(entry.path()) {
                    trace!("glob matched {:?}", entry.path());
                    found.push(entry.into_path());
                }
            }
        }
        found
    }
}

#[async_trait]
impl FileSystem for DiskFileSystem {
    async fn glob(&self, roots: &[PathBuf], pattern: &GlobPattern) -> Vec<PathBuf> {
        let roots = roots.to_vec();
        let pattern = pattern.clone();
        match tokio::task::spawn_blocking(move || Self::walk(&roots, &pattern)).await {
            Ok(paths) => paths,
            Err(e) => {
                debug!("glob task failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        tokio::fs::read(path).await.map_err(|e| FsError::from_io(path, e))
    }

    async fn list_dirs(&self, path: &Path) -> Vec<String> {
        let mut entries = match tokio::fs::read_dir(path).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!("cannot list {:?}: {}", path, e);
                return Vec::new();
            }
        };

        let mut names = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
            if let (true, Some(name)) = (is_dir, entry.file_name().to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_glob_skips_excluded_directories() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path();
        fs::create_dir_all(root.join("app")).unwrap();
        fs::create_dir_all(root.join("elm-stuff/pkg")).unwrap();
        fs::write(root.join("app/elm.json"), "{}").unwrap();
        fs::write(root.join("elm-stuff/pkg/elm.json"), "{}").unwrap();

        let pattern = GlobPattern::file_names(["elm.json"]).excluding(["elm-stuff"]);
        let found = DiskFileSystem::new().glob(&[root.to_path_buf()], &pattern).await;

        assert_eq!(found, vec![root.join("app/elm.json")]);
    }

    #[tokio::test]
    async fn test_list_dirs_returns_only_directories() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(dir.path().join("0.19.1")).unwrap();
        fs::create_dir_all(dir.path().join("0.19.0")).unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let fs = DiskFileSystem::new();
        assert_eq!(fs.list_dirs(dir.path()).await, vec!["0.19.0", "0.19.1"]);
        assert!(fs.list_dirs(&dir.path().join("missing")).await.is_empty());
    }

    #[tokio::test]
    async fn test_read_missing_file_is_not_found() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let result = DiskFileSystem::new().read_file(&dir.path().join("Nope.elm")).await;
        assert!(matches!(result, Err(FsError::NotFound(_))));
    }
}
