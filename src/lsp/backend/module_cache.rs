//! Parsed-module cache keyed by absolute file path
//!
//! # Invalidation
//!
//! Entries never expire on their own. An entry reflects the file contents at
//! the time of the last successful parse; callers decide when that is stale and
//! call [`ModuleCache::invalidate`] (on save, or before re-parsing the file that
//! is being edited).
//!
//! # Failures
//!
//! - Missing or unreadable file: `None`, nothing cached
//! - Parse failure: `None`, nothing cached, so the next `get` tries again
//!
//! Concurrent misses on the same path are not deduplicated; each caller reads
//! and parses independently and the last insert wins. Entries are replaced as a
//! whole, never mutated in place.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::ir::elm_module::ParsedModule;
use crate::parsers::elm_parser::ModuleParser;
use crate::project::fs::{FileSystem, FsError};

/// One cached parse result
#[derive(Debug)]
pub struct ModuleCacheEntry {
    pub file_path: PathBuf,
    pub module_name: String,
    pub ast: Arc<ParsedModule>,
    pub parsed_at: Instant,
}

/// Cache statistics for monitoring and debugging
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Misses where the file could not be read
    pub not_found: u64,
    /// Misses where the file was read but did not parse
    pub parse_failures: u64,
    pub invalidations: u64,
}

impl CacheStats {
    /// Hit rate in `0.0..=1.0`
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

pub struct ModuleCache {
    entries: DashMap<PathBuf, Arc<ModuleCacheEntry>>,
    fs: Arc<dyn FileSystem>,
    parser: Arc<dyn ModuleParser>,
    stats: RwLock<CacheStats>,
}

impl std::fmt::Debug for ModuleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleCache")
            .field("entries", &self.entries.len())
            .field("stats", &*self.stats.read())
            .finish()
    }
}

impl ModuleCache {
    pub fn new(fs: Arc<dyn FileSystem>, parser: Arc<dyn ModuleParser>) -> Self {
        Self {
            entries: DashMap::new(),
            fs,
            parser,
            stats: RwLock::new(CacheStats::default()),
        }
    }

    /// Returns the cached module for `path`, reading and parsing it on a miss.
    pub async fn get(&self, path: &Path) -> Option<Arc<ParsedModule>> {
        if let Some(entry) = self.entries.get(path) {
            self.stats.write().hits += 1;
            return Some(entry.ast.clone());
        }
        self.stats.write().misses += 1;

        let bytes = match self.fs.read_file(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                if !matches!(e, FsError::NotFound(_)) {
                    debug!("{}", e);
                }
                self.stats.write().not_found += 1;
                return None;
            }
        };

        match self.parser.parse_bytes(&bytes) {
            Ok(module) => Some(self.store(path, module)),
            Err(e) => {
                debug!("Failed to parse {:?}: {}", path, e);
                self.stats.write().parse_failures += 1;
                None
            }
        }
    }

    /// Parses `source` as the contents of `path`, caching it on success.
    ///
    /// Used for editor buffers whose text differs from what is on disk.
    pub fn get_with_source(&self, path: &Path, source: &str) -> Option<Arc<ParsedModule>> {
        match self.parser.parse(source) {
            Ok(module) => Some(self.store(path, module)),
            Err(e) => {
                debug!("Failed to parse buffer for {:?}: {}", path, e);
                self.stats.write().parse_failures += 1;
                None
            }
        }
    }

    fn store(&self, path: &Path, module: ParsedModule) -> Arc<ParsedModule> {
        let ast = Arc::new(module);
        let entry = ModuleCacheEntry {
            file_path: path.to_path_buf(),
            module_name: ast.name.clone(),
            ast: ast.clone(),
            parsed_at: Instant::now(),
        };
        self.entries.insert(path.to_path_buf(), Arc::new(entry));
        ast
    }

    /// Drops the entry for `path`, if any.
    pub fn invalidate(&self, path: &Path) -> &Self {
        if self.entries.remove(path).is_some() {
            debug!("Invalidated cached module {:?}", path);
        }
        self.stats.write().invalidations += 1;
        self
    }

    pub fn entry(&self, path: &Path) -> Option<Arc<ModuleCacheEntry>> {
        self.entries.get(path).map(|e| e.value().clone())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tempfile::TempDir;

    use crate::parsers::elm_parser::{ParseError, TreeSitterElmParser};
    use crate::project::fs::DiskFileSystem;

    /// Counts calls and rejects sources containing `BROKEN`.
    #[derive(Default)]
    struct CountingParser {
        calls: AtomicUsize,
    }

    impl ModuleParser for CountingParser {
        fn parse(&self, source: &str) -> Result<ParsedModule, ParseError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if source.contains("BROKEN") {
                Err(ParseError::Unrecognized)
            } else {
                Ok(ParsedModule::named(source.trim()))
            }
        }
    }

    fn cache_with(parser: Arc<CountingParser>) -> ModuleCache {
        ModuleCache::new(Arc::new(DiskFileSystem::new()), parser)
    }

    #[tokio::test]
    async fn test_hit_after_first_parse() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("A.elm");
        fs::write(&path, "A").unwrap();
        let parser = Arc::new(CountingParser::default());
        let cache = cache_with(parser.clone());

        let first = cache.get(&path).await.expect("first get");
        let second = cache.get(&path).await.expect("second get");

        assert_eq!(first.name, "A");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(parser.calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[tokio::test]
    async fn test_parse_failure_is_not_cached() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("B.elm");
        fs::write(&path, "BROKEN").unwrap();
        let parser = Arc::new(CountingParser::default());
        let cache = cache_with(parser.clone());

        assert!(cache.get(&path).await.is_none());
        assert!(cache.get(&path).await.is_none());
        assert_eq!(parser.calls.load(Ordering::SeqCst), 2, "broken file is retried");
        assert!(cache.is_empty());

        fs::write(&path, "B").unwrap();
        assert_eq!(cache.get(&path).await.map(|m| m.name.clone()), Some("B".to_string()));
        assert_eq!(cache.stats().parse_failures, 2);
    }

    #[tokio::test]
    async fn test_missing_file_returns_none() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let cache = cache_with(Arc::new(CountingParser::default()));

        assert!(cache.get(&dir.path().join("Missing.elm")).await.is_none());
        assert_eq!(cache.stats().not_found, 1);
    }

    #[tokio::test]
    async fn test_stale_until_invalidated() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("C.elm");
        fs::write(&path, "Old").unwrap();
        let cache = cache_with(Arc::new(CountingParser::default()));

        assert_eq!(cache.get(&path).await.unwrap().name, "Old");
        fs::write(&path, "New").unwrap();
        assert_eq!(cache.get(&path).await.unwrap().name, "Old", "no revalidation");

        let module = cache.invalidate(&path).invalidate(&path).get(&path).await.unwrap();
        assert_eq!(module.name, "New");
    }

    #[tokio::test]
    async fn test_reparse_after_invalidate_is_structurally_equal() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("Color.elm");
        fs::write(
            &path,
            "module Color exposing (..)\n\ntype Color = Red | Green\n\ntoHex c =\n    \"#fff\"\n",
        )
        .unwrap();
        let cache = ModuleCache::new(Arc::new(DiskFileSystem::new()), Arc::new(TreeSitterElmParser::new()));

        let before = cache.get(&path).await.expect("parses");
        let after = cache.invalidate(&path).get(&path).await.expect("parses again");

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(*before, *after);
    }

    #[tokio::test]
    async fn test_get_with_source_replaces_entry() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("D.elm");
        fs::write(&path, "OnDisk").unwrap();
        let cache = cache_with(Arc::new(CountingParser::default()));

        cache.get(&path).await.unwrap();
        cache.invalidate(&path);
        let module = cache.get_with_source(&path, "InBuffer").unwrap();

        assert_eq!(module.name, "InBuffer");
        assert_eq!(cache.entry(&path).unwrap().module_name, "InBuffer");
        assert!(cache.get_with_source(&path, "BROKEN").is_none());
        assert!(cache.contains(&path), "failed parse leaves the previous entry alone");
    }
}
