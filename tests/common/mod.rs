//! Shared fixture for integration tests: a temporary workspace with an Elm
//! application and a private package cache.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use elm_completion_server::lsp::backend::module_cache::ModuleCache;
use elm_completion_server::lsp::features::CompletionEngine;
use elm_completion_server::parsers::TreeSitterElmParser;
use elm_completion_server::project::package_cache::package_path;
use elm_completion_server::project::{DiskFileSystem, FileSystem, LoaderConfig, ProjectResolver};

pub const ELM_VERSION: &str = "0.19.1";

pub const LIST_ELM: &str = r#"module List exposing (map, filter, length)

{-| Apply a function to every element of a list.
-}
map : (a -> b) -> List a -> List b
map f xs =
    xs


filter : (a -> Bool) -> List a -> List a
filter isGood list =
    list


length : List a -> Int
length xs =
    0


internalHelper : Int
internalHelper =
    1
"#;

pub const MAYBE_ELM: &str = r#"module Maybe exposing (Maybe(..), withDefault)

{-| Represent values that may or may not exist.
-}
type Maybe a
    = Just a
    | Nothing


withDefault : a -> Maybe a -> a
withDefault default maybe =
    default
"#;

pub const COLORS_ELM: &str = r##"module Colors exposing (Color(..), toHex)

{-| The palette.
-}
type Color
    = Red
    | Green


{-| Render as hex.
-}
toHex : Color -> String
toHex color =
    "#fff"
"##;

pub struct Fixture {
    _dir: TempDir,
    pub workspace: PathBuf,
    pub elm_home: PathBuf,
}

impl Fixture {
    /// Empty workspace and package cache.
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let workspace = dir.path().join("workspace");
        let elm_home = dir.path().join("elm-home");
        fs::create_dir_all(&workspace).unwrap();
        fs::create_dir_all(&elm_home).unwrap();
        Self { _dir: dir, workspace, elm_home }
    }

    /// An application at `workspace/app` depending on `elm/core` (installed)
    /// and `elm/html` (not installed), with a local `Colors` module.
    pub fn application() -> Self {
        let fixture = Self::empty();
        fixture.write(
            "app/elm.json",
            r#"{
                "type": "application",
                "source-directories": ["src"],
                "elm-version": "0.19.1",
                "dependencies": {
                    "direct": { "elm/core": "1.0.5", "elm/html": "1.0.0" },
                    "indirect": {}
                },
                "test-dependencies": { "direct": {}, "indirect": {} }
            }"#,
        );
        fixture.write("app/src/Colors.elm", COLORS_ELM);
        fixture.write_package("elm/core", "1.0.5", "List", LIST_ELM);
        fixture.write_package("elm/core", "1.0.5", "Maybe", MAYBE_ELM);
        fixture
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.workspace.join(relative)
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.path(relative);
        write_file(&path, contents);
        path
    }

    /// Installs `module` of `package` into the package cache.
    pub fn write_package(&self, package: &str, version: &str, module: &str, contents: &str) -> PathBuf {
        let mut path = package_path(&self.elm_home, ELM_VERSION, package, version).join("src");
        path.extend(module.split('.'));
        path.set_extension("elm");
        write_file(&path, contents);
        path
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig::with_package_root(&self.elm_home)
    }

    pub fn resolver(&self) -> Arc<ProjectResolver> {
        Arc::new(ProjectResolver::new(
            disk(),
            vec![self.workspace.clone()],
            self.loader_config(),
        ))
    }

    pub fn cache(&self) -> Arc<ModuleCache> {
        Arc::new(ModuleCache::new(disk(), Arc::new(TreeSitterElmParser::new())))
    }

    pub fn engine(&self) -> CompletionEngine {
        CompletionEngine::new(self.resolver(), self.cache())
    }
}

pub fn disk() -> Arc<dyn FileSystem> {
    Arc::new(DiskFileSystem::new())
}

fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}
