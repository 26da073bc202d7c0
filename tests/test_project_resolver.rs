//! Integration tests for project lookup and module resolution.

mod common;

use std::path::PathBuf;

use quickcheck::{QuickCheck, TestResult};

use common::Fixture;

#[tokio::test]
async fn test_project_for_source_file() {
    let fixture = Fixture::application();
    let resolver = fixture.resolver();

    let project = resolver
        .project_for_path(&fixture.path("app/src/Main.elm"))
        .await
        .expect("Main.elm lies in app/src");
    assert_eq!(project.manifest_path, fixture.path("app/elm.json"));

    let nested = resolver.project_for_path(&fixture.path("app/src/Page/Home.elm")).await;
    assert!(nested.is_some());
}

#[tokio::test]
async fn test_sibling_directory_is_not_owned() {
    let fixture = Fixture::application();
    let resolver = fixture.resolver();

    assert!(resolver.project_for_path(&fixture.path("app/src-extra/Main.elm")).await.is_none());
    assert!(resolver.project_for_path(&fixture.path("app/Main.elm")).await.is_none());
}

#[test]
fn prop_paths_outside_source_directories_have_no_project() {
    fn prop(segments: Vec<String>, sibling: bool) -> TestResult {
        let segments: Vec<String> = segments
            .into_iter()
            .map(|s| s.chars().filter(char::is_ascii_alphanumeric).collect::<String>())
            .filter(|s| !s.is_empty())
            .take(4)
            .collect();
        if segments.is_empty() {
            return TestResult::discard();
        }

        let fixture = Fixture::application();
        let mut path = if sibling {
            fixture.path(&format!("app/src-{}", segments[0]))
        } else {
            fixture.path("elsewhere").join(&segments[0])
        };
        path.extend(&segments[1..]);
        path.set_extension("elm");

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let project = runtime.block_on(fixture.resolver().project_for_path(&path));
        TestResult::from_bool(project.is_none())
    }

    QuickCheck::new()
        .tests(25)
        .quickcheck(prop as fn(Vec<String>, bool) -> TestResult);
}

#[tokio::test]
async fn test_dependency_module_resolves_from_package_cache() {
    let fixture = Fixture::application();
    let resolver = fixture.resolver();
    let cache = fixture.cache();

    let resolved = resolver
        .module_by_name(&cache, &fixture.path("app/src/Main.elm"), "List")
        .await
        .expect("List comes from elm/core");

    assert!(resolved.path.starts_with(&fixture.elm_home));
    assert_eq!(resolved.module.name, "List");
    assert!(resolved.module.function("map").is_some());
}

#[tokio::test]
async fn test_local_module_shadows_dependency() {
    let fixture = Fixture::application();
    let local = fixture.write(
        "app/src/List.elm",
        "module List exposing (localOnly)\n\nlocalOnly =\n    1\n",
    );
    let resolver = fixture.resolver();
    let cache = fixture.cache();

    let resolved = resolver
        .module_by_name(&cache, &fixture.path("app/src/Main.elm"), "List")
        .await
        .expect("List resolves");

    assert_eq!(resolved.path, local);
    assert!(resolved.module.function("localOnly").is_some());
    assert!(resolved.module.function("map").is_none());
}

#[tokio::test]
async fn test_missing_package_is_not_found() {
    let fixture = Fixture::application();
    let resolver = fixture.resolver();
    let cache = fixture.cache();

    // elm/html is declared but not installed.
    let resolved = resolver
        .module_by_name(&cache, &fixture.path("app/src/Main.elm"), "Html")
        .await;
    assert!(resolved.is_none());
    assert_eq!(cache.stats().not_found, 3);
}

#[tokio::test]
async fn test_module_lookup_outside_project_is_not_found() {
    let fixture = Fixture::application();
    let resolver = fixture.resolver();
    let cache = fixture.cache();

    let resolved = resolver
        .module_by_name(&cache, &fixture.path("scratch/Main.elm"), "List")
        .await;
    assert!(resolved.is_none());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_refresh_picks_up_new_manifest() {
    let fixture = Fixture::application();
    let resolver = fixture.resolver();
    let file = fixture.path("second/src/Main.elm");

    assert_eq!(resolver.initialize().await.len(), 1);
    fixture.write(
        "second/elm.json",
        r#"{
            "type": "application",
            "source-directories": ["src"],
            "elm-version": "0.19.1",
            "dependencies": { "direct": {}, "indirect": {} },
            "test-dependencies": { "direct": {}, "indirect": {} }
        }"#,
    );

    // Loaded definitions are kept until refreshed.
    assert!(resolver.project_for_path(&file).await.is_none());

    let projects = resolver.refresh().await;
    assert_eq!(projects.len(), 2);
    assert!(resolver.project_for_path(&file).await.is_some());
}

#[tokio::test]
async fn test_workspace_modules_lists_local_sources() {
    let fixture = Fixture::application();
    fixture.write("app/src/Main.elm", "module Main exposing (main)\n\nmain =\n    1\n");
    fixture.write("app/src/Page/Home.elm", "module Page.Home exposing (view)\n\nview =\n    1\n");
    fixture.write("app/src/elm-stuff/Ignored.elm", "module Ignored exposing (x)\n\nx =\n    1\n");
    let resolver = fixture.resolver();

    let project = resolver
        .project_for_path(&fixture.path("app/src/Main.elm"))
        .await
        .expect("project");
    let modules = resolver.workspace_modules(&project).await;

    assert_eq!(modules, vec!["Colors", "Main", "Page.Home"]);
}

#[tokio::test]
async fn test_roots_can_be_set_after_construction() {
    let fixture = Fixture::application();
    let resolver = elm_completion_server::project::ProjectResolver::new(
        common::disk(),
        Vec::new(),
        fixture.loader_config(),
    );
    resolver.set_roots(vec![fixture.workspace.clone()]).await;

    assert_eq!(resolver.roots().await, vec![PathBuf::from(&fixture.workspace)]);
    assert!(resolver.project_for_path(&fixture.path("app/src/Main.elm")).await.is_some());
}

#[tokio::test]
async fn test_package_project_reads_installed_compiler_packages() {
    let fixture = Fixture::application();
    fixture.write(
        "pkg/elm.json",
        r#"{
            "type": "package",
            "name": "me/pkg",
            "summary": "",
            "license": "BSD-3-Clause",
            "version": "1.0.0",
            "exposed-modules": ["Pkg"],
            "elm-version": "0.19.0 <= v < 0.20.0",
            "dependencies": { "elm/core": "1.0.5 <= v < 2.0.0" },
            "test-dependencies": {}
        }"#,
    );
    let resolver = fixture.resolver();
    let cache = fixture.cache();
    let file = fixture.path("pkg/src/Pkg.elm");

    let project = resolver.project_for_path(&file).await.expect("package project");
    assert_eq!(project.elm_version, common::ELM_VERSION);

    let resolved = resolver
        .module_by_name(&cache, &file, "List")
        .await
        .expect("List resolves from the 0.19.1 package directory");
    assert!(resolved.path.starts_with(fixture.elm_home.join(common::ELM_VERSION)));
}
