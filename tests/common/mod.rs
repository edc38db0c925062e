#![allow(dead_code)]

use serde_json::{Value, json};
use stave::models::{Maintainer, PackageVersion, PublishPackageCmd, TarballSource};
use stave::version::split_fullname;
use stave::{AppConfig, AppState};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

static TEST_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Registry state rooted in a throwaway directory
pub struct TestRegistry {
    pub state: AppState,
    _temp_dir: TempDir,
}

pub fn test_config(temp_dir: &TempDir) -> AppConfig {
    let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    let data_dir = temp_dir.path().join(format!("data-{counter}"));
    AppConfig::with_data_dir(data_dir.to_str().expect("temp path is valid utf-8"))
}

pub fn create_test_registry() -> TestRegistry {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let state = AppState::new(test_config(&temp_dir)).expect("Failed to build registry state");
    TestRegistry {
        state,
        _temp_dir: temp_dir,
    }
}

pub fn publisher() -> Maintainer {
    Maintainer::new("alice", "alice@example.com")
}

/// Publishes `fullname@version` with `extra` merged over a minimal package.json
pub fn publish_with(
    state: &AppState,
    fullname: &str,
    version: &str,
    tag: Option<&str>,
    extra: Value,
) -> PackageVersion {
    let (scope, name) = split_fullname(fullname);
    let mut package_json = json!({
        "name": fullname,
        "version": version,
        "description": format!("{fullname} is a test package"),
        "license": "MIT",
        "readme": format!("# {fullname}@{version}"),
    });
    if let (Some(target), Some(extra)) = (package_json.as_object_mut(), extra.as_object()) {
        for (key, value) in extra {
            target.insert(key.clone(), value.clone());
        }
    }

    let mut cmd = PublishPackageCmd::new(
        &scope,
        &name,
        version,
        package_json,
        TarballSource::Bytes(format!("tarball of {fullname}@{version}").into_bytes()),
    );
    cmd.tag = tag.map(str::to_string);
    state
        .packages
        .publish(cmd, &publisher())
        .expect("publish should succeed")
}

pub fn publish(state: &AppState, fullname: &str, version: &str) -> PackageVersion {
    publish_with(state, fullname, version, Some("latest"), json!({}))
}

pub fn full_manifests(state: &AppState, fullname: &str) -> Value {
    let (scope, name) = split_fullname(fullname);
    state
        .packages
        .list_package_full_manifests(&scope, &name, true)
        .expect("manifests should load")
        .data
        .expect("package should have manifests")
}

pub fn version_keys(manifests: &Value) -> Vec<String> {
    let mut keys: Vec<String> = manifests["versions"]
        .as_object()
        .map(|versions| versions.keys().cloned().collect())
        .unwrap_or_default();
    keys.sort();
    keys
}
