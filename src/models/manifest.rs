use crate::models::package::Package;
use serde_json::{Map, Value};
use std::path::PathBuf;

pub const LATEST_TAG: &str = "latest";

/// Fields copied into the abbreviated (install-time) projection of a version manifest.
pub const ABBREVIATED_FIELDS: [&str; 20] = [
    "name",
    "version",
    "deprecated",
    "dependencies",
    "optionalDependencies",
    "devDependencies",
    "bundleDependencies",
    "peerDependencies",
    "peerDependenciesMeta",
    "acceptDependencies",
    "bin",
    "os",
    "cpu",
    "libc",
    "directories",
    "dist",
    "engines",
    "_hasShrinkwrap",
    "hasInstallScript",
    "publish_time",
];

/// Root fields of the full manifest hoisted from the `latest` version.
pub const LATEST_MANIFEST_FIELDS: [&str; 8] = [
    "author",
    "bugs",
    "description",
    "homepage",
    "keywords",
    "license",
    "readmeFilename",
    "repository",
];

/// Where the tarball bytes of a publish come from.
#[derive(Debug, Clone)]
pub enum TarballSource {
    Bytes(Vec<u8>),
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct PublishPackageCmd {
    pub scope: String,
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub package_json: Value,
    pub readme: String,
    pub dist: TarballSource,
    pub tag: Option<String>,
    pub is_private: bool,
    /// Bulk/sync imports refresh the package manifests once at the end instead.
    pub skip_refresh_package_manifests: bool,
}

impl PublishPackageCmd {
    pub fn new(
        scope: &str,
        name: &str,
        version: &str,
        package_json: Value,
        dist: TarballSource,
    ) -> Self {
        let description = package_json
            .get("description")
            .and_then(Value::as_str)
            .map(|s| s.to_string());
        let readme = package_json
            .get("readme")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self {
            scope: scope.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            description,
            package_json,
            readme,
            dist,
            tag: Some(LATEST_TAG.to_string()),
            is_private: true,
            skip_refresh_package_manifests: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeprecatedVersion {
    pub version: String,
    /// Empty string clears the deprecation.
    pub deprecated: String,
}

/// Package level manifest document as served, with its etag.
#[derive(Debug, Clone)]
pub struct PackageManifestsResult {
    pub etag: String,
    pub data: Option<Value>,
    pub block_reason: String,
}

#[derive(Debug, Clone)]
pub struct VersionManifestResult {
    pub manifest: Option<Value>,
    pub block_reason: Option<String>,
    pub package: Option<Package>,
}

pub fn has_install_script(manifest: &Value) -> bool {
    manifest
        .get("scripts")
        .and_then(Value::as_object)
        .is_some_and(|scripts| {
            ["preinstall", "install", "postinstall"]
                .iter()
                .any(|hook| scripts.contains_key(*hook))
        })
}

/// Projects a full version manifest onto [`ABBREVIATED_FIELDS`].
pub fn abbreviated_manifest(manifest: &Value, source_registry_name: &str) -> Value {
    let mut abbreviated = Map::new();
    for field in ABBREVIATED_FIELDS {
        if let Some(value) = manifest.get(field) {
            abbreviated.insert(field.to_string(), value.clone());
        }
    }
    if has_install_script(manifest) {
        abbreviated.insert("hasInstallScript".to_string(), Value::Bool(true));
    }
    abbreviated.insert(
        "_source_registry_name".to_string(),
        Value::String(source_registry_name.to_string()),
    );
    Value::Object(abbreviated)
}

/// Returns `value[key]` as an object, replacing anything else with `{}`.
pub fn object_field<'a>(value: &'a mut Value, key: &str) -> &'a mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    let Value::Object(map) = value else {
        unreachable!("value was just made an object");
    };
    let entry = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    match entry {
        Value::Object(inner) => inner,
        _ => unreachable!("entry was just made an object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_abbreviated_projection() {
        let manifest = json!({
            "name": "foo",
            "version": "1.0.0",
            "description": "dropped",
            "readme": "dropped",
            "dependencies": { "bar": "^1.0.0" },
            "scripts": { "postinstall": "node build.js" },
            "dist": { "tarball": "http://localhost/foo/-/foo-1.0.0.tgz" },
            "publish_time": 1700000000000u64
        });
        let abbreviated = abbreviated_manifest(&manifest, "self");
        assert_eq!(abbreviated["name"], "foo");
        assert_eq!(abbreviated["dependencies"]["bar"], "^1.0.0");
        assert_eq!(abbreviated["hasInstallScript"], true);
        assert_eq!(abbreviated["_source_registry_name"], "self");
        assert!(abbreviated.get("description").is_none());
        assert!(abbreviated.get("readme").is_none());
        assert!(abbreviated.get("scripts").is_none());
    }

    #[test]
    fn test_object_field_repairs_shape() {
        let mut doc = json!({ "time": "oops" });
        object_field(&mut doc, "time").insert("created".to_string(), json!("now"));
        assert_eq!(doc["time"]["created"], "now");
        object_field(&mut doc, "versions");
        assert!(doc["versions"].is_object());
    }

    #[test]
    fn test_publish_cmd_defaults() {
        let cmd = PublishPackageCmd::new(
            "",
            "foo",
            "1.0.0",
            json!({ "name": "foo", "version": "1.0.0", "description": "hi", "readme": "# foo" }),
            TarballSource::Bytes(b"tarball".to_vec()),
        );
        assert_eq!(cmd.description.as_deref(), Some("hi"));
        assert_eq!(cmd.readme, "# foo");
        assert_eq!(cmd.tag.as_deref(), Some(LATEST_TAG));
        assert!(!cmd.skip_refresh_package_manifests);
    }
}
