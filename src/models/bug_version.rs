use indexmap::IndexMap;
use log::debug;
use rocket::serde::{Deserialize, Serialize};
use serde_json::Value;

/// Replacement advice for one broken `name@version`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BugVersionAdvice {
    pub version: String,
    #[serde(default)]
    pub reason: String,
}

/// `name -> broken version -> advice`, in the order the advisory lists them.
pub type BugVersionPackages = IndexMap<String, IndexMap<String, BugVersionAdvice>>;

/// Curated table of known-broken versions, applied to manifests at serve time only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BugVersion {
    data: BugVersionPackages,
}

impl BugVersion {
    pub fn new(data: BugVersionPackages) -> Self {
        Self { data }
    }

    /// Reads the `config["bug-versions"]` object of the advisory package.
    /// Malformed entries are skipped.
    pub fn from_config(value: &Value) -> Self {
        let mut data = BugVersionPackages::new();
        let Some(packages) = value.as_object() else {
            return Self { data };
        };
        for (name, versions) in packages {
            let Some(versions) = versions.as_object() else {
                debug!("Ignoring bug-versions entry for {name}: not an object");
                continue;
            };
            let mut advices = IndexMap::new();
            for (version, advice) in versions {
                match serde_json::from_value::<BugVersionAdvice>(advice.clone()) {
                    Ok(advice) => {
                        advices.insert(version.clone(), advice);
                    }
                    Err(e) => debug!("Ignoring bug-versions entry {name}@{version}: {e}"),
                }
            }
            data.insert(name.clone(), advices);
        }
        Self { data }
    }

    pub fn list_all_packages_has_bugs(&self) -> Vec<String> {
        self.data
            .iter()
            .filter(|(_, versions)| !versions.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn list_bug_versions(&self, name: &str) -> Vec<String> {
        self.data
            .get(name)
            .map(|versions| versions.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_bug_versions(&self, name: &str) -> bool {
        self.data
            .get(name)
            .is_some_and(|versions| !versions.is_empty())
    }

    /// Advice for `name@version`, unless the entry points back at itself.
    pub fn fix_version(&self, name: &str, version: &str) -> Option<BugVersionAdvice> {
        let advice = self.data.get(name)?.get(version)?;
        if advice.version == version {
            return None;
        }
        Some(advice.clone())
    }

    /// Copy of `fixed` served under the identity of `broken`, with a warning
    /// appended to `deprecated`. `None` when `broken` is already patched
    /// (same tarball) or has no advice.
    pub fn fix_manifest(&self, broken: &Value, fixed: &Value) -> Option<Value> {
        if broken.pointer("/dist/tarball") == fixed.pointer("/dist/tarball") {
            return None;
        }
        let name = broken.get("name")?.as_str()?;
        let version = broken.get("version")?.as_str()?;
        let advice = self.fix_version(name, version)?;

        let mut patched = fixed.clone();
        let object = patched.as_object_mut()?;
        let warning = format!(
            "[WARNING] Use {} instead of {version}, reason: {}",
            advice.version, advice.reason
        );
        let deprecated = match broken.get("deprecated").and_then(Value::as_str) {
            Some(existing) if !existing.is_empty() => format!("{existing} ({warning})"),
            _ => warning,
        };
        object.insert("deprecated".to_string(), Value::String(deprecated));
        object.insert("version".to_string(), Value::String(version.to_string()));
        Some(patched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bug_version() -> BugVersion {
        BugVersion::from_config(&json!({
            "faker": {
                "6.6.6": { "version": "5.5.3", "reason": "Please use https://github.com/MilosPaunovic/community-faker instead" }
            },
            "colors": {
                "1.4.44-liberty-2": { "version": "1.4.0", "reason": "https://github.com/Marak/colors.js/issues/285" },
                "1.4.1": { "version": "1.4.0", "reason": "https://github.com/Marak/colors.js/issues/285" },
                "1.4.2": { "version": "1.4.0", "reason": "https://github.com/Marak/colors.js/issues/285" }
            },
            "selfish": {
                "1.0.0": { "version": "1.0.0", "reason": "loop" }
            },
            "broken": "not-an-object"
        }))
    }

    #[test]
    fn test_lists_and_membership() {
        let bug_version = bug_version();
        assert_eq!(
            bug_version.list_all_packages_has_bugs(),
            vec!["faker", "colors", "selfish"]
        );
        assert_eq!(
            bug_version.list_bug_versions("colors"),
            vec!["1.4.44-liberty-2", "1.4.1", "1.4.2"]
        );
        assert!(bug_version.list_bug_versions("lodash").is_empty());
        assert!(bug_version.has_bug_versions("faker"));
        assert!(!bug_version.has_bug_versions("lodash"));
        assert!(!bug_version.has_bug_versions("broken"));
    }

    #[test]
    fn test_fix_version() {
        let bug_version = bug_version();
        let advice = bug_version.fix_version("faker", "6.6.6").unwrap();
        assert_eq!(advice.version, "5.5.3");
        assert!(bug_version.fix_version("faker", "5.5.3").is_none());
        assert!(bug_version.fix_version("lodash", "1.0.0").is_none());
        assert!(bug_version.fix_version("selfish", "1.0.0").is_none());
    }

    #[test]
    fn test_fix_manifest_keeps_identity_and_appends_warning() {
        let bug_version = bug_version();
        let broken = json!({
            "name": "colors",
            "version": "1.4.1",
            "deprecated": "do not use",
            "dist": { "tarball": "https://registry.example.com/colors/-/colors-1.4.1.tgz" }
        });
        let fixed = json!({
            "name": "colors",
            "version": "1.4.0",
            "dist": { "tarball": "https://registry.example.com/colors/-/colors-1.4.0.tgz" }
        });

        let patched = bug_version.fix_manifest(&broken, &fixed).unwrap();
        assert_eq!(patched["version"], "1.4.1");
        assert_eq!(patched["dist"]["tarball"], fixed["dist"]["tarball"]);
        assert_eq!(
            patched["deprecated"],
            "do not use ([WARNING] Use 1.4.0 instead of 1.4.1, reason: https://github.com/Marak/colors.js/issues/285)"
        );
        // the fixed manifest itself is untouched
        assert_eq!(fixed["version"], "1.4.0");
        assert!(fixed.get("deprecated").is_none());
    }

    #[test]
    fn test_fix_manifest_is_idempotent() {
        let bug_version = bug_version();
        let fixed = json!({
            "name": "colors",
            "version": "1.4.0",
            "dist": { "tarball": "https://registry.example.com/colors/-/colors-1.4.0.tgz" }
        });
        let already_patched = json!({
            "name": "colors",
            "version": "1.4.1",
            "dist": { "tarball": "https://registry.example.com/colors/-/colors-1.4.0.tgz" }
        });
        assert!(bug_version.fix_manifest(&already_patched, &fixed).is_none());
    }
}
