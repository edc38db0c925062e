use crate::database::DatabaseService;
use crate::error::RegistryResult;
use crate::models::{BugVersion, LATEST_TAG};
use crate::services::cache::ManifestCacheService;
use crate::services::dist::DistRepository;
use crate::version::split_fullname;
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::sync::{Arc, RwLock};

const CACHE_CLEAN_CONCURRENCY: usize = 50;

/// Loads the bug-version advisory and applies it to served manifests.
#[derive(Debug)]
pub struct BugVersionService {
    database: Arc<DatabaseService>,
    dists: DistRepository,
    cache: Arc<ManifestCacheService>,
    advisory_package: String,
    // (advisory latest version, parsed table)
    loaded: RwLock<Option<(String, BugVersion)>>,
}

impl BugVersionService {
    pub fn new(
        database: Arc<DatabaseService>,
        dists: DistRepository,
        cache: Arc<ManifestCacheService>,
        advisory_package: &str,
    ) -> Self {
        Self {
            database,
            dists,
            cache,
            advisory_package: advisory_package.to_string(),
            loaded: RwLock::new(None),
        }
    }

    pub fn advisory_package(&self) -> &str {
        &self.advisory_package
    }

    /// Current advisory table, or `None` when the advisory package is absent
    /// or unreadable. Reloaded whenever its `latest` tag moves.
    pub fn get_bug_version(&self) -> Option<BugVersion> {
        match self.load_bug_version() {
            Ok(bug_version) => bug_version,
            Err(e) => {
                warn!("Bug-version advisory unavailable: {e}");
                None
            }
        }
    }

    fn load_bug_version(&self) -> RegistryResult<Option<BugVersion>> {
        let (scope, name) = split_fullname(&self.advisory_package);
        let Some(latest) = self.database.find_version_by_tag(&scope, &name, LATEST_TAG)? else {
            return Ok(None);
        };

        if let Ok(loaded) = self.loaded.read() {
            if let Some((version, bug_version)) = loaded.as_ref() {
                if *version == latest {
                    return Ok(Some(bug_version.clone()));
                }
            }
        }

        let Some(manifest) = self.find_version_manifest(&self.advisory_package, &latest)? else {
            return Ok(None);
        };
        let bug_version = BugVersion::from_config(
            manifest
                .pointer("/config/bug-versions")
                .unwrap_or(&Value::Null),
        );
        info!(
            "Loaded bug-version advisory {}@{} ({} packages)",
            self.advisory_package,
            latest,
            bug_version.list_all_packages_has_bugs().len()
        );

        match self.loaded.write() {
            Ok(mut loaded) => *loaded = Some((latest, bug_version.clone())),
            Err(poisoned) => *poisoned.into_inner() = Some((latest, bug_version.clone())),
        }
        Ok(Some(bug_version))
    }

    /// Forgets the parsed table so the next read reloads it
    pub fn invalidate(&self) {
        match self.loaded.write() {
            Ok(mut loaded) => *loaded = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    /// Evicts the cached manifests of every advised package. Individual
    /// failures are logged and skipped.
    pub fn clean_bug_version_package_caches(&self, bug_version: &BugVersion) -> usize {
        let names = bug_version.list_all_packages_has_bugs();
        let mut cleaned = 0;

        for chunk in names.chunks(CACHE_CLEAN_CONCURRENCY) {
            cleaned += std::thread::scope(|s| {
                let workers: Vec<_> = chunk
                    .iter()
                    .map(|fullname| {
                        s.spawn(move || match self.cache.remove_cache(fullname) {
                            Ok(()) => true,
                            Err(e) => {
                                warn!("Failed to clean cache of {fullname}: {e}");
                                false
                            }
                        })
                    })
                    .collect();
                workers
                    .into_iter()
                    .map(|worker| worker.join().unwrap_or(false))
                    .filter(|ok| *ok)
                    .count()
            });
        }

        info!("Cleaned caches of {cleaned}/{} bug-version packages", names.len());
        cleaned
    }

    /// Patches a single version manifest, loading the fixed sibling from storage
    pub fn fix_package_bug_version(
        &self,
        bug_version: &BugVersion,
        fullname: &str,
        manifest: Value,
    ) -> RegistryResult<Value> {
        let Some(version) = manifest.get("version").and_then(Value::as_str) else {
            return Ok(manifest);
        };
        let Some(advice) = bug_version.fix_version(fullname, version) else {
            return Ok(manifest);
        };
        let Some(fixed) = self.find_version_manifest(fullname, &advice.version)? else {
            debug!("Advised version {fullname}@{} is not published", advice.version);
            return Ok(manifest);
        };
        Ok(bug_version.fix_manifest(&manifest, &fixed).unwrap_or(manifest))
    }

    /// Patches a whole `version -> manifest` map in place. Replacements are
    /// looked up in the map as it was before patching.
    pub fn fix_package_bug_versions(
        &self,
        bug_version: &BugVersion,
        fullname: &str,
        manifests: &mut Map<String, Value>,
    ) {
        let original = manifests.clone();
        for (version, manifest) in &original {
            let Some(advice) = bug_version.fix_version(fullname, version) else {
                continue;
            };
            let Some(fixed) = original.get(&advice.version) else {
                continue;
            };
            if let Some(patched) = bug_version.fix_manifest(manifest, fixed) {
                manifests.insert(version.clone(), patched);
            }
        }
    }

    fn find_version_manifest(&self, fullname: &str, version: &str) -> RegistryResult<Option<Value>> {
        let (scope, name) = split_fullname(fullname);
        let Some(package) = self.database.find_package(&scope, &name)? else {
            return Ok(None);
        };
        let Some(package_version) = self.database.find_package_version(&package.package_id, version)?
        else {
            return Ok(None);
        };
        self.dists.read_json_by_id(package_version.manifest_dist_id)
    }
}
