use crate::database::DatabaseService;
use crate::error::{RegistryError, RegistryResult};
use crate::models::{BugVersion, Package};
use crate::services::bug_version::BugVersionService;
use crate::services::dist::DistRepository;
use crate::version::{PackageSpec, SpecKind, SqlRange, parse_strict};
use log::debug;
use serde_json::Value;
use std::sync::Arc;

/// Turns a spec (tag, version, range or alias) into a concrete version.
#[derive(Debug, Clone)]
pub struct PackageVersionService {
    database: Arc<DatabaseService>,
    dists: DistRepository,
    bug_versions: Arc<BugVersionService>,
}

impl PackageVersionService {
    pub fn new(
        database: Arc<DatabaseService>,
        dists: DistRepository,
        bug_versions: Arc<BugVersionService>,
    ) -> Self {
        Self {
            database,
            dists,
            bug_versions,
        }
    }

    /// Resolves `spec`. With `apply_bug_fix`, a version listed in the
    /// advisory is swapped for its advised replacement.
    pub fn get_version(&self, spec: &PackageSpec, apply_bug_fix: bool) -> RegistryResult<Option<String>> {
        let (scope, name) = spec.scope_and_name();
        let version = match &spec.kind {
            SpecKind::Tag(tag) => self.database.find_version_by_tag(&scope, &name, tag)?,
            SpecKind::Version(version) => parse_strict(version).map(|v| v.to_string()),
            SpecKind::Range(range) => {
                // `foo@1.1` may name a tag as well as a range; the tag wins
                match self.database.find_version_by_tag(&scope, &name, range)? {
                    Some(version) => Some(version),
                    None => self.find_max_satisfying_version(&scope, &name, range)?,
                }
            }
            SpecKind::Alias(sub_spec) => return self.get_version(sub_spec, apply_bug_fix),
            SpecKind::Unsupported(kind) => {
                return Err(RegistryError::Unprocessable(format!(
                    "unsupported spec type {kind}: {}@{}",
                    spec.name, spec.raw_spec
                )));
            }
        };

        let Some(version) = version else {
            return Ok(None);
        };
        if apply_bug_fix {
            if let Some(advice) = self
                .bug_versions
                .get_bug_version()
                .and_then(|bug_version| bug_version.fix_version(&spec.name, &version))
            {
                debug!("Resolved {}@{version} to advised {}", spec.name, advice.version);
                return Ok(Some(advice.version));
            }
        }
        Ok(Some(version))
    }

    pub fn find_max_satisfying_version(
        &self,
        scope: &str,
        name: &str,
        range: &str,
    ) -> RegistryResult<Option<String>> {
        let Some(package) = self.database.find_package(scope, name)? else {
            return Ok(None);
        };
        let sql_range = SqlRange::new(range)?;
        Ok(self
            .database
            .find_max_satisfying_version(&package.package_id, &sql_range)?)
    }

    /// Manifest (full or abbreviated) of the version `spec` resolves to.
    ///
    /// The resolved version keeps its identity; with `with_bug_version` an
    /// advised version is served as the replacement manifest relabelled
    /// with the broken version and a deprecation warning.
    pub fn read_manifest(
        &self,
        package: &Package,
        spec: &PackageSpec,
        is_full_manifests: bool,
        with_bug_version: bool,
    ) -> RegistryResult<Option<Value>> {
        let Some(version) = self.get_version(spec, false)? else {
            return Ok(None);
        };
        let Some(manifest) = self.read_version_manifest(package, &version, is_full_manifests)? else {
            return Ok(None);
        };
        if !with_bug_version {
            return Ok(Some(manifest));
        }

        let Some(bug_version) = self.bug_versions.get_bug_version() else {
            return Ok(Some(manifest));
        };
        Ok(Some(self.apply_advice(
            &bug_version,
            package,
            manifest,
            is_full_manifests,
        )?))
    }

    fn apply_advice(
        &self,
        bug_version: &BugVersion,
        package: &Package,
        manifest: Value,
        is_full_manifests: bool,
    ) -> RegistryResult<Value> {
        let fullname = package.fullname();
        let Some(version) = manifest.get("version").and_then(Value::as_str) else {
            return Ok(manifest);
        };
        let Some(advice) = bug_version.fix_version(&fullname, version) else {
            return Ok(manifest);
        };
        let Some(fixed) = self.read_version_manifest(package, &advice.version, is_full_manifests)?
        else {
            return Ok(manifest);
        };
        Ok(bug_version.fix_manifest(&manifest, &fixed).unwrap_or(manifest))
    }

    pub fn read_version_manifest(
        &self,
        package: &Package,
        version: &str,
        is_full_manifests: bool,
    ) -> RegistryResult<Option<Value>> {
        let Some(package_version) = self
            .database
            .find_package_version(&package.package_id, version)?
        else {
            return Ok(None);
        };
        let dist_id = if is_full_manifests {
            package_version.manifest_dist_id
        } else {
            package_version.abbreviated_dist_id
        };
        self.dists.read_json_by_id(dist_id)
    }

    /// Resolves `fullname@spec` without loading the package first
    pub fn resolve(&self, fullname: &str, raw_spec: &str) -> RegistryResult<Option<String>> {
        let spec = PackageSpec::parse(fullname, raw_spec)?;
        debug!("Resolving {fullname}@{raw_spec} as {:?}", spec.kind);
        self.get_version(&spec, true)
    }
}
