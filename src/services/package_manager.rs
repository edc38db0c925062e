use crate::config::AppConfig;
use crate::database::{DatabaseService, is_unique_violation};
use crate::error::{RegistryError, RegistryResult};
use crate::models::*;
use crate::services::bug_version::BugVersionService;
use crate::services::cache::{ManifestCacheService, ManifestKind};
use crate::services::dist::{DistDownload, DistRepository, DistSource};
use crate::services::events::{EventBus, RegistryEvent};
use crate::services::lock::LockService;
use crate::services::package_version::PackageVersionService;
use crate::version::{PackageSpec, PaddingSemVer, fullname, parse_strict, precedence};
use chrono::{NaiveDate, NaiveDateTime, SecondsFormat};
use log::{debug, info, warn};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;

fn iso_time(time: NaiveDateTime) -> String {
    time.and_utc().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Names and versions become directories in the blob store.
fn check_path_segment(kind: &str, value: &str, allow_empty: bool) -> RegistryResult<()> {
    let invalid = (value.is_empty() && !allow_empty)
        || value.contains(['/', '\\', '\0'])
        || value.contains("..")
        || value == ".";
    if invalid {
        return Err(RegistryError::Unprocessable(format!("invalid package {kind}: {value:?}")));
    }
    Ok(())
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((index, _)) => text[..index].to_string(),
        None => text.to_string(),
    }
}

/// Owns the package lifecycle and keeps the two package level manifest
/// documents (full and abbreviated) in sync with versions, tags,
/// maintainers, deprecations and blocks.
#[derive(Debug)]
pub struct PackageManagerService {
    config: AppConfig,
    database: Arc<DatabaseService>,
    dists: DistRepository,
    versions: PackageVersionService,
    bug_versions: Arc<BugVersionService>,
    cache: Arc<ManifestCacheService>,
    events: Arc<EventBus>,
    locks: Arc<LockService>,
}

impl PackageManagerService {
    pub fn new(
        config: AppConfig,
        database: Arc<DatabaseService>,
        dists: DistRepository,
        bug_versions: Arc<BugVersionService>,
        cache: Arc<ManifestCacheService>,
        events: Arc<EventBus>,
        locks: Arc<LockService>,
    ) -> Self {
        let versions = PackageVersionService::new(
            Arc::clone(&database),
            dists.clone(),
            Arc::clone(&bug_versions),
        );
        Self {
            config,
            database,
            dists,
            versions,
            bug_versions,
            cache,
            events,
            locks,
        }
    }

    pub fn version_service(&self) -> &PackageVersionService {
        &self.versions
    }

    fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.config.lock_timeout_ms)
    }

    fn tarball_url(&self, package: &Package, version: &str) -> String {
        format!(
            "{}/{}/-/{}",
            self.config.registry_host.trim_end_matches('/'),
            package.fullname(),
            package.tarball_filename(version)
        )
    }

    // ---- lookups ----

    pub fn find_package(&self, scope: &str, name: &str) -> RegistryResult<Option<Package>> {
        Ok(self.database.find_package(scope, name)?)
    }

    /// Like [`Self::find_package`] but absent packages are an error
    pub fn get_package(&self, scope: &str, name: &str) -> RegistryResult<Package> {
        self.find_package(scope, name)?
            .ok_or_else(|| RegistryError::NotFound(fullname(scope, name)))
    }

    pub fn find_package_version(
        &self,
        package: &Package,
        version: &str,
    ) -> RegistryResult<Option<PackageVersion>> {
        Ok(self.database.find_package_version(&package.package_id, version)?)
    }

    pub fn list_package_versions(&self, package: &Package) -> RegistryResult<Vec<PackageVersion>> {
        Ok(self.database.list_package_versions(&package.package_id)?)
    }

    pub fn list_package_tags(&self, package: &Package) -> RegistryResult<Vec<PackageTag>> {
        Ok(self.database.list_package_tags(&package.package_id)?)
    }

    pub fn list_package_maintainers(&self, package: &Package) -> RegistryResult<Vec<Maintainer>> {
        Ok(self.database.list_maintainers(&package.package_id)?)
    }

    pub fn list_package_downloads(
        &self,
        package: &Package,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RegistryResult<Vec<PackageVersionDownload>> {
        Ok(self.database.list_downloads(&package.package_id, start, end)?)
    }

    fn reload(&self, package: &Package) -> RegistryResult<Package> {
        self.database
            .find_package_by_package_id(&package.package_id)?
            .ok_or_else(|| RegistryError::NotFound(package.fullname()))
    }

    // ---- publish ----

    pub fn publish(&self, cmd: PublishPackageCmd, publisher: &Maintainer) -> RegistryResult<PackageVersion> {
        let display_name = fullname(&cmd.scope, &cmd.name);
        check_path_segment("scope", cmd.scope.strip_prefix('@').unwrap_or(&cmd.scope), true)?;
        check_path_segment("name", &cmd.name, false)?;
        check_path_segment("version", &cmd.version, false)?;
        if !cmd.package_json.is_object() {
            return Err(RegistryError::Unprocessable(format!(
                "package.json of {display_name}@{} is not an object",
                cmd.version
            )));
        }
        // fails on components wider than the padding before anything is stored
        PaddingSemVer::new(&cmd.version)?;

        let description = truncate_chars(
            cmd.description.as_deref().unwrap_or_default(),
            self.config.description_max_length,
        );
        let existing = self.database.find_package(&cmd.scope, &cmd.name)?;
        if let Some(package) = &existing {
            if self
                .database
                .find_package_version(&package.package_id, &cmd.version)?
                .is_some()
            {
                return Err(RegistryError::Conflict(format!(
                    "Can't modify pre-existing version: {display_name}@{}",
                    cmd.version
                )));
            }
        }

        let package = match existing {
            Some(package) => {
                if package.description != description || package.is_private != cmd.is_private {
                    self.database
                        .update_package_info(&package.package_id, &description, cmd.is_private)?
                } else {
                    package
                }
            }
            None => self.database.create_package(&NewPackage::new(
                &cmd.scope,
                &cmd.name,
                cmd.is_private,
                description,
            ))?,
        };
        let fullname = package.fullname();

        let publish_time = chrono::Utc::now().naive_utc();
        let package_version_id = uuid::Uuid::new_v4().to_string();
        let mut saved = Vec::with_capacity(4);
        let stored = self
            .store_version_dists(&package, &cmd, &package_version_id, publish_time, &mut saved)
            .and_then(|dist_ids| {
                NewPackageVersion::new(
                    &package_version_id,
                    &package.package_id,
                    &cmd.version,
                    dist_ids,
                    publish_time,
                )
            });
        let created = stored.and_then(|new_version| {
            self.database
                .create_package_version(&new_version)
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        // a concurrent publish of the same version won
                        RegistryError::Conflict(format!(
                            "Can't modify pre-existing version: {fullname}@{}",
                            cmd.version
                        ))
                    } else {
                        e.into()
                    }
                })
        });
        let package_version = match created {
            Ok(package_version) => package_version,
            Err(e) => {
                // blobs of this attempt live under its own version id
                if let Err(cleanup) = self.dists.destroy_dists(&saved) {
                    warn!("Failed to clean up dists of {fullname}@{}: {cleanup}", cmd.version);
                }
                return Err(e);
            }
        };
        info!("Published {fullname}@{}", cmd.version);

        if self.database.add_maintainer(&package.package_id, publisher)? {
            self.events
                .emit(RegistryEvent::MaintainerChanged { fullname: fullname.clone() })?;
        }

        if !cmd.skip_refresh_package_manifests {
            self.refresh_package_change_versions_to_dists(&package, &[cmd.version.clone()], &[])?;
        }
        if let Some(tag) = &cmd.tag {
            self.save_tag(&package, tag, &cmd.version, true)?;
        }
        self.events.emit(RegistryEvent::VersionAdded {
            fullname,
            version: cmd.version,
            tag: cmd.tag,
        })?;

        Ok(package_version)
    }

    /// Writes the tarball, readme and both manifests of a new version,
    /// pushing each created dist id onto `saved`.
    fn store_version_dists(
        &self,
        package: &Package,
        cmd: &PublishPackageCmd,
        package_version_id: &str,
        publish_time: NaiveDateTime,
        saved: &mut Vec<i32>,
    ) -> RegistryResult<VersionDistIds> {
        let fullname = package.fullname();
        let path = |filename: &str| package.version_dist_path(&cmd.version, package_version_id, filename);

        let tarball_filename = package.tarball_filename(&cmd.version);
        let tarball = self.dists.save_dist(
            &tarball_filename,
            &path(&tarball_filename),
            match &cmd.dist {
                TarballSource::Bytes(bytes) => DistSource::Bytes(bytes),
                TarballSource::File(file) => DistSource::File(file),
            },
        )?;
        saved.push(tarball.id);

        let mut manifest = cmd.package_json.clone();
        {
            let dist = object_field(&mut manifest, "dist");
            dist.insert("tarball".into(), json!(self.tarball_url(package, &cmd.version)));
            dist.insert("shasum".into(), json!(tarball.shasum));
            dist.insert("integrity".into(), json!(tarball.integrity));
            dist.insert("size".into(), json!(tarball.size));
        }
        if let Some(object) = manifest.as_object_mut() {
            object.insert("_id".into(), json!(format!("{fullname}@{}", cmd.version)));
            object.insert("name".into(), json!(fullname));
            object.insert("version".into(), json!(cmd.version));
            object.insert(
                "publish_time".into(),
                json!(publish_time.and_utc().timestamp_millis()),
            );
        }
        let abbreviated = abbreviated_manifest(&manifest, &self.config.source_registry_name);

        let readme = self
            .dists
            .save_dist("readme", &path("readme"), DistSource::Bytes(cmd.readme.as_bytes()))?;
        saved.push(readme.id);
        let manifest_dist = self
            .dists
            .save_json("package.json", &path("package.json"), &manifest)?;
        saved.push(manifest_dist.id);
        let abbreviated_dist = self
            .dists
            .save_json("abbreviated.json", &path("abbreviated.json"), &abbreviated)?;
        saved.push(abbreviated_dist.id);

        Ok(VersionDistIds {
            manifest: manifest_dist.id,
            abbreviated: abbreviated_dist.id,
            tarball: tarball.id,
            readme: readme.id,
        })
    }

    // ---- dist-tags ----

    /// Points `tag` at `version`. Returns false when nothing changed.
    pub fn save_package_tag(&self, package: &Package, tag: &str, version: &str) -> RegistryResult<bool> {
        self.save_tag(package, tag, version, false)
    }

    fn save_tag(&self, package: &Package, tag: &str, version: &str, skip_event: bool) -> RegistryResult<bool> {
        if self.find_package_version(package, version)?.is_none() {
            return Err(RegistryError::NotFound(format!(
                "{}@{version}",
                package.fullname()
            )));
        }

        let event = match self.database.find_package_tag(&package.package_id, tag)? {
            None => {
                self.database.create_package_tag(&package.package_id, tag, version)?;
                RegistryEvent::TagAdded {
                    fullname: package.fullname(),
                    tag: tag.to_string(),
                }
            }
            Some(existing) if existing.version == version => return Ok(false),
            Some(existing) => {
                self.database.update_package_tag(&existing.package_tag_id, version)?;
                RegistryEvent::TagChanged {
                    fullname: package.fullname(),
                    tag: tag.to_string(),
                }
            }
        };
        debug!("Tagged {}@{version} as {tag}", package.fullname());

        self.refresh_package_dist_tags_to_dists(package)?;
        if !skip_event {
            self.events.emit(event)?;
        }
        Ok(true)
    }

    pub fn remove_package_tag(&self, package: &Package, tag: &str) -> RegistryResult<bool> {
        let Some(existing) = self.database.find_package_tag(&package.package_id, tag)? else {
            return Ok(false);
        };
        self.database.remove_package_tag(&existing.package_tag_id)?;
        self.refresh_package_dist_tags_to_dists(package)?;
        self.events.emit(RegistryEvent::TagRemoved {
            fullname: package.fullname(),
            tag: tag.to_string(),
        })?;
        Ok(true)
    }

    // ---- manifest synthesis ----

    /// Applies added and removed versions to the package manifests, falling
    /// back to a full rebuild when either document is missing.
    pub fn refresh_package_change_versions_to_dists(
        &self,
        package: &Package,
        added_versions: &[String],
        removed_versions: &[String],
    ) -> RegistryResult<()> {
        let _guard = self.lock_manifests(package)?;
        let package = self.reload(package)?;

        let Some((mut full, mut abbreviated)) = self.read_package_manifests(&package)? else {
            return self.rebuild_package_manifests(&package);
        };

        for version in added_versions {
            let Some(package_version) = self.find_package_version(&package, version)? else {
                warn!("Skipping refresh of missing version {}@{version}", package.fullname());
                continue;
            };
            let Some(mut manifest) = self
                .dists
                .read_json_by_id::<Value>(package_version.manifest_dist_id)?
            else {
                continue;
            };
            if let Some(object) = manifest.as_object_mut() {
                object.remove("readme");
            }
            object_field(&mut full, "versions").insert(version.clone(), manifest);
            object_field(&mut full, "time")
                .insert(version.clone(), json!(iso_time(package_version.publish_time)));

            if let Some(abbreviated_manifest) = self
                .dists
                .read_json_by_id::<Value>(package_version.abbreviated_dist_id)?
            {
                object_field(&mut abbreviated, "versions")
                    .insert(version.clone(), abbreviated_manifest);
            }
        }

        for version in removed_versions {
            object_field(&mut full, "versions").shift_remove(version);
            object_field(&mut full, "time").shift_remove(version);
            object_field(&mut abbreviated, "versions").shift_remove(version);
        }

        if let Some(object) = full.as_object_mut() {
            object.insert(
                "maintainers".into(),
                serde_json::to_value(self.list_package_maintainers(&package)?)?,
            );
        }
        self.set_dist_tags_and_latest_infos(&package, &mut full, &mut abbreviated)?;
        self.write_package_manifests(&package, &full, &abbreviated)
    }

    /// Rebuilds both manifests from every stored version
    pub fn refresh_package_manifests_to_dists(&self, package: &Package) -> RegistryResult<()> {
        let _guard = self.lock_manifests(package)?;
        let package = self.reload(package)?;
        self.rebuild_package_manifests(&package)
    }

    fn rebuild_package_manifests(&self, package: &Package) -> RegistryResult<()> {
        let fullname = package.fullname();
        let now = iso_time(chrono::Utc::now().naive_utc());

        let mut versions = Map::new();
        let mut abbreviated_versions = Map::new();
        let mut time = Map::new();
        time.insert("created".into(), json!(iso_time(package.created_at)));
        time.insert("modified".into(), json!(now));

        let package_versions = self.list_package_versions(package)?;
        for package_version in &package_versions {
            let version = &package_version.version;
            if let Some(mut manifest) = self
                .dists
                .read_json_by_id::<Value>(package_version.manifest_dist_id)?
            {
                if let Some(object) = manifest.as_object_mut() {
                    object.remove("readme");
                }
                versions.insert(version.clone(), manifest);
                time.insert(version.clone(), json!(iso_time(package_version.publish_time)));
            }
            if let Some(manifest) = self
                .dists
                .read_json_by_id::<Value>(package_version.abbreviated_dist_id)?
            {
                abbreviated_versions.insert(version.clone(), manifest);
            }
        }

        let mut full = json!({
            "_id": fullname,
            "_rev": package.rev(),
            "name": fullname,
            "dist-tags": {},
            "maintainers": self.list_package_maintainers(package)?,
            "time": time,
            "versions": versions,
            "readme": "",
        });
        let mut abbreviated = json!({
            "dist-tags": {},
            "modified": now,
            "name": fullname,
            "versions": abbreviated_versions,
        });

        if let Some(block) = self.database.find_block(&package.package_id, BLOCK_ALL_VERSIONS)? {
            full["block"] = json!(block.reason);
            abbreviated["block"] = json!(block.reason);
        }

        self.set_dist_tags_and_latest_infos(package, &mut full, &mut abbreviated)?;
        info!(
            "Rebuilt manifests of {fullname} from {} versions",
            package_versions.len()
        );
        self.write_package_manifests(package, &full, &abbreviated)
    }

    fn refresh_package_dist_tags_to_dists(&self, package: &Package) -> RegistryResult<()> {
        let _guard = self.lock_manifests(package)?;
        let package = self.reload(package)?;

        let Some((mut full, mut abbreviated)) = self.read_package_manifests(&package)? else {
            return self.rebuild_package_manifests(&package);
        };
        self.set_dist_tags_and_latest_infos(&package, &mut full, &mut abbreviated)?;
        self.write_package_manifests(&package, &full, &abbreviated)
    }

    /// Patches root attributes of both documents without touching versions
    fn refresh_package_root_attributes<F>(&self, package: &Package, patch: F) -> RegistryResult<()>
    where
        F: Fn(&mut Map<String, Value>),
    {
        let _guard = self.lock_manifests(package)?;
        let package = self.reload(package)?;

        let Some((mut full, mut abbreviated)) = self.read_package_manifests(&package)? else {
            return self.rebuild_package_manifests(&package);
        };
        for document in [&mut full, &mut abbreviated] {
            if let Some(object) = document.as_object_mut() {
                patch(object);
            }
        }
        self.write_package_manifests(&package, &full, &abbreviated)
    }

    /// Copies dist-tags into both documents and hoists the `latest` version's
    /// root fields and readme into the full one.
    fn set_dist_tags_and_latest_infos(
        &self,
        package: &Package,
        full: &mut Value,
        abbreviated: &mut Value,
    ) -> RegistryResult<()> {
        let dist_tags = self.database.get_package_tags_map(&package.package_id)?;
        let modified = iso_time(chrono::Utc::now().naive_utc());

        let latest = match dist_tags.get(LATEST_TAG) {
            Some(version) => self.find_package_version(package, version)?,
            None => None,
        };
        if let Some(latest) = latest {
            let manifest = self
                .dists
                .read_json_by_id::<Value>(latest.manifest_dist_id)?
                .unwrap_or(Value::Null);
            let readme = match self.dists.find_dist(latest.readme_dist_id)? {
                Some(dist) => self.dists.read_dist_string(&dist)?.unwrap_or_default(),
                None => String::new(),
            };

            if let Some(object) = full.as_object_mut() {
                for field in LATEST_MANIFEST_FIELDS {
                    match manifest.get(field) {
                        Some(value) => {
                            object.insert(field.to_string(), value.clone());
                        }
                        None => {
                            object.remove(field);
                        }
                    }
                }
                object.insert("readme".into(), json!(readme));
            }
        }

        let dist_tags = serde_json::to_value(&dist_tags)?;
        if let Some(object) = full.as_object_mut() {
            object.insert("dist-tags".into(), dist_tags.clone());
            object.insert("_rev".into(), json!(package.rev()));
        }
        object_field(full, "time").insert("modified".into(), json!(modified));
        if let Some(object) = abbreviated.as_object_mut() {
            object.insert("dist-tags".into(), dist_tags);
            object.insert("modified".into(), json!(modified));
        }
        Ok(())
    }

    fn read_package_manifests(&self, package: &Package) -> RegistryResult<Option<(Value, Value)>> {
        let (Some(manifests_id), Some(abbreviateds_id)) =
            (package.manifests_dist_id, package.abbreviateds_dist_id)
        else {
            return Ok(None);
        };
        let full = self.dists.read_json_by_id::<Value>(manifests_id)?;
        let abbreviated = self.dists.read_json_by_id::<Value>(abbreviateds_id)?;
        match (full, abbreviated) {
            (Some(full), Some(abbreviated)) if full.is_object() && abbreviated.is_object() => {
                Ok(Some((full, abbreviated)))
            }
            _ => {
                warn!("Manifests of {} are unreadable, rebuilding", package.fullname());
                Ok(None)
            }
        }
    }

    fn write_package_manifests(
        &self,
        package: &Package,
        full: &Value,
        abbreviated: &Value,
    ) -> RegistryResult<()> {
        let manifests = match package.manifests_dist_id {
            Some(id) => self.dists.find_dist(id)?,
            None => None,
        };
        let manifests = match manifests {
            Some(dist) => self.dists.update_json(&dist, full)?,
            None => self
                .dists
                .save_json("package.json", &package.manifests_dist_path(), full)?,
        };

        let abbreviateds = match package.abbreviateds_dist_id {
            Some(id) => self.dists.find_dist(id)?,
            None => None,
        };
        let abbreviateds = match abbreviateds {
            Some(dist) => self.dists.update_json(&dist, abbreviated)?,
            None => self.dists.save_json(
                "abbreviated.json",
                &package.abbreviateds_dist_path(),
                abbreviated,
            )?,
        };

        self.database
            .update_package_dists(&package.package_id, manifests.id, abbreviateds.id)?;
        Ok(())
    }

    fn lock_manifests(&self, package: &Package) -> RegistryResult<crate::services::lock::LockGuard<'_>> {
        self.locks.acquire(
            &format!("{}:refresh-manifests", package.package_id),
            self.lock_timeout(),
        )
    }

    // ---- block / deprecate / maintainers ----

    pub fn block_package(&self, package: &Package, reason: &str) -> RegistryResult<PackageVersionBlock> {
        let block = self
            .database
            .save_block(&package.package_id, BLOCK_ALL_VERSIONS, reason)?;
        let reason = reason.to_string();
        self.refresh_package_root_attributes(package, |document| {
            document.insert("block".into(), json!(reason));
        })?;
        info!("Blocked {}: {}", package.fullname(), block.reason);
        self.events.emit(RegistryEvent::PackageBlocked {
            fullname: package.fullname(),
        })?;
        Ok(block)
    }

    /// Returns false when the package was not blocked
    pub fn unblock_package(&self, package: &Package) -> RegistryResult<bool> {
        let Some(block) = self
            .database
            .find_block(&package.package_id, BLOCK_ALL_VERSIONS)?
        else {
            return Ok(false);
        };
        self.database.remove_block(block.id)?;
        self.refresh_package_root_attributes(package, |document| {
            document.remove("block");
        })?;
        info!("Unblocked {}", package.fullname());
        self.events.emit(RegistryEvent::PackageUnblocked {
            fullname: package.fullname(),
        })?;
        Ok(true)
    }

    pub fn find_package_block(&self, package: &Package) -> RegistryResult<Option<PackageVersionBlock>> {
        Ok(self
            .database
            .find_block(&package.package_id, BLOCK_ALL_VERSIONS)?)
    }

    /// Writes each deprecation message into the version blobs (an empty
    /// message clears it), then refreshes those versions in the manifests.
    pub fn save_deprecated_versions(
        &self,
        package: &Package,
        deprecated_versions: &[DeprecatedVersion],
    ) -> RegistryResult<Vec<String>> {
        let mut updated = Vec::with_capacity(deprecated_versions.len());

        for item in deprecated_versions {
            let Some(package_version) = self.find_package_version(package, &item.version)? else {
                debug!("Skipping deprecation of missing {}@{}", package.fullname(), item.version);
                continue;
            };
            let _guard = self.locks.acquire(
                &format!("{}:deprecate", package_version.package_version_id),
                self.lock_timeout(),
            )?;

            for dist_id in [package_version.manifest_dist_id, package_version.abbreviated_dist_id] {
                let Some(dist) = self.dists.find_dist(dist_id)? else {
                    continue;
                };
                let Some(mut manifest) = self.dists.read_dist_bytes_to_json::<Value>(&dist)? else {
                    continue;
                };
                if let Some(object) = manifest.as_object_mut() {
                    if item.deprecated.is_empty() {
                        object.remove("deprecated");
                    } else {
                        object.insert("deprecated".into(), json!(item.deprecated));
                    }
                }
                self.dists.update_json(&dist, &manifest)?;
            }
            self.database
                .touch_package_version(&package_version.package_version_id)?;
            updated.push(item.version.clone());
        }

        if !updated.is_empty() {
            self.refresh_package_change_versions_to_dists(package, &updated, &[])?;
            self.events.emit(RegistryEvent::VersionDeprecated {
                fullname: package.fullname(),
                versions: updated.clone(),
            })?;
        }
        Ok(updated)
    }

    pub fn replace_package_maintainers(
        &self,
        package: &Package,
        maintainers: &[Maintainer],
    ) -> RegistryResult<()> {
        self.database
            .replace_maintainers(&package.package_id, maintainers)?;
        let maintainers = serde_json::to_value(maintainers)?;
        self.refresh_package_root_attributes(package, |document| {
            // only the full document lists maintainers
            if document.contains_key("_id") {
                document.insert("maintainers".into(), maintainers.clone());
            }
        })?;
        self.events.emit(RegistryEvent::MaintainerChanged {
            fullname: package.fullname(),
        })?;
        Ok(())
    }

    /// Stores the description, cut to the configured length
    pub fn update_package_description(&self, package: &Package, description: &str) -> RegistryResult<Package> {
        let description = truncate_chars(description, self.config.description_max_length);
        Ok(self
            .database
            .update_package_info(&package.package_id, &description, package.is_private)?)
    }

    // ---- removal ----

    fn remove_version_and_dists(&self, package_version: &PackageVersion) -> RegistryResult<()> {
        let ids = package_version.dist_ids();
        self.database
            .remove_package_version(&package_version.package_version_id)?;
        self.dists
            .destroy_dists(&[ids.manifest, ids.abbreviated, ids.tarball, ids.readme])
    }

    /// Deletes every version and replaces both manifests with an
    /// "unpublished" stub. The package row stays.
    pub fn unpublish_package(&self, package: &Package) -> RegistryResult<()> {
        let package_versions = self.list_package_versions(package)?;
        if package_versions.is_empty() {
            info!("{} has no versions left to unpublish", package.fullname());
            return Ok(());
        }

        let removed: Vec<String> = package_versions.iter().map(|v| v.version.clone()).collect();
        for package_version in &package_versions {
            self.remove_version_and_dists(package_version)?;
        }
        self.database.remove_all_package_tags(&package.package_id)?;

        let fullname = package.fullname();
        let now = iso_time(chrono::Utc::now().naive_utc());
        let full = json!({
            "_id": fullname,
            "_rev": package.rev(),
            "name": fullname,
            "dist-tags": {},
            "maintainers": self.list_package_maintainers(package)?,
            "time": {
                "created": iso_time(package.created_at),
                "modified": now,
                "unpublished": {
                    "time": now,
                    "versions": removed,
                },
            },
            "versions": {},
        });
        let abbreviated = json!({
            "dist-tags": {},
            "modified": now,
            "name": fullname,
            "versions": {},
        });
        {
            let _guard = self.lock_manifests(package)?;
            let package = self.reload(package)?;
            self.write_package_manifests(&package, &full, &abbreviated)?;
        }

        info!("Unpublished {fullname} ({} versions)", removed.len());
        self.events
            .emit(RegistryEvent::PackageUnpublished { fullname })?;
        Ok(())
    }

    /// Removes one version. Removing the last version unpublishes the
    /// package; removing the `latest` version moves `latest` to the highest
    /// remaining version.
    pub fn remove_package_version(&self, package: &Package, package_version: &PackageVersion) -> RegistryResult<()> {
        let package_versions = self.list_package_versions(package)?;
        if package_versions.len() <= 1 {
            return self.unpublish_package(package);
        }

        self.remove_version_and_dists(package_version)?;
        let removed = package_version.version.clone();

        let remaining: Vec<&PackageVersion> = package_versions
            .iter()
            .filter(|v| v.package_version_id != package_version.package_version_id)
            .collect();
        let next_latest = remaining
            .iter()
            .filter_map(|v| parse_strict(&v.version).map(|parsed| (v, parsed)))
            .max_by(|(_, a), (_, b)| precedence(a, b))
            .map(|(v, _)| v.version.clone())
            .or_else(|| remaining.last().map(|v| v.version.clone()));

        for tag in self.list_package_tags(package)? {
            if tag.version != removed {
                continue;
            }
            match (&next_latest, tag.tag == LATEST_TAG) {
                (Some(next), true) => {
                    self.database.update_package_tag(&tag.package_tag_id, next)?;
                    debug!("Moved {}@latest to {next}", package.fullname());
                }
                _ => {
                    self.database.remove_package_tag(&tag.package_tag_id)?;
                }
            }
        }

        self.refresh_package_change_versions_to_dists(package, &[], &[removed.clone()])?;
        self.events.emit(RegistryEvent::VersionRemoved {
            fullname: package.fullname(),
            version: removed,
        })?;
        Ok(())
    }

    // ---- reads ----

    /// Package level manifest as stored, with the advisory applied unless
    /// `is_sync`. A blocked package yields no data and its block reason.
    pub fn list_package_manifests(
        &self,
        scope: &str,
        name: &str,
        is_sync: bool,
        is_full_manifests: bool,
    ) -> RegistryResult<PackageManifestsResult> {
        let empty = PackageManifestsResult {
            etag: String::new(),
            data: None,
            block_reason: String::new(),
        };
        let Some(mut package) = self.find_package(scope, name)? else {
            return Ok(empty);
        };
        if let Some(block) = self.find_package_block(&package)? {
            return Ok(PackageManifestsResult {
                block_reason: block.reason,
                ..empty
            });
        }

        let dist_id = if is_full_manifests {
            package.manifests_dist_id
        } else {
            package.abbreviateds_dist_id
        };
        if dist_id.is_none() {
            self.refresh_package_manifests_to_dists(&package)?;
            package = self.reload(&package)?;
        }
        let dist_id = if is_full_manifests {
            package.manifests_dist_id
        } else {
            package.abbreviateds_dist_id
        };
        let Some(mut data) = (match dist_id {
            Some(id) => self.dists.read_json_by_id::<Value>(id)?,
            None => None,
        }) else {
            return Ok(empty);
        };

        if !is_sync {
            let fullname = package.fullname();
            if let Some(bug_version) = self
                .bug_versions
                .get_bug_version()
                .filter(|bug_version| bug_version.has_bug_versions(&fullname))
            {
                self.bug_versions.fix_package_bug_versions(
                    &bug_version,
                    &fullname,
                    object_field(&mut data, "versions"),
                );
            }
        }

        let bytes = serde_json::to_vec(&data)?;
        let etag = format!("\"{}\"", crate::services::dist::calculate_integrity(&bytes).shasum);
        Ok(PackageManifestsResult {
            etag,
            data: Some(data),
            block_reason: String::new(),
        })
    }

    pub fn list_package_full_manifests(
        &self,
        scope: &str,
        name: &str,
        is_sync: bool,
    ) -> RegistryResult<PackageManifestsResult> {
        self.list_package_manifests(scope, name, is_sync, true)
    }

    pub fn list_package_abbreviated_manifests(
        &self,
        scope: &str,
        name: &str,
        is_sync: bool,
    ) -> RegistryResult<PackageManifestsResult> {
        self.list_package_manifests(scope, name, is_sync, false)
    }

    /// Serialized manifests through the response cache. Blocked and missing
    /// packages are never cached.
    pub fn list_package_manifests_cached(
        &self,
        scope: &str,
        name: &str,
        is_full_manifests: bool,
    ) -> RegistryResult<Result<CacheEntry, PackageManifestsResult>> {
        let fullname = fullname(scope, name);
        let kind = if is_full_manifests {
            ManifestKind::Full
        } else {
            ManifestKind::Abbreviated
        };
        if let Some(entry) = self.cache.get(&fullname, kind) {
            return Ok(Ok(entry));
        }

        let generation = self.cache.generation(&fullname);
        let result = self.list_package_manifests(scope, name, false, is_full_manifests)?;
        let Some(data) = &result.data else {
            return Ok(Err(result));
        };
        let entry = CacheEntry {
            data: serde_json::to_vec(data)?,
            etag: result.etag.clone(),
        };
        if let Err(e) = self
            .cache
            .save_if_current(&fullname, kind, &entry, generation)
        {
            warn!("Failed to cache manifests of {fullname}: {e}");
        }
        Ok(Ok(entry))
    }

    /// One version manifest resolved from `spec`
    pub fn show_package_version_manifest(
        &self,
        scope: &str,
        name: &str,
        spec: &str,
        is_sync: bool,
        is_full_manifests: bool,
    ) -> RegistryResult<VersionManifestResult> {
        let Some(package) = self.find_package(scope, name)? else {
            return Ok(VersionManifestResult {
                manifest: None,
                block_reason: None,
                package: None,
            });
        };
        if let Some(block) = self.find_package_block(&package)? {
            return Ok(VersionManifestResult {
                manifest: None,
                block_reason: Some(block.reason),
                package: Some(package),
            });
        }

        let spec = PackageSpec::parse(&package.fullname(), spec)?;
        let manifest = self
            .versions
            .read_manifest(&package, &spec, is_full_manifests, !is_sync)?;
        Ok(VersionManifestResult {
            manifest,
            block_reason: None,
            package: Some(package),
        })
    }

    /// Tarball addressed by its npm filename (`foo-1.0.0.tgz`)
    pub fn download_tarball(&self, scope: &str, name: &str, filename: &str) -> RegistryResult<TarballLookup> {
        let Some(package) = self.find_package(scope, name)? else {
            return Ok(TarballLookup::Missing);
        };
        if let Some(block) = self.find_package_block(&package)? {
            return Ok(TarballLookup::Blocked(block.reason));
        }
        let Some(version) = filename
            .strip_prefix(&format!("{}-", package.name))
            .and_then(|rest| rest.strip_suffix(".tgz"))
        else {
            return Ok(TarballLookup::Missing);
        };
        let Some(package_version) = self.find_package_version(&package, version)? else {
            return Ok(TarballLookup::Missing);
        };
        let download = match self.dists.find_dist(package_version.tarball_dist_id)? {
            Some(dist) => self.dists.download_dist(&dist)?,
            None => None,
        };
        Ok(match download {
            Some(download) => TarballLookup::Found {
                fullname: package.fullname(),
                version: package_version.version,
                download,
            },
            None => TarballLookup::Missing,
        })
    }
}

/// Outcome of [`PackageManagerService::download_tarball`]
#[derive(Debug)]
pub enum TarballLookup {
    Found {
        fullname: String,
        version: String,
        download: DistDownload,
    },
    Blocked(String),
    Missing,
}
