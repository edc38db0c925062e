use crate::services::bug_version::BugVersionService;
use crate::services::cache::ManifestCacheService;
use crate::services::events::{EventHandler, HandlerError, RegistryEvent};
use log::debug;
use std::sync::Arc;

/// Evicts the cached manifests of any package that changed
pub struct CacheCleanerHandler {
    cache: Arc<ManifestCacheService>,
}

impl CacheCleanerHandler {
    pub fn new(cache: Arc<ManifestCacheService>) -> Self {
        Self { cache }
    }
}

impl EventHandler for CacheCleanerHandler {
    fn name(&self) -> &str {
        "cache-cleaner"
    }

    fn handle(&self, event: &RegistryEvent) -> Result<(), HandlerError> {
        if !self.cache.is_enabled() {
            return Ok(());
        }
        self.cache
            .remove_cache(event.fullname())
            .map_err(|e| HandlerError::Recoverable(e.to_string()))
    }
}

/// Reloads the advisory when the advisory package moves, then evicts the
/// cached manifests of every advised package
pub struct BugVersionFixHandler {
    bug_versions: Arc<BugVersionService>,
}

impl BugVersionFixHandler {
    pub fn new(bug_versions: Arc<BugVersionService>) -> Self {
        Self { bug_versions }
    }
}

impl EventHandler for BugVersionFixHandler {
    fn name(&self) -> &str {
        "bug-version-fix"
    }

    fn handle(&self, event: &RegistryEvent) -> Result<(), HandlerError> {
        let relevant = matches!(
            event,
            RegistryEvent::VersionAdded { .. }
                | RegistryEvent::TagAdded { .. }
                | RegistryEvent::TagChanged { .. }
        );
        if !relevant || event.fullname() != self.bug_versions.advisory_package() {
            return Ok(());
        }

        debug!("Advisory package changed: {:?}", event);
        self.bug_versions.invalidate();
        let Some(bug_version) = self.bug_versions.get_bug_version() else {
            return Err(HandlerError::Recoverable(
                "advisory package has no readable latest manifest".to_string(),
            ));
        };
        self.bug_versions.clean_bug_version_package_caches(&bug_version);
        Ok(())
    }
}
