use crate::config::AppConfig;
use crate::database::DatabaseService;
use crate::services::{
    BugVersionFixHandler, BugVersionService, CacheCleanerHandler, DistRepository, DownloadCounter,
    EventBus, LocalNfsClient, LockService, ManifestCacheService, PackageManagerService,
};
use log::info;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug)]
pub struct AppState {
    pub config: AppConfig,
    pub database: Arc<DatabaseService>,
    pub dists: DistRepository,
    pub cache: Arc<ManifestCacheService>,
    pub events: Arc<EventBus>,
    pub locks: Arc<LockService>,
    pub downloads: Arc<DownloadCounter>,
    pub bug_versions: Arc<BugVersionService>,
    pub packages: Arc<PackageManagerService>,
}

impl AppState {
    /// Wires every service once. Handlers are subscribed here, in dispatch order.
    pub fn new(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let data_dir = Path::new(&config.data_dir);
        std::fs::create_dir_all(data_dir)?;

        let database = Arc::new(DatabaseService::new(&config.database_url)?);
        let nfs = Arc::new(LocalNfsClient::new(data_dir.join("nfs"))?);
        let dists = DistRepository::new(Arc::clone(&database), nfs);
        let cache = Arc::new(ManifestCacheService::new(
            data_dir.join("cache"),
            config.cache_enabled,
        )?);
        let events = Arc::new(EventBus::new());
        let locks = Arc::new(LockService::new());
        let bug_versions = Arc::new(BugVersionService::new(
            Arc::clone(&database),
            dists.clone(),
            Arc::clone(&cache),
            &config.bug_versions_package,
        ));

        events.subscribe(Arc::new(CacheCleanerHandler::new(Arc::clone(&cache))));
        events.subscribe(Arc::new(BugVersionFixHandler::new(Arc::clone(&bug_versions))));

        let packages = Arc::new(PackageManagerService::new(
            config.clone(),
            Arc::clone(&database),
            dists.clone(),
            Arc::clone(&bug_versions),
            Arc::clone(&cache),
            Arc::clone(&events),
            Arc::clone(&locks),
        ));

        info!("Registry state ready (data dir: {})", config.data_dir);

        Ok(Self {
            config,
            database,
            dists,
            cache,
            events,
            locks,
            downloads: Arc::new(DownloadCounter::new()),
            bug_versions,
            packages,
        })
    }
}
