pub mod bug_version;
pub mod cache;
pub mod dist;
pub mod download_counter;
pub mod events;
pub mod handlers;
pub mod lock;
pub mod package_manager;
pub mod package_version;

pub use bug_version::BugVersionService;
pub use cache::{ManifestCacheService, ManifestKind};
pub use dist::{DistDownload, DistRepository, LocalNfsClient, NfsAdapter};
pub use download_counter::DownloadCounter;
pub use events::{EventBus, EventHandler, HandlerError, RegistryEvent};
pub use handlers::{BugVersionFixHandler, CacheCleanerHandler};
pub use lock::LockService;
pub use package_manager::{PackageManagerService, TarballLookup};
pub use package_version::PackageVersionService;
