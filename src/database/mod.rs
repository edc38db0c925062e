//! Database module providing organized access to all database operations
//!
//! This module is organized into several sub-modules:
//! - `connection`: Database connection management and pool configuration
//! - `packages`, `versions`, `package_tags`: package identity, versions and dist-tags
//! - `dists`: blob metadata rows
//! - `blocks`, `maintainers`, `downloads`: per-package side tables
//! - `service`: Main DatabaseService that provides a unified interface

pub mod blocks;
pub mod connection;
pub mod dists;
pub mod downloads;
pub mod maintainers;
pub mod package_tags;
pub mod packages;
pub mod service;
pub mod versions;

// Re-export the main types and service for easy access
pub use connection::{DbConnection, DbPool, MIGRATIONS, is_unique_violation};
pub use service::DatabaseService;

// Re-export operation structs for advanced usage
pub use blocks::BlockOperations;
pub use dists::DistOperations;
pub use downloads::DownloadOperations;
pub use maintainers::MaintainerOperations;
pub use packages::PackageOperations;
pub use versions::VersionOperations;
