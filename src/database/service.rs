use super::blocks::BlockOperations;
use super::connection::{DbConnection, DbPool, connection, create_pool};
use super::dists::DistOperations;
use super::downloads::DownloadOperations;
use super::maintainers::MaintainerOperations;
use super::packages::PackageOperations;
use super::versions::VersionOperations;
use crate::models::*;
use crate::version::SqlRange;
use chrono::NaiveDate;

/// Main database service that provides a unified interface to all database operations
#[derive(Debug)]
pub struct DatabaseService {
    pub pool: DbPool,
}

impl DatabaseService {
    /// Creates a new DatabaseService with an initialized connection pool
    pub fn new(database_url: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let pool = create_pool(database_url)?;
        Ok(Self { pool })
    }

    /// Gets a connection from the pool with retry logic
    pub fn get_connection(&self) -> Result<DbConnection, diesel::result::Error> {
        connection(&self.pool)
    }

    // Package operations
    pub fn find_package(
        &self,
        scope: &str,
        name: &str,
    ) -> Result<Option<Package>, diesel::result::Error> {
        PackageOperations::new(&self.pool).find_package(scope, name)
    }

    pub fn find_package_by_package_id(
        &self,
        package_id: &str,
    ) -> Result<Option<Package>, diesel::result::Error> {
        PackageOperations::new(&self.pool).find_package_by_package_id(package_id)
    }

    pub fn create_package(&self, new_package: &NewPackage) -> Result<Package, diesel::result::Error> {
        PackageOperations::new(&self.pool).create_package(new_package)
    }

    pub fn update_package_info(
        &self,
        package_id: &str,
        description: &str,
        is_private: bool,
    ) -> Result<Package, diesel::result::Error> {
        PackageOperations::new(&self.pool).update_package_info(package_id, description, is_private)
    }

    pub fn update_package_dists(
        &self,
        package_id: &str,
        manifests_dist_id: i32,
        abbreviateds_dist_id: i32,
    ) -> Result<Package, diesel::result::Error> {
        PackageOperations::new(&self.pool).update_package_dists(
            package_id,
            manifests_dist_id,
            abbreviateds_dist_id,
        )
    }

    // Version operations
    pub fn create_package_version(
        &self,
        new_version: &NewPackageVersion,
    ) -> Result<PackageVersion, diesel::result::Error> {
        VersionOperations::new(&self.pool).create_package_version(new_version)
    }

    pub fn find_package_version(
        &self,
        package_id: &str,
        version: &str,
    ) -> Result<Option<PackageVersion>, diesel::result::Error> {
        VersionOperations::new(&self.pool).find_package_version(package_id, version)
    }

    pub fn list_package_versions(
        &self,
        package_id: &str,
    ) -> Result<Vec<PackageVersion>, diesel::result::Error> {
        VersionOperations::new(&self.pool).list_package_versions(package_id)
    }

    pub fn list_package_version_names(
        &self,
        package_id: &str,
    ) -> Result<Vec<String>, diesel::result::Error> {
        VersionOperations::new(&self.pool).list_package_version_names(package_id)
    }

    pub fn remove_package_version(
        &self,
        package_version_id: &str,
    ) -> Result<usize, diesel::result::Error> {
        VersionOperations::new(&self.pool).remove_package_version(package_version_id)
    }

    pub fn touch_package_version(
        &self,
        package_version_id: &str,
    ) -> Result<usize, diesel::result::Error> {
        VersionOperations::new(&self.pool).touch_package_version(package_version_id)
    }

    pub fn find_max_satisfying_version(
        &self,
        package_id: &str,
        sql_range: &SqlRange,
    ) -> Result<Option<String>, diesel::result::Error> {
        VersionOperations::new(&self.pool).find_max_satisfying_version(package_id, sql_range)
    }

    // Dist operations
    pub fn create_dist(&self, new_dist: &NewDist) -> Result<Dist, diesel::result::Error> {
        DistOperations::new(&self.pool).create_dist(new_dist)
    }

    pub fn find_dist(&self, id: i32) -> Result<Option<Dist>, diesel::result::Error> {
        DistOperations::new(&self.pool).find_dist(id)
    }

    pub fn update_dist(&self, id: i32, changes: &UpdateDist) -> Result<Dist, diesel::result::Error> {
        DistOperations::new(&self.pool).update_dist(id, changes)
    }

    pub fn remove_dists(&self, ids: &[i32]) -> Result<usize, diesel::result::Error> {
        DistOperations::new(&self.pool).remove_dists(ids)
    }

    // Block operations
    pub fn find_block(
        &self,
        package_id: &str,
        version: &str,
    ) -> Result<Option<PackageVersionBlock>, diesel::result::Error> {
        BlockOperations::new(&self.pool).find_block(package_id, version)
    }

    pub fn save_block(
        &self,
        package_id: &str,
        version: &str,
        reason: &str,
    ) -> Result<PackageVersionBlock, diesel::result::Error> {
        BlockOperations::new(&self.pool).save_block(package_id, version, reason)
    }

    pub fn remove_block(&self, id: i32) -> Result<usize, diesel::result::Error> {
        BlockOperations::new(&self.pool).remove_block(id)
    }

    // Maintainer operations
    pub fn list_maintainers(&self, package_id: &str) -> Result<Vec<Maintainer>, diesel::result::Error> {
        MaintainerOperations::new(&self.pool).list_maintainers(package_id)
    }

    pub fn add_maintainer(
        &self,
        package_id: &str,
        maintainer: &Maintainer,
    ) -> Result<bool, diesel::result::Error> {
        MaintainerOperations::new(&self.pool).add_maintainer(package_id, maintainer)
    }

    pub fn replace_maintainers(
        &self,
        package_id: &str,
        maintainers: &[Maintainer],
    ) -> Result<(), diesel::result::Error> {
        MaintainerOperations::new(&self.pool).replace_maintainers(package_id, maintainers)
    }

    // Download operations
    pub fn plus_downloads(
        &self,
        package_id: &str,
        version: &str,
        date: NaiveDate,
        count: i64,
    ) -> Result<usize, diesel::result::Error> {
        DownloadOperations::new(&self.pool).plus_downloads(package_id, version, date, count)
    }

    pub fn list_downloads(
        &self,
        package_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PackageVersionDownload>, diesel::result::Error> {
        DownloadOperations::new(&self.pool).list_downloads(package_id, start, end)
    }
}
