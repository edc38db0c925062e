use super::connection::{DbPool, connection, is_unique_violation};
use crate::models::package::*;
use crate::schema::packages;
use diesel::prelude::*;

/// Package-related database operations
pub struct PackageOperations<'a> {
    pool: &'a DbPool,
}

impl<'a> PackageOperations<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Finds a package by scope (`@scope` or empty) and bare name
    pub fn find_package(
        &self,
        scope: &str,
        name: &str,
    ) -> Result<Option<Package>, diesel::result::Error> {
        let mut conn = connection(self.pool)?;

        packages::table
            .filter(packages::scope.eq(scope))
            .filter(packages::name.eq(name))
            .first::<Package>(&mut conn)
            .optional()
    }

    pub fn find_package_by_package_id(
        &self,
        package_id: &str,
    ) -> Result<Option<Package>, diesel::result::Error> {
        let mut conn = connection(self.pool)?;

        packages::table
            .filter(packages::package_id.eq(package_id))
            .first::<Package>(&mut conn)
            .optional()
    }

    /// Inserts a package; a concurrent creator winning the `(scope, name)`
    /// race is not an error, its row is returned instead
    pub fn create_package(&self, new_package: &NewPackage) -> Result<Package, diesel::result::Error> {
        let mut conn = connection(self.pool)?;

        match diesel::insert_into(packages::table)
            .values(new_package)
            .execute(&mut conn)
        {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {}
            Err(e) => return Err(e),
        }

        packages::table
            .filter(packages::scope.eq(&new_package.scope))
            .filter(packages::name.eq(&new_package.name))
            .first::<Package>(&mut conn)
    }

    pub fn update_package_info(
        &self,
        package_id: &str,
        description: &str,
        is_private: bool,
    ) -> Result<Package, diesel::result::Error> {
        let mut conn = connection(self.pool)?;

        diesel::update(packages::table.filter(packages::package_id.eq(package_id)))
            .set((
                packages::description.eq(description),
                packages::is_private.eq(is_private),
                packages::updated_at.eq(chrono::Utc::now().naive_utc()),
            ))
            .execute(&mut conn)?;

        packages::table
            .filter(packages::package_id.eq(package_id))
            .first::<Package>(&mut conn)
    }

    /// Points the package at its full and abbreviated manifest blobs
    pub fn update_package_dists(
        &self,
        package_id: &str,
        manifests_dist_id: i32,
        abbreviateds_dist_id: i32,
    ) -> Result<Package, diesel::result::Error> {
        let mut conn = connection(self.pool)?;

        diesel::update(packages::table.filter(packages::package_id.eq(package_id)))
            .set((
                packages::manifests_dist_id.eq(Some(manifests_dist_id)),
                packages::abbreviateds_dist_id.eq(Some(abbreviateds_dist_id)),
                packages::updated_at.eq(chrono::Utc::now().naive_utc()),
            ))
            .execute(&mut conn)?;

        packages::table
            .filter(packages::package_id.eq(package_id))
            .first::<Package>(&mut conn)
    }
}
