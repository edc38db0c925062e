use super::connection::{DbPool, connection};
use crate::models::download::*;
use crate::schema::package_version_downloads;
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::upsert::excluded;

/// Daily download counter operations
pub struct DownloadOperations<'a> {
    pool: &'a DbPool,
}

impl<'a> DownloadOperations<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Adds `count` to the `(package_id, version, date)` counter
    pub fn plus_downloads(
        &self,
        package_id: &str,
        version: &str,
        date: NaiveDate,
        count: i64,
    ) -> Result<usize, diesel::result::Error> {
        let mut conn = connection(self.pool)?;

        diesel::insert_into(package_version_downloads::table)
            .values(&NewPackageVersionDownload {
                package_id: package_id.to_string(),
                version: version.to_string(),
                date,
                count,
            })
            .on_conflict((
                package_version_downloads::package_id,
                package_version_downloads::version,
                package_version_downloads::date,
            ))
            .do_update()
            .set(
                package_version_downloads::count
                    .eq(package_version_downloads::count + excluded(package_version_downloads::count)),
            )
            .execute(&mut conn)
    }

    pub fn list_downloads(
        &self,
        package_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PackageVersionDownload>, diesel::result::Error> {
        let mut conn = connection(self.pool)?;

        package_version_downloads::table
            .filter(package_version_downloads::package_id.eq(package_id))
            .filter(package_version_downloads::date.between(start, end))
            .order((
                package_version_downloads::date.asc(),
                package_version_downloads::version.asc(),
            ))
            .load::<PackageVersionDownload>(&mut conn)
    }
}
