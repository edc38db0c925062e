use super::connection::{DbPool, connection};
use crate::models::package::*;
use crate::schema::package_versions;
use crate::version::{Condition, Operator, SqlRange};
use diesel::prelude::*;
use diesel::sql_types::Bool;
use diesel::sqlite::Sqlite;

type VersionFilter = Box<dyn BoxableExpression<package_versions::table, Sqlite, SqlType = Bool>>;

/// Package version-related database operations
pub struct VersionOperations<'a> {
    pool: &'a DbPool,
}

impl<'a> VersionOperations<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Inserts a version row. A duplicate `(package_id, version)` surfaces as
    /// a unique violation for the caller to map.
    pub fn create_package_version(
        &self,
        new_version: &NewPackageVersion,
    ) -> Result<PackageVersion, diesel::result::Error> {
        let mut conn = connection(self.pool)?;

        diesel::insert_into(package_versions::table)
            .values(new_version)
            .execute(&mut conn)?;

        package_versions::table
            .filter(package_versions::package_id.eq(&new_version.package_id))
            .filter(package_versions::version.eq(&new_version.version))
            .first::<PackageVersion>(&mut conn)
    }

    pub fn find_package_version(
        &self,
        package_id: &str,
        version: &str,
    ) -> Result<Option<PackageVersion>, diesel::result::Error> {
        let mut conn = connection(self.pool)?;

        package_versions::table
            .filter(package_versions::package_id.eq(package_id))
            .filter(package_versions::version.eq(version))
            .first::<PackageVersion>(&mut conn)
            .optional()
    }

    /// All versions of a package in publish order
    pub fn list_package_versions(
        &self,
        package_id: &str,
    ) -> Result<Vec<PackageVersion>, diesel::result::Error> {
        let mut conn = connection(self.pool)?;

        package_versions::table
            .filter(package_versions::package_id.eq(package_id))
            .order(package_versions::id.asc())
            .load::<PackageVersion>(&mut conn)
    }

    pub fn list_package_version_names(
        &self,
        package_id: &str,
    ) -> Result<Vec<String>, diesel::result::Error> {
        let mut conn = connection(self.pool)?;

        package_versions::table
            .filter(package_versions::package_id.eq(package_id))
            .order(package_versions::id.asc())
            .select(package_versions::version)
            .load::<String>(&mut conn)
    }

    pub fn remove_package_version(&self, package_version_id: &str) -> Result<usize, diesel::result::Error> {
        let mut conn = connection(self.pool)?;

        diesel::delete(
            package_versions::table
                .filter(package_versions::package_version_id.eq(package_version_id)),
        )
        .execute(&mut conn)
    }

    /// Bumps `updated_at`, used after a deprecation rewrote the version blobs
    pub fn touch_package_version(&self, package_version_id: &str) -> Result<usize, diesel::result::Error> {
        let mut conn = connection(self.pool)?;

        diesel::update(
            package_versions::table
                .filter(package_versions::package_version_id.eq(package_version_id)),
        )
        .set(package_versions::updated_at.eq(chrono::Utc::now().naive_utc()))
        .execute(&mut conn)
    }

    /// Highest published version matching the range.
    ///
    /// Without prerelease comparators the sort key orders candidates exactly,
    /// so the database picks the maximum. Prereleases share the key of their
    /// release triple, so in that case the candidates are ranked in memory.
    pub fn find_max_satisfying_version(
        &self,
        package_id: &str,
        sql_range: &SqlRange,
    ) -> Result<Option<String>, diesel::result::Error> {
        let mut conn = connection(self.pool)?;

        let query = package_versions::table
            .filter(package_versions::package_id.eq(package_id))
            .filter(condition_to_sql(sql_range.condition()))
            .select(package_versions::version);

        if !sql_range.contain_pre_release() {
            return query
                .order(package_versions::padding_version.desc())
                .first::<String>(&mut conn)
                .optional();
        }

        let candidates = query.load::<String>(&mut conn)?;
        Ok(sql_range
            .range()
            .max_satisfying(candidates.iter().map(String::as_str)))
    }
}

fn condition_to_sql(condition: &Condition) -> VersionFilter {
    match condition {
        Condition::Or(children) => children
            .iter()
            .map(condition_to_sql)
            .reduce(|acc, next| -> VersionFilter { Box::new(acc.or(next)) })
            .unwrap_or_else(|| -> VersionFilter { Box::new(false.into_sql::<Bool>()) }),
        Condition::And(children) => children
            .iter()
            .map(condition_to_sql)
            .reduce(|acc, next| -> VersionFilter { Box::new(acc.and(next)) })
            .unwrap_or_else(|| -> VersionFilter { Box::new(true.into_sql::<Bool>()) }),
        // is_pre_release <= 0 only admits releases; <= 1 admits everything
        Condition::IsPreReleaseLte(0) => Box::new(package_versions::is_pre_release.eq(false)),
        Condition::IsPreReleaseLte(_) => Box::new(true.into_sql::<Bool>()),
        Condition::PaddingVersion(operator, padding) => {
            let padding = padding.clone();
            match operator {
                Operator::Lt => Box::new(package_versions::padding_version.lt(padding)),
                Operator::Lte => Box::new(package_versions::padding_version.le(padding)),
                Operator::Eq => Box::new(package_versions::padding_version.eq(padding)),
                Operator::Gte => Box::new(package_versions::padding_version.ge(padding)),
                Operator::Gt => Box::new(package_versions::padding_version.gt(padding)),
            }
        }
    }
}
