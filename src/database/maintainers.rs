use super::connection::{DbPool, connection};
use crate::models::maintainer::*;
use crate::schema::package_maintainers;
use diesel::prelude::*;

/// Package maintainer operations
pub struct MaintainerOperations<'a> {
    pool: &'a DbPool,
}

impl<'a> MaintainerOperations<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    pub fn list_maintainers(&self, package_id: &str) -> Result<Vec<Maintainer>, diesel::result::Error> {
        let mut conn = connection(self.pool)?;

        let rows = package_maintainers::table
            .filter(package_maintainers::package_id.eq(package_id))
            .order(package_maintainers::id.asc())
            .load::<PackageMaintainer>(&mut conn)?;
        Ok(rows.into_iter().map(Maintainer::from).collect())
    }

    /// Returns false when the maintainer was already listed
    pub fn add_maintainer(
        &self,
        package_id: &str,
        maintainer: &Maintainer,
    ) -> Result<bool, diesel::result::Error> {
        let mut conn = connection(self.pool)?;

        let inserted = diesel::insert_into(package_maintainers::table)
            .values(&NewPackageMaintainer::new(package_id, maintainer))
            .on_conflict((package_maintainers::package_id, package_maintainers::name))
            .do_nothing()
            .execute(&mut conn)?;
        Ok(inserted > 0)
    }

    /// Replaces the whole maintainer list atomically
    pub fn replace_maintainers(
        &self,
        package_id: &str,
        maintainers: &[Maintainer],
    ) -> Result<(), diesel::result::Error> {
        let mut conn = connection(self.pool)?;

        conn.transaction(|conn| {
            diesel::delete(
                package_maintainers::table.filter(package_maintainers::package_id.eq(package_id)),
            )
            .execute(conn)?;

            let rows: Vec<NewPackageMaintainer> = maintainers
                .iter()
                .map(|maintainer| NewPackageMaintainer::new(package_id, maintainer))
                .collect();
            for row in &rows {
                diesel::insert_into(package_maintainers::table)
                    .values(row)
                    .on_conflict((package_maintainers::package_id, package_maintainers::name))
                    .do_nothing()
                    .execute(conn)?;
            }
            Ok(())
        })
    }
}
