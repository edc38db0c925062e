use super::connection::{DbPool, connection};
use crate::models::block::*;
use crate::schema::package_version_blocks;
use diesel::prelude::*;

/// Block list operations
pub struct BlockOperations<'a> {
    pool: &'a DbPool,
}

impl<'a> BlockOperations<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    pub fn find_block(
        &self,
        package_id: &str,
        version: &str,
    ) -> Result<Option<PackageVersionBlock>, diesel::result::Error> {
        let mut conn = connection(self.pool)?;

        package_version_blocks::table
            .filter(package_version_blocks::package_id.eq(package_id))
            .filter(package_version_blocks::version.eq(version))
            .first::<PackageVersionBlock>(&mut conn)
            .optional()
    }

    /// Inserts the block, or replaces the reason of an existing one
    pub fn save_block(
        &self,
        package_id: &str,
        version: &str,
        reason: &str,
    ) -> Result<PackageVersionBlock, diesel::result::Error> {
        let mut conn = connection(self.pool)?;

        diesel::insert_into(package_version_blocks::table)
            .values(&NewPackageVersionBlock::new(package_id, version, reason))
            .on_conflict((
                package_version_blocks::package_id,
                package_version_blocks::version,
            ))
            .do_update()
            .set((
                package_version_blocks::reason.eq(reason),
                package_version_blocks::updated_at.eq(chrono::Utc::now().naive_utc()),
            ))
            .execute(&mut conn)?;

        package_version_blocks::table
            .filter(package_version_blocks::package_id.eq(package_id))
            .filter(package_version_blocks::version.eq(version))
            .first::<PackageVersionBlock>(&mut conn)
    }

    pub fn remove_block(&self, id: i32) -> Result<usize, diesel::result::Error> {
        let mut conn = connection(self.pool)?;

        diesel::delete(package_version_blocks::table.find(id)).execute(&mut conn)
    }
}
