use super::connection::{DbPool, connection};
use crate::models::dist::*;
use crate::schema::dists;
use diesel::prelude::*;

/// Blob metadata operations. The bytes themselves live in the NFS store.
pub struct DistOperations<'a> {
    pool: &'a DbPool,
}

impl<'a> DistOperations<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    pub fn create_dist(&self, new_dist: &NewDist) -> Result<Dist, diesel::result::Error> {
        let mut conn = connection(self.pool)?;

        diesel::insert_into(dists::table)
            .values(new_dist)
            .execute(&mut conn)?;

        dists::table
            .filter(dists::dist_id.eq(&new_dist.dist_id))
            .first::<Dist>(&mut conn)
    }

    pub fn find_dist(&self, id: i32) -> Result<Option<Dist>, diesel::result::Error> {
        let mut conn = connection(self.pool)?;

        dists::table.find(id).first::<Dist>(&mut conn).optional()
    }

    pub fn update_dist(&self, id: i32, changes: &UpdateDist) -> Result<Dist, diesel::result::Error> {
        let mut conn = connection(self.pool)?;

        diesel::update(dists::table.find(id))
            .set(changes)
            .execute(&mut conn)?;

        dists::table.find(id).first::<Dist>(&mut conn)
    }

    pub fn remove_dists(&self, ids: &[i32]) -> Result<usize, diesel::result::Error> {
        let mut conn = connection(self.pool)?;

        diesel::delete(dists::table.filter(dists::id.eq_any(ids))).execute(&mut conn)
    }
}
