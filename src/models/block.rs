use crate::schema::package_version_blocks;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use rocket::serde::{Deserialize, Serialize};

/// Version value of a block covering the whole package.
pub const BLOCK_ALL_VERSIONS: &str = "*";

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = package_version_blocks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PackageVersionBlock {
    pub id: i32,
    pub package_version_block_id: String,
    pub package_id: String,
    pub version: String,
    pub reason: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = package_version_blocks)]
pub struct NewPackageVersionBlock {
    pub package_version_block_id: String,
    pub package_id: String,
    pub version: String,
    pub reason: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NewPackageVersionBlock {
    pub fn new(package_id: &str, version: &str, reason: &str) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            package_version_block_id: uuid::Uuid::new_v4().to_string(),
            package_id: package_id.to_string(),
            version: version.to_string(),
            reason: reason.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}
