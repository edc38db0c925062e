use crate::schema::package_version_downloads;
use chrono::NaiveDate;
use diesel::prelude::*;
use rocket::serde::{Deserialize, Serialize};

/// Rollup keys that are not package ids.
pub const TOTAL_DOWNLOADS_ID: &str = "total";

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = package_version_downloads)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PackageVersionDownload {
    pub id: i32,
    pub package_id: String,
    pub version: String,
    pub date: NaiveDate,
    pub count: i64,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = package_version_downloads)]
pub struct NewPackageVersionDownload {
    pub package_id: String,
    pub version: String,
    pub date: NaiveDate,
    pub count: i64,
}
