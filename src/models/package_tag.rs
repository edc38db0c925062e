use crate::schema::package_tags;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use rocket::serde::{Deserialize, Serialize};

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = package_tags)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PackageTag {
    pub id: i32,
    pub package_tag_id: String,
    pub package_id: String,
    pub tag: String,
    pub version: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = package_tags)]
pub struct NewPackageTag {
    pub package_tag_id: String,
    pub package_id: String,
    pub tag: String,
    pub version: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NewPackageTag {
    pub fn new(package_id: &str, tag: &str, version: &str) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            package_tag_id: uuid::Uuid::new_v4().to_string(),
            package_id: package_id.to_string(),
            tag: tag.to_string(),
            version: version.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = package_tags)]
pub struct UpdatePackageTag {
    pub version: String,
    pub updated_at: NaiveDateTime,
}
