use crate::schema::dists;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use rocket::serde::{Deserialize, Serialize};

// Dist model - metadata of one blob stored under `path`
#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = dists)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Dist {
    pub id: i32,
    pub dist_id: String,
    pub name: String,
    pub path: String,
    pub size: i64,
    pub shasum: String,
    pub integrity: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = dists)]
pub struct NewDist {
    pub dist_id: String,
    pub name: String,
    pub path: String,
    pub size: i64,
    pub shasum: String,
    pub integrity: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = dists)]
pub struct UpdateDist {
    pub size: i64,
    pub shasum: String,
    pub integrity: String,
    pub updated_at: NaiveDateTime,
}

/// Size and digests of a blob: hex SHA-1 `shasum` and SSRI SHA-512 `integrity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Integrity {
    pub size: i64,
    pub shasum: String,
    pub integrity: String,
}

impl NewDist {
    pub fn new(name: &str, path: &str, integrity: &Integrity) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            dist_id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            path: path.to_string(),
            size: integrity.size,
            shasum: integrity.shasum.clone(),
            integrity: integrity.integrity.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl UpdateDist {
    pub fn new(integrity: &Integrity) -> Self {
        Self {
            size: integrity.size,
            shasum: integrity.shasum.clone(),
            integrity: integrity.integrity.clone(),
            updated_at: chrono::Utc::now().naive_utc(),
        }
    }
}
