use crate::schema::package_maintainers;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use rocket::serde::{Deserialize, Serialize};

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = package_maintainers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PackageMaintainer {
    pub id: i32,
    pub package_id: String,
    pub name: String,
    pub email: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = package_maintainers)]
pub struct NewPackageMaintainer {
    pub package_id: String,
    pub name: String,
    pub email: String,
    pub created_at: NaiveDateTime,
}

/// `{ name, email }` entry as it appears in the `maintainers` array of a manifest.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Maintainer {
    pub name: String,
    pub email: String,
}

impl Maintainer {
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
        }
    }
}

impl NewPackageMaintainer {
    pub fn new(package_id: &str, maintainer: &Maintainer) -> Self {
        Self {
            package_id: package_id.to_string(),
            name: maintainer.name.clone(),
            email: maintainer.email.clone(),
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

impl From<PackageMaintainer> for Maintainer {
    fn from(row: PackageMaintainer) -> Self {
        Self {
            name: row.name,
            email: row.email,
        }
    }
}
