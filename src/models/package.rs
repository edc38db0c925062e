use crate::error::RegistryResult;
use crate::schema::{package_versions, packages};
use crate::version::{PaddingSemVer, fullname};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use rocket::serde::{Deserialize, Serialize};

// Package model - identity plus pointers to the two denormalized manifest blobs
#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = packages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Package {
    pub id: i32,
    pub package_id: String,
    pub scope: String,
    pub name: String,
    pub is_private: bool,
    pub description: String,
    pub manifests_dist_id: Option<i32>,
    pub abbreviateds_dist_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = packages)]
pub struct NewPackage {
    pub package_id: String,
    pub scope: String,
    pub name: String,
    pub is_private: bool,
    pub description: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// Package version model - one immutable published version
#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = package_versions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PackageVersion {
    pub id: i32,
    pub package_version_id: String,
    pub package_id: String,
    pub version: String,
    pub padding_version: String,
    pub is_pre_release: bool,
    pub manifest_dist_id: i32,
    pub abbreviated_dist_id: i32,
    pub tarball_dist_id: i32,
    pub readme_dist_id: i32,
    pub publish_time: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = package_versions)]
pub struct NewPackageVersion {
    pub package_version_id: String,
    pub package_id: String,
    pub version: String,
    pub padding_version: String,
    pub is_pre_release: bool,
    pub manifest_dist_id: i32,
    pub abbreviated_dist_id: i32,
    pub tarball_dist_id: i32,
    pub readme_dist_id: i32,
    pub publish_time: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Blob ids of the four per-version dists.
#[derive(Debug, Clone, Copy)]
pub struct VersionDistIds {
    pub manifest: i32,
    pub abbreviated: i32,
    pub tarball: i32,
    pub readme: i32,
}

// Implementation methods
impl Package {
    pub fn fullname(&self) -> String {
        fullname(&self.scope, &self.name)
    }

    /// Revision reported as `_rev` in the full manifest.
    pub fn rev(&self) -> String {
        format!("{}-{}", self.id, self.package_id)
    }

    pub fn manifests_dist_path(&self) -> String {
        format!("/packages/{}/package.json", self.fullname())
    }

    pub fn abbreviateds_dist_path(&self) -> String {
        format!("/packages/{}/abbreviated.json", self.fullname())
    }

    /// Blobs of one publish attempt live under its version id.
    pub fn version_dist_path(&self, version: &str, package_version_id: &str, filename: &str) -> String {
        format!("/packages/{}/{version}/{package_version_id}/{filename}", self.fullname())
    }

    pub fn tarball_filename(&self, version: &str) -> String {
        format!("{}-{version}.tgz", self.name)
    }
}

impl NewPackage {
    pub fn new(scope: &str, name: &str, is_private: bool, description: String) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            package_id: uuid::Uuid::new_v4().to_string(),
            scope: scope.to_string(),
            name: name.to_string(),
            is_private,
            description,
            created_at: now,
            updated_at: now,
        }
    }
}

impl NewPackageVersion {
    /// Builds the row, deriving the sort key from `version`.
    pub fn new(
        package_version_id: &str,
        package_id: &str,
        version: &str,
        dists: VersionDistIds,
        publish_time: NaiveDateTime,
    ) -> RegistryResult<Self> {
        let (padding_version, is_pre_release) = PaddingSemVer::new(version)?.into_parts();
        let now = chrono::Utc::now().naive_utc();
        Ok(Self {
            package_version_id: package_version_id.to_string(),
            package_id: package_id.to_string(),
            version: version.to_string(),
            padding_version,
            is_pre_release,
            manifest_dist_id: dists.manifest,
            abbreviated_dist_id: dists.abbreviated,
            tarball_dist_id: dists.tarball,
            readme_dist_id: dists.readme,
            publish_time,
            created_at: now,
            updated_at: now,
        })
    }
}

impl PackageVersion {
    pub fn dist_ids(&self) -> VersionDistIds {
        VersionDistIds {
            manifest: self.manifest_dist_id,
            abbreviated: self.abbreviated_dist_id,
            tarball: self.tarball_dist_id,
            readme: self.readme_dist_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dists() -> VersionDistIds {
        VersionDistIds {
            manifest: 1,
            abbreviated: 2,
            tarball: 3,
            readme: 4,
        }
    }

    #[test]
    fn test_new_package_version_derives_sort_key() {
        let now = chrono::Utc::now().naive_utc();
        let stable = NewPackageVersion::new("v1", "pkg", "1.2.3", dists(), now).unwrap();
        assert_eq!(
            stable.padding_version,
            PaddingSemVer::new("1.2.3").unwrap().padding_version()
        );
        assert!(!stable.is_pre_release);

        let beta = NewPackageVersion::new("v2", "pkg", "1.2.3-beta.0", dists(), now).unwrap();
        assert_eq!(beta.padding_version, stable.padding_version);
        assert!(beta.is_pre_release);
    }

    #[test]
    fn test_scoped_paths() {
        let now = chrono::Utc::now().naive_utc();
        let pkg = Package {
            id: 7,
            package_id: "abc".to_string(),
            scope: "@cnpm".to_string(),
            name: "foo".to_string(),
            is_private: true,
            description: String::new(),
            manifests_dist_id: None,
            abbreviateds_dist_id: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(pkg.fullname(), "@cnpm/foo");
        assert_eq!(pkg.rev(), "7-abc");
        assert_eq!(pkg.manifests_dist_path(), "/packages/@cnpm/foo/package.json");
        assert_eq!(
            pkg.version_dist_path("1.0.0", "v1", &pkg.tarball_filename("1.0.0")),
            "/packages/@cnpm/foo/1.0.0/v1/foo-1.0.0.tgz"
        );
    }
}
