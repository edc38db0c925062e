use crate::models::{NewPackageTag, PackageTag, UpdatePackageTag};
use crate::schema::{package_tags, packages};
use diesel::prelude::*;
use indexmap::IndexMap;

impl crate::database::DatabaseService {
    pub fn find_package_tag(
        &self,
        package_id: &str,
        tag: &str,
    ) -> Result<Option<PackageTag>, diesel::result::Error> {
        let mut conn = self.get_connection()?;

        package_tags::table
            .filter(package_tags::package_id.eq(package_id))
            .filter(package_tags::tag.eq(tag))
            .first::<PackageTag>(&mut conn)
            .optional()
    }

    /// Resolves `scope/name@tag` in one query, without loading the package row
    pub fn find_version_by_tag(
        &self,
        scope: &str,
        name: &str,
        tag: &str,
    ) -> Result<Option<String>, diesel::result::Error> {
        let mut conn = self.get_connection()?;

        package_tags::table
            .inner_join(packages::table.on(packages::package_id.eq(package_tags::package_id)))
            .filter(packages::scope.eq(scope))
            .filter(packages::name.eq(name))
            .filter(package_tags::tag.eq(tag))
            .select(package_tags::version)
            .first::<String>(&mut conn)
            .optional()
    }

    pub fn create_package_tag(
        &self,
        package_id: &str,
        tag: &str,
        version: &str,
    ) -> Result<PackageTag, diesel::result::Error> {
        let mut conn = self.get_connection()?;

        diesel::insert_into(package_tags::table)
            .values(&NewPackageTag::new(package_id, tag, version))
            .execute(&mut conn)?;

        package_tags::table
            .filter(package_tags::package_id.eq(package_id))
            .filter(package_tags::tag.eq(tag))
            .first::<PackageTag>(&mut conn)
    }

    pub fn update_package_tag(
        &self,
        package_tag_id: &str,
        version: &str,
    ) -> Result<usize, diesel::result::Error> {
        let mut conn = self.get_connection()?;

        diesel::update(package_tags::table)
            .filter(package_tags::package_tag_id.eq(package_tag_id))
            .set(&UpdatePackageTag {
                version: version.to_string(),
                updated_at: chrono::Utc::now().naive_utc(),
            })
            .execute(&mut conn)
    }

    /// Tags of a package in creation order
    pub fn list_package_tags(
        &self,
        package_id: &str,
    ) -> Result<Vec<PackageTag>, diesel::result::Error> {
        let mut conn = self.get_connection()?;

        package_tags::table
            .filter(package_tags::package_id.eq(package_id))
            .order(package_tags::id.asc())
            .load::<PackageTag>(&mut conn)
    }

    /// `dist-tags` object of the manifests
    pub fn get_package_tags_map(
        &self,
        package_id: &str,
    ) -> Result<IndexMap<String, String>, diesel::result::Error> {
        Ok(self
            .list_package_tags(package_id)?
            .into_iter()
            .map(|tag| (tag.tag, tag.version))
            .collect())
    }

    pub fn remove_package_tag(
        &self,
        package_tag_id: &str,
    ) -> Result<usize, diesel::result::Error> {
        let mut conn = self.get_connection()?;

        diesel::delete(package_tags::table)
            .filter(package_tags::package_tag_id.eq(package_tag_id))
            .execute(&mut conn)
    }

    pub fn remove_all_package_tags(&self, package_id: &str) -> Result<usize, diesel::result::Error> {
        let mut conn = self.get_connection()?;

        diesel::delete(package_tags::table)
            .filter(package_tags::package_id.eq(package_id))
            .execute(&mut conn)
    }
}
