pub mod health;
pub mod packages;

use rocket::routes;

pub fn get_routes() -> Vec<rocket::Route> {
    routes![
        health::health_check,
        // Scoped package routes (higher priority)
        packages::scoped_package_manifests,
        packages::scoped_package_version,
        packages::scoped_package_tarball,
        // Regular package routes (lower priority)
        packages::package_manifests_route,
        packages::package_version,
        packages::package_tarball,
    ]
}
