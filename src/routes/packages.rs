use crate::error::ApiError;
use crate::models::CacheEntry;
use crate::services::{DistDownload, TarballLookup};
use crate::state::AppState;
use log::info;
use rocket::http::{ContentType, Header, Status};
use rocket::request::{FromParam, FromRequest, Outcome, Request};
use rocket::response::{Redirect, Responder, Response};
use rocket::{State, get};
use std::io::Cursor;

const ABBREVIATED_ACCEPT: &str = "application/vnd.npm.install-v1+json";

/// Request guard: does the client ask for the abbreviated (install) document?
pub struct ManifestAccept {
    pub abbreviated: bool,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ManifestAccept {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let abbreviated = request
            .headers()
            .get("Accept")
            .any(|accept| accept.contains(ABBREVIATED_ACCEPT));
        Outcome::Success(ManifestAccept { abbreviated })
    }
}

/// Request guard for the `If-None-Match` header
pub struct IfNoneMatch(pub Option<String>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for IfNoneMatch {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let etag = request.headers().get_one("If-None-Match").map(str::to_string);
        Outcome::Success(IfNoneMatch(etag))
    }
}

/// Serialized manifest document with its etag
#[derive(Debug)]
pub enum ManifestResponse {
    Document(CacheEntry),
    NotModified(String),
}

impl<'r> Responder<'r, 'static> for ManifestResponse {
    fn respond_to(self, _: &'r Request<'_>) -> rocket::response::Result<'static> {
        match self {
            ManifestResponse::Document(entry) => Response::build()
                .header(ContentType::JSON)
                .header(Header::new("ETag", entry.etag))
                .sized_body(entry.data.len(), Cursor::new(entry.data))
                .ok(),
            ManifestResponse::NotModified(etag) => Response::build()
                .status(Status::NotModified)
                .header(Header::new("ETag", etag))
                .ok(),
        }
    }
}

/// Tarball bytes, or a redirect when the blob store serves them itself
#[derive(Debug)]
pub struct TarballResponse(DistDownload);

impl<'r> Responder<'r, 'static> for TarballResponse {
    fn respond_to(self, request: &'r Request<'_>) -> rocket::response::Result<'static> {
        match self.0 {
            DistDownload::Bytes(data) => Response::build()
                .header(ContentType::Binary)
                .sized_body(data.len(), Cursor::new(data))
                .ok(),
            DistDownload::Redirect(url) => Redirect::found(url).respond_to(request),
        }
    }
}

/// Path segment that only matches a scope (`@scope`)
pub struct ScopedPackageName(pub String);

impl<'r> FromParam<'r> for ScopedPackageName {
    type Error = &'r str;

    fn from_param(param: &'r str) -> Result<Self, Self::Error> {
        if param.starts_with('@') && param.len() > 1 && !param.contains('/') {
            Ok(ScopedPackageName(param.to_string()))
        } else {
            Err(param)
        }
    }
}

fn package_manifests(
    scope: &str,
    name: &str,
    accept: ManifestAccept,
    if_none_match: IfNoneMatch,
    state: &AppState,
) -> Result<ManifestResponse, ApiError> {
    let fullname = crate::version::fullname(scope, name);
    let entry = match state
        .packages
        .list_package_manifests_cached(scope, name, !accept.abbreviated)?
    {
        Ok(entry) => entry,
        Err(result) if !result.block_reason.is_empty() => {
            return Err(ApiError::Blocked(format!(
                "{fullname} was blocked, reason: {}",
                result.block_reason
            )));
        }
        Err(_) => return Err(ApiError::NotFound(format!("{fullname} not found"))),
    };

    if if_none_match.0.as_deref() == Some(entry.etag.as_str()) {
        return Ok(ManifestResponse::NotModified(entry.etag));
    }
    Ok(ManifestResponse::Document(entry))
}

fn version_manifest(
    scope: &str,
    name: &str,
    spec: &str,
    state: &AppState,
) -> Result<ManifestResponse, ApiError> {
    let fullname = crate::version::fullname(scope, name);
    let result = state
        .packages
        .show_package_version_manifest(scope, name, spec, false, true)?;
    if let Some(reason) = result.block_reason {
        return Err(ApiError::Blocked(format!("{fullname}@{spec} was blocked, reason: {reason}")));
    }
    let Some(manifest) = result.manifest else {
        return Err(ApiError::NotFound(format!("{fullname}@{spec} not found")));
    };

    let data = serde_json::to_vec(&manifest)
        .map_err(|e| ApiError::InternalServerError(e.to_string()))?;
    let etag = format!(
        "\"{}\"",
        crate::services::dist::calculate_integrity(&data).shasum
    );
    Ok(ManifestResponse::Document(CacheEntry { data, etag }))
}

fn tarball(
    scope: &str,
    name: &str,
    filename: &str,
    state: &AppState,
) -> Result<TarballResponse, ApiError> {
    let fullname = crate::version::fullname(scope, name);
    match state.packages.download_tarball(scope, name, filename)? {
        TarballLookup::Found {
            fullname,
            version,
            download,
        } => {
            state.downloads.plus(&fullname, &version);
            Ok(TarballResponse(download))
        }
        TarballLookup::Blocked(reason) => Err(ApiError::Blocked(format!(
            "{fullname} was blocked, reason: {reason}"
        ))),
        TarballLookup::Missing => Err(ApiError::NotFound(format!("{fullname}/-/{filename} not found"))),
    }
}

// Scoped packages (higher priority)
#[get("/<scope>/<package>", rank = 1)]
pub async fn scoped_package_manifests(
    scope: ScopedPackageName,
    package: &str,
    accept: ManifestAccept,
    if_none_match: IfNoneMatch,
    state: &State<AppState>,
) -> Result<ManifestResponse, ApiError> {
    info!("Scoped package manifests request: {}/{}", scope.0, package);
    package_manifests(&scope.0, package, accept, if_none_match, state)
}

#[get("/<scope>/<package>/<spec>", rank = 1)]
pub async fn scoped_package_version(
    scope: ScopedPackageName,
    package: &str,
    spec: &str,
    state: &State<AppState>,
) -> Result<ManifestResponse, ApiError> {
    info!("Scoped package version request: {}/{}@{}", scope.0, package, spec);
    version_manifest(&scope.0, package, spec, state)
}

#[get("/<scope>/<package>/-/<filename>", rank = 1)]
pub async fn scoped_package_tarball(
    scope: ScopedPackageName,
    package: &str,
    filename: &str,
    state: &State<AppState>,
) -> Result<TarballResponse, ApiError> {
    info!("Scoped package tarball request: {}/{} file {}", scope.0, package, filename);
    tarball(&scope.0, package, filename, state)
}

// Regular packages (lower priority)
#[get("/<package>", rank = 2)]
pub async fn package_manifests_route(
    package: &str,
    accept: ManifestAccept,
    if_none_match: IfNoneMatch,
    state: &State<AppState>,
) -> Result<ManifestResponse, ApiError> {
    // npm sends `@scope%2fname`, which arrives here already decoded
    let (scope, name) = crate::version::split_fullname(package);
    if package.starts_with('@') && scope.is_empty() {
        return Err(ApiError::BadRequest("Invalid scoped package format".to_string()));
    }
    info!("Package manifests request: {}", package);
    package_manifests(&scope, &name, accept, if_none_match, state)
}

#[get("/<package>/<spec>", rank = 2)]
pub async fn package_version(
    package: &str,
    spec: &str,
    state: &State<AppState>,
) -> Result<ManifestResponse, ApiError> {
    let (scope, name) = crate::version::split_fullname(package);
    if package.starts_with('@') && scope.is_empty() {
        return Err(ApiError::BadRequest("Use scoped package route".to_string()));
    }
    info!("Package version request: {}@{}", package, spec);
    version_manifest(&scope, &name, spec, state)
}

#[get("/<package>/-/<filename>", rank = 2)]
pub async fn package_tarball(
    package: &str,
    filename: &str,
    state: &State<AppState>,
) -> Result<TarballResponse, ApiError> {
    let (scope, name) = crate::version::split_fullname(package);
    if package.starts_with('@') && scope.is_empty() {
        return Err(ApiError::BadRequest("Use scoped package route".to_string()));
    }
    info!("Package tarball request: {} file {}", package, filename);
    tarball(&scope, &name, filename, state)
}
