use crate::database::DatabaseService;
use crate::error::{RegistryError, RegistryResult};
use crate::models::{Dist, Integrity, NewDist, UpdateDist};
use base64::prelude::*;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use sha1::Sha1;
use sha2::{Digest, Sha512};
use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Byte store addressed by caller-chosen paths such as
/// `/packages/foo/1.0.0/package.json`.
pub trait NfsAdapter: Send + Sync + Debug {
    fn upload_bytes(&self, path: &str, bytes: &[u8]) -> io::Result<()>;
    fn upload_file(&self, path: &str, file: &Path) -> io::Result<()>;
    /// `None` when nothing is stored at `path`.
    fn read_bytes(&self, path: &str) -> io::Result<Option<Vec<u8>>>;
    fn remove(&self, path: &str) -> io::Result<()>;
    /// Direct download location, when the backend can serve blobs itself.
    fn url(&self, _path: &str) -> Option<String> {
        None
    }
}

/// Stores blobs as plain files under a root directory
#[derive(Debug)]
pub struct LocalNfsClient {
    root: PathBuf,
}

impl LocalNfsClient {
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Location of `path` under the root. Anything but plain segments is refused.
    pub fn file_path(&self, path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        let plain = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if !plain || relative.as_os_str().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("blob path {path:?} leaves the storage root"),
            ));
        }
        Ok(self.root.join(relative))
    }

    fn write_atomically(&self, path: &str, write: impl FnOnce(&Path) -> io::Result<()>) -> io::Result<()> {
        let target = self.file_path(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = target.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        if let Err(e) = write(&staging) {
            let _ = fs::remove_file(&staging);
            return Err(e);
        }
        fs::rename(&staging, &target)
    }
}

impl NfsAdapter for LocalNfsClient {
    fn upload_bytes(&self, path: &str, bytes: &[u8]) -> io::Result<()> {
        self.write_atomically(path, |staging| fs::write(staging, bytes))
    }

    fn upload_file(&self, path: &str, file: &Path) -> io::Result<()> {
        self.write_atomically(path, |staging| fs::copy(file, staging).map(|_| ()))
    }

    fn read_bytes(&self, path: &str) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.file_path(path)?) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn remove(&self, path: &str) -> io::Result<()> {
        match fs::remove_file(self.file_path(path)?) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Content handed to [`DistRepository::save_dist`].
#[derive(Debug, Clone, Copy)]
pub enum DistSource<'a> {
    Bytes(&'a [u8]),
    File(&'a Path),
}

/// How a blob should be served to a client.
#[derive(Debug)]
pub enum DistDownload {
    Redirect(String),
    Bytes(Vec<u8>),
}

pub fn calculate_integrity(bytes: &[u8]) -> Integrity {
    Integrity {
        size: bytes.len() as i64,
        shasum: format!("{:x}", Sha1::digest(bytes)),
        integrity: format!("sha512-{}", BASE64_STANDARD.encode(Sha512::digest(bytes))),
    }
}

pub fn calculate_file_integrity(file: &Path) -> io::Result<Integrity> {
    let mut reader = fs::File::open(file)?;
    let mut sha1 = Sha1::new();
    let mut sha512 = Sha512::new();
    let mut buffer = [0u8; 64 * 1024];
    let mut size = 0i64;
    loop {
        let read = io::Read::read(&mut reader, &mut buffer)?;
        if read == 0 {
            break;
        }
        sha1.update(&buffer[..read]);
        sha512.update(&buffer[..read]);
        size += read as i64;
    }
    Ok(Integrity {
        size,
        shasum: format!("{:x}", sha1.finalize()),
        integrity: format!("sha512-{}", BASE64_STANDARD.encode(sha512.finalize())),
    })
}

/// Blob metadata rows in the database, bytes in the NFS store.
#[derive(Debug, Clone)]
pub struct DistRepository {
    database: Arc<DatabaseService>,
    nfs: Arc<dyn NfsAdapter>,
}

impl DistRepository {
    pub fn new(database: Arc<DatabaseService>, nfs: Arc<dyn NfsAdapter>) -> Self {
        Self { database, nfs }
    }

    pub fn save_dist(&self, name: &str, path: &str, source: DistSource<'_>) -> RegistryResult<Dist> {
        let integrity = match source {
            DistSource::Bytes(bytes) => {
                self.nfs.upload_bytes(path, bytes)?;
                calculate_integrity(bytes)
            }
            DistSource::File(file) => {
                let integrity = calculate_file_integrity(file)?;
                self.nfs.upload_file(path, file)?;
                integrity
            }
        };
        debug!("Stored dist {} ({} bytes)", path, integrity.size);
        Ok(self.database.create_dist(&NewDist::new(name, path, &integrity))?)
    }

    pub fn save_json(&self, name: &str, path: &str, value: &serde_json::Value) -> RegistryResult<Dist> {
        let bytes = serde_json::to_vec(value)?;
        self.save_dist(name, path, DistSource::Bytes(&bytes))
    }

    /// Rewrites the bytes behind an existing dist row in place
    pub fn update_dist(&self, dist: &Dist, bytes: &[u8]) -> RegistryResult<Dist> {
        self.nfs.upload_bytes(&dist.path, bytes)?;
        let integrity = calculate_integrity(bytes);
        Ok(self.database.update_dist(dist.id, &UpdateDist::new(&integrity))?)
    }

    pub fn update_json(&self, dist: &Dist, value: &serde_json::Value) -> RegistryResult<Dist> {
        let bytes = serde_json::to_vec(value)?;
        self.update_dist(dist, &bytes)
    }

    pub fn find_dist(&self, id: i32) -> RegistryResult<Option<Dist>> {
        Ok(self.database.find_dist(id)?)
    }

    pub fn read_dist_bytes(&self, dist: &Dist) -> RegistryResult<Option<Vec<u8>>> {
        Ok(self.nfs.read_bytes(&dist.path)?)
    }

    pub fn read_dist_bytes_to_json<T: DeserializeOwned>(&self, dist: &Dist) -> RegistryResult<Option<T>> {
        match self.read_dist_bytes(dist)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn read_dist_string(&self, dist: &Dist) -> RegistryResult<Option<String>> {
        Ok(self
            .read_dist_bytes(dist)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Loads dist `id` and decodes it as JSON; `None` when the row or the bytes are gone
    pub fn read_json_by_id<T: DeserializeOwned>(&self, id: i32) -> RegistryResult<Option<T>> {
        match self.find_dist(id)? {
            Some(dist) => self.read_dist_bytes_to_json(&dist),
            None => Ok(None),
        }
    }

    /// Removes the stored bytes. The row is left to the caller, who usually
    /// deletes several rows at once.
    pub fn destroy_dist(&self, dist: &Dist) -> RegistryResult<()> {
        if let Err(e) = self.nfs.remove(&dist.path) {
            warn!("Failed to remove dist {}: {}", dist.path, e);
            return Err(RegistryError::Storage(e));
        }
        Ok(())
    }

    pub fn destroy_dists(&self, ids: &[i32]) -> RegistryResult<()> {
        for id in ids {
            if let Some(dist) = self.find_dist(*id)? {
                self.destroy_dist(&dist)?;
            }
        }
        self.database.remove_dists(ids)?;
        Ok(())
    }

    pub fn download_dist(&self, dist: &Dist) -> RegistryResult<Option<DistDownload>> {
        if let Some(url) = self.nfs.url(&dist.path) {
            return Ok(Some(DistDownload::Redirect(url)));
        }
        Ok(self.read_dist_bytes(dist)?.map(DistDownload::Bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_integrity_of_known_bytes() {
        let integrity = calculate_integrity(b"hello");
        assert_eq!(integrity.size, 5);
        assert_eq!(integrity.shasum, "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
        assert!(integrity.integrity.starts_with("sha512-"));
    }

    #[test]
    fn test_file_integrity_matches_bytes() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("pkg.tgz");
        let bytes = vec![7u8; 200_000];
        fs::write(&file, &bytes).unwrap();
        assert_eq!(calculate_file_integrity(&file).unwrap(), calculate_integrity(&bytes));
    }

    #[test]
    fn test_local_nfs_round_trip() {
        let dir = TempDir::new().unwrap();
        let nfs = LocalNfsClient::new(dir.path()).unwrap();
        let path = "/packages/@scope/foo/1.0.0/package.json";

        assert!(nfs.read_bytes(path).unwrap().is_none());
        nfs.upload_bytes(path, b"{}").unwrap();
        assert_eq!(nfs.read_bytes(path).unwrap().unwrap(), b"{}");
        nfs.upload_bytes(path, b"{\"a\":1}").unwrap();
        assert_eq!(nfs.read_bytes(path).unwrap().unwrap(), b"{\"a\":1}");

        nfs.remove(path).unwrap();
        assert!(nfs.read_bytes(path).unwrap().is_none());
        // removing twice is fine
        nfs.remove(path).unwrap();
    }

    #[test]
    fn test_local_nfs_stays_under_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nfs");
        let nfs = LocalNfsClient::new(&root).unwrap();

        for path in ["/packages/foo/../../../escaped", "../outside", "/"] {
            let err = nfs.upload_bytes(path, b"x").unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput, "path {path}");
            assert!(nfs.read_bytes(path).is_err());
            assert!(nfs.remove(path).is_err());
        }
        assert!(!dir.path().join("escaped").exists());
        assert!(!dir.path().join("outside").exists());
    }
}
