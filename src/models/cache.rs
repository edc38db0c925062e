use rocket::serde::Serialize;

/// Serialized manifest document held by the response cache.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Vec<u8>,
    pub etag: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub enabled: bool,
    pub hit_count: u64,
    pub miss_count: u64,
}
