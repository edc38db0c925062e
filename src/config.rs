use log::info;
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub host: String,
    pub scheme: String,
    pub registry_host: String,
    pub data_dir: String,
    pub database_url: String,
    pub cache_enabled: bool,
    pub bug_versions_package: String,
    pub download_flush_secs: u64,
    pub lock_timeout_ms: u64,
    pub description_max_length: usize,
    pub source_registry_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "127.0.0.1".to_string(),
            scheme: "http".to_string(),
            registry_host: "http://127.0.0.1:8000".to_string(),
            data_dir: "./data".to_string(),
            database_url: "./data/stave.db".to_string(),
            cache_enabled: true,
            bug_versions_package: "bug-versions".to_string(),
            download_flush_secs: 60,
            lock_timeout_ms: 5000,
            description_max_length: 10240,
            source_registry_name: "self".to_string(),
        }
    }
}

impl AppConfig {
    /// Config rooted in `data_dir`, everything else default. Handy for tests and tools.
    pub fn with_data_dir(data_dir: &str) -> Self {
        Self {
            data_dir: data_dir.to_string(),
            database_url: format!("{data_dir}/stave.db"),
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        let port = env::var("STAVE_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .unwrap_or(8000);

        let host = env::var("STAVE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        // Auto-detect scheme based on port or explicit configuration
        let scheme = env::var("STAVE_SCHEME").unwrap_or_else(|_| {
            if port == 443 {
                "https".to_string()
            } else {
                "http".to_string()
            }
        });

        let registry_host = env::var("STAVE_REGISTRY_HOST")
            .unwrap_or_else(|_| format!("{scheme}://{host}:{port}"))
            .trim_end_matches('/')
            .to_string();

        let data_dir = env::var("STAVE_DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let database_url =
            env::var("STAVE_DATABASE_URL").unwrap_or_else(|_| format!("{data_dir}/stave.db"));

        let cache_enabled = env::var("STAVE_CACHE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let bug_versions_package = env::var("STAVE_BUG_VERSIONS_PACKAGE")
            .unwrap_or_else(|_| "bug-versions".to_string());

        let download_flush_secs = env::var("STAVE_DOWNLOAD_FLUSH_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()
            .unwrap_or(60);

        let lock_timeout_ms = env::var("STAVE_LOCK_TIMEOUT_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u64>()
            .unwrap_or(5000);

        let description_max_length = env::var("STAVE_DESCRIPTION_MAX_LENGTH")
            .unwrap_or_else(|_| "10240".to_string())
            .parse::<usize>()
            .unwrap_or(10240);

        let source_registry_name =
            env::var("STAVE_SOURCE_REGISTRY_NAME").unwrap_or_else(|_| "self".to_string());

        info!("Configuration loaded:");
        info!("  Host: {host}");
        info!("  Port: {port}");
        info!("  Scheme: {scheme}");
        info!("  Registry Host: {registry_host}");
        info!("  Data Directory: {data_dir}");
        info!("  Database URL: {database_url}");
        info!("  Cache Enabled: {cache_enabled}");
        info!("  Bug Versions Package: {bug_versions_package}");
        info!("  Download Flush Interval: {download_flush_secs} seconds");
        info!("  Lock Timeout: {lock_timeout_ms} ms");

        Self {
            port,
            host,
            scheme,
            registry_host,
            data_dir,
            database_url,
            cache_enabled,
            bug_versions_package,
            download_flush_secs,
            lock_timeout_ms,
            description_max_length,
            source_registry_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.host, "127.0.0.1");
        assert!(config.cache_enabled);
        assert_eq!(config.data_dir, "./data");
        assert_eq!(config.bug_versions_package, "bug-versions");
        assert_eq!(config.description_max_length, 10240);
    }

    #[test]
    fn test_with_data_dir() {
        let config = AppConfig::with_data_dir("/tmp/stave-test");
        assert_eq!(config.database_url, "/tmp/stave-test/stave.db");
        assert_eq!(config.registry_host, "http://127.0.0.1:8000");
    }

    #[test]
    fn test_config_parsing() {
        assert_eq!("8080".parse::<u16>().unwrap_or(8000), 8080);
        assert_eq!("invalid".parse::<u16>().unwrap_or(8000), 8000);
    }
}
