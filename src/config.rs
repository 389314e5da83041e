use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::compression::strategy::CompressionStrategy;
use crate::vector::hnsw::HnswParams;
use crate::vector::persistence::StorePaths;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct GanglionConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub index: IndexConfig,
    pub compression: CompressionConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub log_level: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    pub index_file: String,
    pub map_file: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndexConfig {
    pub dimension: usize,
    pub capacity: usize,
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    pub seed: u64,
    pub default_k: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CompressionConfig {
    pub default_strategy: CompressionStrategy,
    pub max_memory_size: usize,
    pub retention_threshold: Option<f64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            log_level: "info".into(),
            host: "127.0.0.1".into(),
            port: 7341,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_ganglion_dir().to_string_lossy().into_owned(),
            index_file: "vectors.hnsw".into(),
            map_file: "vectors.map.json".into(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        let params = HnswParams::default();
        Self {
            dimension: params.dimension,
            capacity: 10_000,
            m: params.m,
            ef_construction: params.ef_construction,
            ef_search: params.ef_search,
            seed: params.seed,
            default_k: 5,
        }
    }
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            default_strategy: CompressionStrategy::Hybrid,
            max_memory_size: 1024 * 1024,
            retention_threshold: None,
        }
    }
}

impl IndexConfig {
    pub fn hnsw_params(&self) -> HnswParams {
        HnswParams {
            dimension: self.dimension,
            m: self.m,
            ef_construction: self.ef_construction,
            ef_search: self.ef_search,
            seed: self.seed,
        }
    }
}

/// Returns `~/.ganglion/`
pub fn default_ganglion_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".ganglion")
}

/// Returns the default config file path: `~/.ganglion/config.toml`
pub fn default_config_path() -> PathBuf {
    default_ganglion_dir().join("config.toml")
}

impl GanglionConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            GanglionConfig::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject index settings the engine cannot build a usable graph with.
    pub fn validate(&self) -> Result<()> {
        let index = &self.index;
        if index.dimension == 0 {
            bail!("index.dimension must be greater than 0");
        }
        if index.m < 2 {
            bail!("index.m must be at least 2, got {}", index.m);
        }
        if index.ef_construction == 0 {
            bail!("index.ef_construction must be greater than 0");
        }
        if index.capacity == 0 {
            bail!("index.capacity must be greater than 0");
        }
        Ok(())
    }

    /// Apply environment variable overrides
    /// (GANGLION_DATA_DIR, GANGLION_LOG_LEVEL, GANGLION_INDEX_CAPACITY).
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("GANGLION_DATA_DIR") {
            self.storage.data_dir = val;
        }
        if let Ok(val) = std::env::var("GANGLION_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("GANGLION_INDEX_CAPACITY") {
            self.index.capacity = val
                .parse()
                .with_context(|| format!("GANGLION_INDEX_CAPACITY is not a number: {val}"))?;
        }
        Ok(())
    }

    /// Resolve the data directory, expanding `~` if needed.
    pub fn resolved_data_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.data_dir)
    }

    /// Full paths of the index binary and its map sidecar.
    pub fn store_paths(&self) -> StorePaths {
        let dir = self.resolved_data_dir();
        StorePaths::new(
            dir.join(&self.storage.index_file),
            dir.join(&self.storage.map_file),
        )
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = GanglionConfig::default();
        assert_eq!(config.server.transport, "stdio");
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.index.dimension, 384);
        assert_eq!(config.index.capacity, 10_000);
        assert_eq!(config.compression.default_strategy, CompressionStrategy::Hybrid);
        assert!(config.compression.retention_threshold.is_none());
        assert!(config.storage.data_dir.ends_with(".ganglion"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"

[storage]
data_dir = "/tmp/ganglion-test"
map_file = "ids.json"

[index]
dimension = 8
capacity = 50

[compression]
default_strategy = "importance"
max_memory_size = 4096
retention_threshold = 0.9
"#;
        let config: GanglionConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.index.dimension, 8);
        assert_eq!(config.index.capacity, 50);
        assert_eq!(
            config.compression.default_strategy,
            CompressionStrategy::Importance
        );
        assert_eq!(config.compression.max_memory_size, 4096);
        assert_eq!(config.compression.retention_threshold, Some(0.9));
        // defaults still apply for unset fields
        assert_eq!(config.index.m, 16);
        assert_eq!(config.storage.index_file, "vectors.hnsw");

        let paths = config.store_paths();
        assert_eq!(paths.index, PathBuf::from("/tmp/ganglion-test/vectors.hnsw"));
        assert_eq!(paths.map, PathBuf::from("/tmp/ganglion-test/ids.json"));
    }

    #[test]
    fn degenerate_index_settings_are_rejected() {
        assert!(GanglionConfig::default().validate().is_ok());

        for (toml_str, field) in [
            ("[index]\nm = 0", "index.m"),
            ("[index]\nm = 1", "index.m"),
            ("[index]\ndimension = 0", "index.dimension"),
            ("[index]\nef_construction = 0", "index.ef_construction"),
            ("[index]\ncapacity = 0", "index.capacity"),
        ] {
            let config: GanglionConfig = toml::from_str(toml_str).unwrap();
            let err = config.validate().unwrap_err().to_string();
            assert!(err.contains(field), "{toml_str:?} gave {err}");
        }
    }

    #[test]
    fn load_from_fails_on_zero_links() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[index]\nm = 0\n").unwrap();

        let err = GanglionConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("index.m"));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = GanglionConfig::default();
        std::env::set_var("GANGLION_DATA_DIR", "/tmp/override");
        std::env::set_var("GANGLION_LOG_LEVEL", "trace");
        std::env::set_var("GANGLION_INDEX_CAPACITY", "250");

        config.apply_env_overrides().unwrap();

        assert_eq!(config.storage.data_dir, "/tmp/override");
        assert_eq!(config.server.log_level, "trace");
        assert_eq!(config.index.capacity, 250);

        // Clean up
        std::env::remove_var("GANGLION_DATA_DIR");
        std::env::remove_var("GANGLION_LOG_LEVEL");
        std::env::remove_var("GANGLION_INDEX_CAPACITY");
    }
}
