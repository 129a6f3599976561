use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Serializable store settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root directory that asset paths are resolved against
    pub asset_root: PathBuf,
    /// Background loader threads. 0 lets the pool pick.
    pub worker_threads: usize,
    /// Prefix for loader thread names
    pub thread_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            worker_threads: 0,
            thread_name: "asset-loader".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_asset_root(mut self, asset_root: impl Into<PathBuf>) -> Self {
        self.asset_root = asset_root.into();
        self
    }

    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssetError;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = StoreConfig::from_json_str(r#"{ "worker_threads": 3 }"#).unwrap();
        assert_eq!(config.worker_threads, 3);
        assert_eq!(config.asset_root, PathBuf::from("assets"));
        assert_eq!(config.thread_name, "asset-loader");
    }

    #[test]
    fn test_json_round_trip() {
        let config = StoreConfig::default()
            .with_asset_root("content")
            .with_worker_threads(2);
        let parsed = StoreConfig::from_json_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        assert!(matches!(
            StoreConfig::from_json_str("{ worker_threads"),
            Err(AssetError::Config(_))
        ));
        assert!(matches!(
            StoreConfig::from_file("nonexistent.json"),
            Err(AssetError::IoError(_))
        ));
    }
}
