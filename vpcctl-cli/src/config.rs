//! Startup configuration shared by every command

use std::path::PathBuf;

use vpcctl_state::{LocalStore, StoreResult};

/// Environment variable overriding the record directory
pub const PARAMS_DIR_ENV: &str = "VPCTL_PARAMS_DIR";

/// Configuration built once at startup and passed to each command handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Directory holding one record file per resource group
    pub params_dir: PathBuf,
}

impl AppConfig {
    pub fn new(params_dir: impl Into<PathBuf>) -> Self {
        Self {
            params_dir: params_dir.into(),
        }
    }

    /// Open the record store, creating the directory if needed
    pub fn store(&self) -> StoreResult<LocalStore> {
        LocalStore::open(&self.params_dir)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new(LocalStore::DEFAULT_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_params_dir() {
        assert_eq!(AppConfig::default().params_dir, PathBuf::from("params"));
    }

    #[test]
    fn test_store_creates_params_dir() {
        let dir = tempdir().unwrap();
        let config = AppConfig::new(dir.path().join("params"));

        let store = config.store().unwrap();
        assert!(store.dir().is_dir());
    }
}
