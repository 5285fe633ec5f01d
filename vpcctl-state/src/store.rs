//! Local directory store for resource group records
//!
//! Each record lives in its own JSON file inside one directory. Writes go
//! straight to the target file; a crash mid-write can leave a truncated file,
//! which later reads report as `StoreError::Malformed`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;
use vpcctl_core::record::{Record, SubnetRecord, VpcRecord};
use vpcctl_core::resource::ResourceKind;

use crate::error::{StoreError, StoreResult};
use crate::naming::{config_file_name, is_config_file_name};

/// Record store backed by a local directory
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// Default record directory, relative to the working directory
    pub const DEFAULT_DIR: &'static str = "params";

    /// Create a store over `dir` without touching the filesystem
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create a store over `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let store = Self::new(dir);
        fs::create_dir_all(&store.dir).map_err(|e| {
            StoreError::Io(format!(
                "Failed to create directory {}: {}",
                store.dir.display(),
                e
            ))
        })?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record file for `name`
    pub fn path_for(&self, kind: ResourceKind, name: &str) -> PathBuf {
        self.dir.join(config_file_name(kind, name))
    }

    /// Fail with `AlreadyExists` if a record is already filed where `name` would go
    pub fn ensure_available(&self, kind: ResourceKind, name: &str) -> StoreResult<()> {
        let path = self.path_for(kind, name);
        if !path.exists() {
            return Ok(());
        }

        let stored_name = self
            .read_record(&path, kind)
            .map(|record| record.name().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        Err(StoreError::AlreadyExists { path, stored_name })
    }

    /// Write a record to its file, replacing any previous content
    pub fn save(&self, record: &Record) -> StoreResult<PathBuf> {
        let path = self.path_for(record.kind(), record.name());

        let content = serde_json::to_string_pretty(record).map_err(|e| {
            StoreError::Serialization(format!("Failed to serialize record: {}", e))
        })?;

        fs::create_dir_all(&self.dir).map_err(|e| {
            StoreError::Io(format!(
                "Failed to create directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        fs::write(&path, content).map_err(|e| {
            StoreError::Io(format!("Failed to write {}: {}", path.display(), e))
        })?;

        debug!("Wrote {} record to {}", record.kind(), path.display());
        Ok(path)
    }

    /// Load the record in `file_name`; its prefix selects the record type
    pub fn load(&self, file_name: &str) -> StoreResult<Record> {
        let kind = ResourceKind::from_file_name(file_name)
            .ok_or_else(|| StoreError::UnknownKind(file_name.to_string()))?;
        self.read_record(&self.dir.join(file_name), kind)
    }

    pub fn load_vpc(&self, name: &str) -> StoreResult<VpcRecord> {
        let path = self.path_for(ResourceKind::Vpc, name);
        match self.read_record(&path, ResourceKind::Vpc)? {
            Record::Vpc(record) => Ok(record),
            other => Err(unexpected_kind(&path, ResourceKind::Vpc, &other)),
        }
    }

    pub fn load_subnet(&self, name: &str) -> StoreResult<SubnetRecord> {
        let path = self.path_for(ResourceKind::Subnet, name);
        match self.read_record(&path, ResourceKind::Subnet)? {
            Record::Subnet(record) => Ok(record),
            other => Err(unexpected_kind(&path, ResourceKind::Subnet, &other)),
        }
    }

    /// Delete the record file for `name`
    pub fn remove(&self, kind: ResourceKind, name: &str) -> StoreResult<()> {
        let path = self.path_for(kind, name);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound { path }),
            Err(e) => Err(StoreError::Io(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Load every record file in the directory, sorted by file name
    ///
    /// A file that fails to load is returned with its error rather than
    /// aborting the listing.
    pub fn list(&self) -> StoreResult<Vec<(PathBuf, StoreResult<Record>)>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Io(format!(
                    "Failed to read directory {}: {}",
                    self.dir.display(),
                    e
                )));
            }
        };

        let mut file_names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::Io(e.to_string()))?;
            if let Some(name) = entry.file_name().to_str()
                && is_config_file_name(name)
            {
                file_names.push(name.to_string());
            }
        }
        file_names.sort();

        Ok(file_names
            .into_iter()
            .map(|name| {
                let record = self.load(&name);
                (self.dir.join(name), record)
            })
            .collect())
    }

    fn read_record(&self, path: &Path, kind: ResourceKind) -> StoreResult<Record> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => {
                return Err(StoreError::Io(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let record: Record = serde_json::from_str(&content)
            .map_err(|e| StoreError::malformed(path, e.to_string()))?;

        if record.kind() != kind {
            return Err(unexpected_kind(path, kind, &record));
        }

        record
            .validate()
            .map_err(|e| StoreError::malformed(path, e.to_string()))?;

        debug!("Loaded {} record from {}", kind, path.display());
        Ok(record)
    }
}

fn unexpected_kind(path: &Path, expected: ResourceKind, found: &Record) -> StoreError {
    StoreError::malformed(
        path,
        format!("expected a {} record, found {}", expected, found.kind()),
    )
}
