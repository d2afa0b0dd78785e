use std::{
    collections::BTreeMap,
    fs,
    io::Write,
    path::{Component, Path, PathBuf},
};

use chrono::TimeDelta;
use logship_runtime::DURATION_METADATA_KEY;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::{batch::iso8601_duration, error::StoreError};

/// Metadata attached to each uploaded object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub content_type: String,
    pub content_encoding: Option<String>,
    pub content_length: Option<u64>,
    /// Free-form user metadata; always carries the batch duration
    pub user: BTreeMap<String, String>,
}

impl ObjectMetadata {
    pub fn new(content_type: impl Into<String>, duration: TimeDelta) -> Self {
        let mut user = BTreeMap::new();
        user.insert(
            DURATION_METADATA_KEY.to_string(),
            iso8601_duration(duration),
        );

        Self {
            content_type: content_type.into(),
            content_encoding: None,
            content_length: None,
            user,
        }
    }

    pub fn duration(&self) -> Option<&str> {
        self.user.get(DURATION_METADATA_KEY).map(String::as_str)
    }
}

/// Put-object client the upload workers write through.
///
/// Called concurrently from every worker. Transport-level retries, if any,
/// belong to the implementation; the pipeline itself never retries.
pub trait ObjectStore: Send + Sync {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        payload: &[u8],
        meta: &ObjectMetadata,
    ) -> Result<(), StoreError>;
}

/// Object store laid out on the local filesystem as `<root>/<bucket>/<key>`,
/// with the metadata beside each object in `<key>.meta.json`.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

pub const META_SUFFIX: &str = ".meta.json";

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `bucket`/`key` lives on disk, or why it cannot.
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        if bucket.is_empty() || !is_plain_relative(Path::new(bucket)) || bucket.contains('/') {
            return Err(StoreError::InvalidBucket(bucket.to_string()));
        }
        if key.is_empty() || key.ends_with('/') || !is_plain_relative(Path::new(key)) {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(bucket).join(key))
    }

    fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(io_err)?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(bytes).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

fn is_plain_relative(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_)))
}

impl ObjectStore for FsObjectStore {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        payload: &[u8],
        meta: &ObjectMetadata,
    ) -> Result<(), StoreError> {
        let path = self.object_path(bucket, key)?;

        let meta_json = serde_json::to_vec_pretty(meta)
            .map_err(|e| StoreError::Rejected(format!("metadata not serializable: {e}")))?;

        Self::write_atomic(&path, payload)?;

        let mut meta_path = path.into_os_string();
        meta_path.push(META_SUFFIX);
        Self::write_atomic(Path::new(&meta_path), &meta_json)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
