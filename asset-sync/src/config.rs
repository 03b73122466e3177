//! Configuration management for the asset sync engine.
//!
//! Loads configuration from a TOML file with environment variable overrides
//! for the storage target. Every field has a default, so an empty file (or no
//! file at all) yields a working configuration.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::utils::errors::{Result, SyncError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub sync: SyncConfig,
    pub upload: UploadConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Destination bucket for static assets
    pub bucket: String,

    /// AWS region of the bucket
    pub region: String,

    /// Endpoint override for S3-compatible stores (MinIO, R2, ...)
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Top-level directories (relative to the root) that are never uploaded
    pub ignored_directories: BTreeSet<String>,

    /// File extensions (without the dot) that are never uploaded
    pub ignored_extensions: BTreeSet<String>,

    /// Upload a gzip variant next to every compressible asset
    pub compression_enabled: bool,

    /// Object key holding the manifest of the last successful run
    pub remote_manifest_key: String,

    /// Local manifest cache, written inside the synced root
    pub local_manifest_file: String,

    /// Content types eligible for a gzip variant
    pub compressible_types: BTreeSet<String>,

    /// Files outside the root uploaded on every run (local path -> object key)
    pub extra_files: BTreeMap<PathBuf, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Canned ACL applied to every object
    pub access_policy: String,

    /// Cache-Control header applied to every object
    pub cache_control: String,

    /// Content type used when the extension is unknown
    pub default_content_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

// Default values
fn default_bucket() -> String {
    "ces27".to_string()
}

fn default_region() -> String {
    "sa-east-1".to_string()
}

fn default_ignored_extensions() -> BTreeSet<String> {
    ["swp", "bak", "pyc", "old"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_compressible_types() -> BTreeSet<String> {
    [
        "text/css",
        "text/javascript",
        "application/javascript",
        "application/css",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_remote_manifest_key() -> String {
    "META.json".to_string()
}

fn default_local_manifest_file() -> String {
    "META.local.json".to_string()
}

fn default_access_policy() -> String {
    "public-read".to_string()
}

fn default_cache_control() -> String {
    "public,max-age=31536000".to_string()
}

fn default_content_type() -> String {
    "text/plain".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            region: default_region(),
            endpoint: None,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            ignored_directories: BTreeSet::new(),
            ignored_extensions: default_ignored_extensions(),
            compression_enabled: true,
            remote_manifest_key: default_remote_manifest_key(),
            local_manifest_file: default_local_manifest_file(),
            compressible_types: default_compressible_types(),
            extra_files: BTreeMap::new(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            access_policy: default_access_policy(),
            cache_control: default_cache_control(),
            default_content_type: default_content_type(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| SyncError::Config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `ASSET_SYNC_*` environment overrides on top of the file values.
    ///
    /// A `.env` file in the working directory is loaded first, if present.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        let _ = dotenvy::dotenv();
        self.apply_overrides(|name| std::env::var(name).ok());
        self.validate()?;
        Ok(self)
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bucket) = lookup("ASSET_SYNC_BUCKET") {
            self.storage.bucket = bucket;
        }
        if let Some(region) = lookup("ASSET_SYNC_REGION") {
            self.storage.region = region;
        }
        if let Some(endpoint) = lookup("ASSET_SYNC_ENDPOINT") {
            self.storage.endpoint = Some(endpoint).filter(|e| !e.is_empty());
        }
    }

    fn validate(&self) -> Result<()> {
        if self.storage.bucket.trim().is_empty() {
            return Err(SyncError::Config("storage.bucket must not be empty".into()));
        }
        if self.sync.remote_manifest_key.trim().is_empty() {
            return Err(SyncError::Config(
                "sync.remote_manifest_key must not be empty".into(),
            ));
        }
        if self.sync.local_manifest_file.trim().is_empty()
            || self.sync.local_manifest_file.contains(['/', '\\'])
        {
            return Err(SyncError::Config(
                "sync.local_manifest_file must be a plain file name".into(),
            ));
        }
        if let Some(ext) = self.sync.ignored_extensions.iter().find(|e| e.starts_with('.')) {
            return Err(SyncError::Config(format!(
                "sync.ignored_extensions entries are given without the dot: {ext}"
            )));
        }
        Ok(())
    }
}
