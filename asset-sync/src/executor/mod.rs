//! Sync executor - Orchestrates a single incremental upload run.
//!
//! This module ties together all the pieces:
//! - File system walker and fingerprints
//! - Local manifest cache
//! - Remote manifest fetch and diff
//! - Plain and gzip uploads
//! - Manifest finalization

pub mod filter;
pub mod manifest;

use filter::{diff_files_against_manifest, IgnoreRules};
use manifest::Manifest;
use std::io;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::{Config, SyncConfig, UploadConfig};
use crate::fs::content_type::guess_content_type;
use crate::fs::fingerprint::build_manifest;
use crate::fs::walker::{total_size, walk_directory, WalkOptions};
use crate::transfer::compress::{compressed_key, gzip};
use crate::transfer::report::{format_bytes, SyncReport};
use crate::transfer::store::{ObjectMetadata, ObjectStore, PutObject};
use crate::utils::errors::{FetchError, Result, SyncError};

/// Content type of the persisted manifest
const MANIFEST_CONTENT_TYPE: &str = "application/json";

/// Which form of a file an upload request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// The file as-is, under its own key
    Plain,
    /// Gzip-compressed, under a `.gz`-marked key
    Gzip,
}

/// A completed upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploaded {
    pub key: String,
    pub bytes: u64,
    pub variant: Variant,
}

/// Main sync executor
pub struct SyncExecutor<'a> {
    store: &'a dyn ObjectStore,
    sync: &'a SyncConfig,
    upload: &'a UploadConfig,
}

impl<'a> SyncExecutor<'a> {
    pub fn new(store: &'a dyn ObjectStore, config: &'a Config) -> Self {
        Self {
            store,
            sync: &config.sync,
            upload: &config.upload,
        }
    }

    /// Execute a sync run over `root`.
    ///
    /// Fails on an unreachable store or any local I/O error. Individual upload
    /// failures are logged and counted in the report instead.
    pub async fn execute(&self, root: &Path) -> Result<SyncReport> {
        let start_time = Instant::now();
        let mut report = SyncReport::default();

        self.store.check_access().await?;
        info!("Starting sync of {} to {}", root.display(), self.store.describe());

        // Enumerate and fingerprint
        let root_owned = root.to_path_buf();
        let walk_options = WalkOptions::for_manifest(&self.sync.local_manifest_file);
        let (files, computed) = tokio::task::spawn_blocking(move || -> io::Result<_> {
            let files = walk_directory(&root_owned, &walk_options)?;
            let manifest = build_manifest(&files)?;
            Ok((files, manifest))
        })
        .await
        .map_err(|e| SyncError::Io(io::Error::other(e)))??;

        report.total_files = files.len();
        report.total_bytes = total_size(&files);
        info!(
            "Scanned {}: {} files, {}",
            root.display(),
            report.total_files,
            format_bytes(report.total_bytes)
        );

        // Local manifest cache: the diff works on what was persisted
        let local_path = root.join(&self.sync.local_manifest_file);
        computed.write_local(&local_path)?;
        let local = Manifest::read_local(&local_path)?;

        let remote = match self.fetch_remote_manifest().await {
            Ok(remote) => {
                info!("Fetched remote manifest: {} files", remote.len());
                remote
            }
            Err(FetchError::NotFound) => {
                info!(
                    "No remote manifest at {}, uploading everything",
                    self.sync.remote_manifest_key
                );
                report.remote_manifest_fallback = true;
                Manifest::new()
            }
            Err(e) => {
                warn!("Failed to fetch remote manifest, uploading everything: {}", e);
                report.remote_manifest_fallback = true;
                Manifest::new()
            }
        };

        let rules = IgnoreRules::new(self.sync);
        let diff = diff_files_against_manifest(&files, &local, &remote, &rules);
        report.candidates = diff.candidates.len();
        report.unchanged_files = diff.unchanged;
        report.ignored_files = diff.ignored;
        info!(
            "Diff: {} to upload ({}), {} unchanged, {} ignored",
            diff.candidates.len(),
            format_bytes(diff.candidate_bytes),
            diff.unchanged,
            diff.ignored
        );

        for file in &diff.candidates {
            let data = tokio::fs::read(&file.path).await?;

            let plain = self
                .upload_file(&file.path, &file.relative_path, &data, Variant::Plain)
                .await;
            record(&mut report, &file.relative_path, plain);

            if self.sync.compression_enabled && self.is_compressible(&file.path) {
                let compressed = self
                    .upload_file(&file.path, &file.relative_path, &data, Variant::Gzip)
                    .await;
                record(&mut report, &file.relative_path, compressed);
            }
        }

        if !self.sync.extra_files.is_empty() {
            info!("Uploading {} extra files", self.sync.extra_files.len());
        }
        for (local_file, key) in &self.sync.extra_files {
            let outcome = match tokio::fs::read(local_file).await {
                Ok(data) => {
                    self.upload_file(local_file, key, &data, Variant::Plain)
                        .await
                }
                Err(e) => Err(SyncError::Io(e)),
            };
            if matches!(outcome, Ok(Some(_))) {
                report.extra_files_uploaded += 1;
            }
            record(&mut report, key, outcome);
        }

        report.manifest_persisted = match self.persist_manifest(&local).await {
            Ok(()) => {
                info!(
                    "Persisted manifest ({} files) to {}",
                    local.len(),
                    self.sync.remote_manifest_key
                );
                true
            }
            Err(e) => {
                warn!("Failed to persist manifest {}: {}", self.sync.remote_manifest_key, e);
                false
            }
        };

        report.elapsed = start_time.elapsed();
        Ok(report)
    }

    /// Fetch the manifest of the previous run.
    ///
    /// The caller decides the fallback; nothing here defaults to empty.
    pub async fn fetch_remote_manifest(&self) -> std::result::Result<Manifest, FetchError> {
        let bytes = self.store.get(&self.sync.remote_manifest_key).await?;
        Ok(Manifest::from_json(&bytes)?)
    }

    /// Upload one variant of a file.
    ///
    /// The content type is guessed from `local_path`. A [`Variant::Gzip`]
    /// request for a type that is not compressible uploads nothing and
    /// returns `Ok(None)`; it never falls back to the plain payload.
    pub async fn upload_file(
        &self,
        local_path: &Path,
        key: &str,
        data: &[u8],
        variant: Variant,
    ) -> Result<Option<Uploaded>> {
        let key = normalize_key(key);
        if key.is_empty() {
            return Err(SyncError::Config(format!(
                "empty object key for {}",
                local_path.display()
            )));
        }

        let content_type = self.content_type(local_path);
        let mut metadata = ObjectMetadata {
            content_type: content_type.to_string(),
            cache_control: self.upload.cache_control.clone(),
            access_policy: self.upload.access_policy.clone(),
            content_encoding: None,
        };

        let (key, body) = match variant {
            Variant::Plain => (key.to_string(), data.to_vec()),
            Variant::Gzip if self.sync.compressible_types.contains(content_type) => {
                metadata.content_encoding = Some("gzip".to_string());
                (compressed_key(key), gzip(data).await?)
            }
            Variant::Gzip => return Ok(None),
        };

        let bytes = body.len() as u64;
        info!("Uploading {} to {} ({})", local_path.display(), key, format_bytes(bytes));
        self.store
            .put(PutObject {
                key: key.clone(),
                body,
                metadata,
            })
            .await?;

        Ok(Some(Uploaded {
            key,
            bytes,
            variant,
        }))
    }

    async fn persist_manifest(&self, manifest: &Manifest) -> Result<()> {
        self.store
            .put(PutObject {
                key: self.sync.remote_manifest_key.clone(),
                body: manifest.to_json()?,
                metadata: ObjectMetadata {
                    content_type: MANIFEST_CONTENT_TYPE.to_string(),
                    cache_control: self.upload.cache_control.clone(),
                    access_policy: self.upload.access_policy.clone(),
                    content_encoding: None,
                },
            })
            .await
    }

    fn content_type<'p>(&'p self, path: &Path) -> &'p str {
        guess_content_type(path).unwrap_or(self.upload.default_content_type.as_str())
    }

    fn is_compressible(&self, path: &Path) -> bool {
        self.sync.compressible_types.contains(self.content_type(path))
    }
}

/// Drop leading `./` and `/` so keys never start with a separator
fn normalize_key(key: &str) -> &str {
    let mut key = key;
    loop {
        let trimmed = key.trim_start_matches('/');
        let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
        if trimmed.len() == key.len() {
            return key;
        }
        key = trimmed;
    }
}

fn record(report: &mut SyncReport, key: &str, outcome: Result<Option<Uploaded>>) {
    match outcome {
        Ok(Some(uploaded)) => {
            report.uploaded_objects += 1;
            report.uploaded_bytes += uploaded.bytes;
            if uploaded.variant == Variant::Gzip {
                report.compressed_objects += 1;
            }
        }
        Ok(None) => {}
        Err(e) => {
            warn!("Failed to upload {}: {}", key, e);
            report.failed_uploads += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::fingerprint::fingerprint_bytes;
    use crate::transfer::MemoryStore;
    use async_compression::tokio::bufread::GzipDecoder;
    use std::fs;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    const CSS: &[u8] = b"body { margin: 0; padding: 0; }\n";
    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn asset_tree() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("style.css"), CSS).unwrap();
        fs::write(temp_dir.path().join("logo.png"), PNG).unwrap();
        temp_dir
    }

    async fn gunzip(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        GzipDecoder::new(data).read_to_end(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn test_first_run_then_unchanged_run() {
        let root = asset_tree();
        let store = MemoryStore::new();
        let config = Config::default();
        let executor = SyncExecutor::new(&store, &config);

        let report = executor.execute(root.path()).await.unwrap();
        assert_eq!(
            store.put_log(),
            vec!["logo.png", "style.css", "style.gz.css", "META.json"]
        );
        assert!(report.remote_manifest_fallback);
        assert!(report.is_clean());
        assert_eq!(report.total_files, 2);
        assert_eq!(report.candidates, 2);
        assert_eq!(report.uploaded_objects, 3);
        assert_eq!(report.compressed_objects, 1);

        let remote = Manifest::from_json(&store.object("META.json").unwrap().body).unwrap();
        assert_eq!(remote.len(), 2);
        assert_eq!(remote.get("style.css"), Some(fingerprint_bytes(CSS).as_str()));
        assert_eq!(remote.get("logo.png"), Some(fingerprint_bytes(PNG).as_str()));

        store.clear_put_log();
        let report = executor.execute(root.path()).await.unwrap();
        assert_eq!(store.put_log(), vec!["META.json"]);
        assert!(!report.remote_manifest_fallback);
        assert_eq!(report.candidates, 0);
        assert_eq!(report.unchanged_files, 2);
        assert_eq!(report.uploaded_objects, 0);
        assert_eq!(report.uploaded_bytes, 0);

        let after = Manifest::from_json(&store.object("META.json").unwrap().body).unwrap();
        assert_eq!(after, remote);
    }

    #[tokio::test]
    async fn test_object_headers() {
        let root = asset_tree();
        let store = MemoryStore::new();
        let config = Config::default();
        SyncExecutor::new(&store, &config)
            .execute(root.path())
            .await
            .unwrap();

        let plain = store.object("style.css").unwrap();
        assert_eq!(plain.body, CSS);
        assert_eq!(plain.metadata.content_type, "text/css");
        assert_eq!(plain.metadata.cache_control, "public,max-age=31536000");
        assert_eq!(plain.metadata.access_policy, "public-read");
        assert_eq!(plain.metadata.content_encoding, None);

        let compressed = store.object("style.gz.css").unwrap();
        assert_eq!(compressed.metadata.content_type, "text/css");
        assert_eq!(compressed.metadata.content_encoding.as_deref(), Some("gzip"));
        assert_eq!(gunzip(&compressed.body).await, CSS);

        let image = store.object("logo.png").unwrap();
        assert_eq!(image.metadata.content_type, "image/png");
        assert_eq!(image.metadata.content_encoding, None);

        let manifest = store.object("META.json").unwrap();
        assert_eq!(manifest.metadata.content_type, "application/json");
    }

    #[tokio::test]
    async fn test_changed_file_is_uploaded_once() {
        let root = asset_tree();
        let store = MemoryStore::new();
        let config = Config::default();
        let executor = SyncExecutor::new(&store, &config);
        executor.execute(root.path()).await.unwrap();

        fs::write(root.path().join("style.css"), b"body { margin: 1px; }").unwrap();
        store.clear_put_log();
        let report = executor.execute(root.path()).await.unwrap();

        assert_eq!(store.put_log(), vec!["style.css", "style.gz.css", "META.json"]);
        assert_eq!(report.candidates, 1);
        assert_eq!(report.unchanged_files, 1);

        let remote = Manifest::from_json(&store.object("META.json").unwrap().body).unwrap();
        assert_eq!(
            remote.get("style.css"),
            Some(fingerprint_bytes(b"body { margin: 1px; }").as_str())
        );
    }

    #[tokio::test]
    async fn test_ignored_files_are_never_uploaded() {
        let root = asset_tree();
        fs::create_dir(root.path().join("admin")).unwrap();
        fs::write(root.path().join("admin/base.css"), CSS).unwrap();
        fs::write(root.path().join("style.css.swp"), b"swap").unwrap();

        let store = MemoryStore::new();
        let mut config = Config::default();
        config.sync.ignored_directories.insert("admin".to_string());
        let executor = SyncExecutor::new(&store, &config);

        let report = executor.execute(root.path()).await.unwrap();
        assert_eq!(report.ignored_files, 2);
        assert!(store.object("admin/base.css").is_none());
        assert!(store.object("admin/base.gz.css").is_none());
        assert!(store.object("style.css.swp").is_none());

        // still ignored once the manifest already lists them
        store.clear_put_log();
        executor.execute(root.path()).await.unwrap();
        assert_eq!(store.put_log(), vec!["META.json"]);
    }

    #[tokio::test]
    async fn test_compression_disabled_uploads_plain_only() {
        let root = asset_tree();
        let store = MemoryStore::new();
        let mut config = Config::default();
        config.sync.compression_enabled = false;

        SyncExecutor::new(&store, &config)
            .execute(root.path())
            .await
            .unwrap();
        assert_eq!(store.put_log(), vec!["logo.png", "style.css", "META.json"]);
    }

    #[tokio::test]
    async fn test_gzip_request_for_binary_uploads_nothing() {
        let root = asset_tree();
        let store = MemoryStore::new();
        let config = Config::default();
        let executor = SyncExecutor::new(&store, &config);

        let path = root.path().join("logo.png");
        let outcome = executor
            .upload_file(&path, "logo.png", PNG, Variant::Gzip)
            .await
            .unwrap();

        assert_eq!(outcome, None);
        assert!(store.put_log().is_empty());
    }

    #[tokio::test]
    async fn test_upload_file_variants() {
        let root = asset_tree();
        let store = MemoryStore::new();
        let config = Config::default();
        let executor = SyncExecutor::new(&store, &config);
        let path = root.path().join("style.css");

        let plain = executor
            .upload_file(&path, "./css/style.css", CSS, Variant::Plain)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(plain.key, "css/style.css");
        assert_eq!(plain.bytes, CSS.len() as u64);

        let gz = executor
            .upload_file(&path, "css/style.css", CSS, Variant::Gzip)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(gz.key, "css/style.gz.css");
        assert_eq!(gz.variant, Variant::Gzip);
    }

    #[tokio::test]
    async fn test_unknown_extension_defaults_to_text_plain() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("LICENSE"), b"MIT").unwrap();

        let store = MemoryStore::new();
        let config = Config::default();
        SyncExecutor::new(&store, &config)
            .execute(root.path())
            .await
            .unwrap();

        let object = store.object("LICENSE").unwrap();
        assert_eq!(object.metadata.content_type, "text/plain");
        assert!(store.object("LICENSE.gz").is_none());
    }

    #[tokio::test]
    async fn test_malformed_remote_manifest_uploads_everything() {
        let root = asset_tree();
        let store = MemoryStore::new();
        store.seed("META.json", b"<html>Access Denied</html>");
        let config = Config::default();
        let executor = SyncExecutor::new(&store, &config);

        assert!(matches!(
            executor.fetch_remote_manifest().await,
            Err(FetchError::Malformed(_))
        ));

        let report = executor.execute(root.path()).await.unwrap();
        assert!(report.remote_manifest_fallback);
        assert_eq!(report.candidates, 2);
        assert_eq!(report.uploaded_objects, 3);
    }

    #[tokio::test]
    async fn test_missing_remote_manifest_is_not_found() {
        let store = MemoryStore::new();
        let config = Config::default();
        let executor = SyncExecutor::new(&store, &config);

        assert!(matches!(
            executor.fetch_remote_manifest().await,
            Err(FetchError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_failed_upload_does_not_abort_run() {
        let root = asset_tree();
        let store = MemoryStore::new();
        store.fail_puts_to("logo.png");
        let config = Config::default();

        let report = SyncExecutor::new(&store, &config)
            .execute(root.path())
            .await
            .unwrap();

        assert_eq!(report.failed_uploads, 1);
        assert_eq!(report.uploaded_objects, 2);
        assert!(report.manifest_persisted);
        assert!(!report.is_clean());
        assert_eq!(store.put_log(), vec!["style.css", "style.gz.css", "META.json"]);
    }

    #[tokio::test]
    async fn test_failed_manifest_persist_is_reported() {
        let root = asset_tree();
        let store = MemoryStore::new();
        store.fail_puts_to("META.json");
        let config = Config::default();

        let report = SyncExecutor::new(&store, &config)
            .execute(root.path())
            .await
            .unwrap();

        assert!(!report.manifest_persisted);
        assert_eq!(report.uploaded_objects, 3);
    }

    #[tokio::test]
    async fn test_unreachable_store_is_fatal() {
        let root = asset_tree();
        let store = MemoryStore::new();
        store.set_unreachable(true);
        let config = Config::default();

        let result = SyncExecutor::new(&store, &config).execute(root.path()).await;
        assert!(matches!(result, Err(SyncError::Storage(_))));
        assert!(store.put_log().is_empty());
    }

    #[tokio::test]
    async fn test_missing_root_is_fatal() {
        let root = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let config = Config::default();

        let result = SyncExecutor::new(&store, &config)
            .execute(&root.path().join("absent"))
            .await;
        assert!(matches!(result, Err(SyncError::Io(_))));
    }

    #[tokio::test]
    async fn test_local_manifest_cache_is_written_and_not_uploaded() {
        let root = asset_tree();
        let store = MemoryStore::new();
        let config = Config::default();
        let executor = SyncExecutor::new(&store, &config);
        executor.execute(root.path()).await.unwrap();

        let cache_path = root.path().join("META.local.json");
        let cached = Manifest::read_local(&cache_path).unwrap();
        let remote = Manifest::from_json(&store.object("META.json").unwrap().body).unwrap();
        assert_eq!(cached, remote);

        executor.execute(root.path()).await.unwrap();
        assert!(store.object("META.local.json").is_none());
        assert!(!store.keys().iter().any(|k| k.ends_with("META.local.json")));
    }

    #[tokio::test]
    async fn test_extra_files_upload_every_run() {
        let root = asset_tree();
        let outside = TempDir::new().unwrap();
        let robots = outside.path().join("robots.txt");
        fs::write(&robots, b"User-agent: *").unwrap();

        let store = MemoryStore::new();
        let mut config = Config::default();
        config
            .sync
            .extra_files
            .insert(robots.clone(), "/robots.txt".to_string());
        config
            .sync
            .extra_files
            .insert(outside.path().join("missing.txt"), "missing.txt".to_string());
        let executor = SyncExecutor::new(&store, &config);

        let report = executor.execute(root.path()).await.unwrap();
        assert_eq!(report.extra_files_uploaded, 1);
        assert_eq!(report.failed_uploads, 1);
        assert_eq!(store.object("robots.txt").unwrap().body, b"User-agent: *");

        store.clear_put_log();
        executor.execute(root.path()).await.unwrap();
        assert_eq!(store.put_log(), vec!["robots.txt", "META.json"]);

        let remote = Manifest::from_json(&store.object("META.json").unwrap().body).unwrap();
        assert!(remote.get("robots.txt").is_none());
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("./css/a.css"), "css/a.css");
        assert_eq!(normalize_key("/robots.txt"), "robots.txt");
        assert_eq!(normalize_key(".//./a.js"), "a.js");
        assert_eq!(normalize_key(".htaccess"), ".htaccess");
        assert_eq!(normalize_key("./"), "");
    }
}
