//! Object storage abstraction used by the executor.

use async_trait::async_trait;

use crate::utils::errors::{FetchError, Result};

/// Headers attached to an uploaded object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub content_type: String,
    pub cache_control: String,
    /// Canned ACL, e.g. `public-read`
    pub access_policy: String,
    /// Set only on compressed variants
    pub content_encoding: Option<String>,
}

/// A single object to upload
#[derive(Debug, Clone)]
pub struct PutObject {
    pub key: String,
    pub body: Vec<u8>,
    pub metadata: ObjectMetadata,
}

/// Remote side of a sync run.
///
/// Implementations never retry; the executor decides what a failure means.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Verify the store is reachable with the configured credentials.
    async fn check_access(&self) -> Result<()>;

    /// Fetch an object body.
    async fn get(&self, key: &str) -> std::result::Result<Vec<u8>, FetchError>;

    /// Upload an object, replacing any previous version.
    async fn put(&self, object: PutObject) -> Result<()>;

    /// Human-readable target for log lines, e.g. `s3://bucket`.
    fn describe(&self) -> String;
}
