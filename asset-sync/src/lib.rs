//! Asset Sync Library
//!
//! Incremental static-asset uploader: fingerprints a directory tree, diffs it
//! against the manifest left by the previous run and uploads only what
//! changed, with gzip variants for text assets.

pub mod config;
pub mod executor;
pub mod fs;
pub mod transfer;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use executor::SyncExecutor;
pub use transfer::SyncReport;
pub use utils::errors::SyncError;
pub type Result<T> = std::result::Result<T, SyncError>;
