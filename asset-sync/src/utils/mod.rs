//! Utility modules for the asset sync engine.

pub mod errors;
pub mod logger;

pub use errors::{FetchError, Result, SyncError};
