//! Remote side of a sync run: the object store seam, the S3 store, gzip
//! variants and run statistics.

pub mod compress;
#[cfg(test)]
pub mod memory;
pub mod report;
pub mod s3;
pub mod store;

#[cfg(test)]
pub use memory::MemoryStore;
pub use report::SyncReport;
pub use s3::S3Store;
pub use store::{ObjectMetadata, ObjectStore, PutObject};
