//! Run statistics and human-readable formatting.

use std::fmt;
use std::time::Duration;

/// Outcome of a sync run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Files found under the root
    pub total_files: usize,
    pub total_bytes: u64,

    /// Files selected for upload
    pub candidates: usize,
    pub unchanged_files: usize,
    pub ignored_files: usize,

    /// Objects written, counting plain and gzip variants separately
    pub uploaded_objects: usize,
    pub compressed_objects: usize,
    pub uploaded_bytes: u64,
    pub failed_uploads: usize,
    pub extra_files_uploaded: usize,

    /// The remote manifest could not be read and was treated as empty
    pub remote_manifest_fallback: bool,
    pub manifest_persisted: bool,

    pub elapsed: Duration,
}

impl SyncReport {
    /// Nothing went wrong: every upload and the manifest write succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed_uploads == 0 && self.manifest_persisted
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files ({}) scanned: {} to upload, {} unchanged, {} ignored; \
             {} objects uploaded ({} gzip, {} extra), {} sent, {} failed in {}",
            self.total_files,
            format_bytes(self.total_bytes),
            self.candidates,
            self.unchanged_files,
            self.ignored_files,
            self.uploaded_objects,
            self.compressed_objects,
            self.extra_files_uploaded,
            format_bytes(self.uploaded_bytes),
            self.failed_uploads,
            format_duration(self.elapsed),
        )
    }
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Format a duration as a human-readable string
pub fn format_duration(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    if seconds < 60 {
        format!("{:.3}s", elapsed.as_secs_f64())
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}
