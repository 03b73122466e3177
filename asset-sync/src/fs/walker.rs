//! Directory traversal for the asset tree.
//!
//! Produces every regular file under the sync root together with its
//! storage-style relative key (`/` separated on every platform).

use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Options for directory walking
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Descend into symlinked directories
    pub follow_links: bool,

    /// Root-level file names that are never listed (the local manifest cache)
    pub skip_root_files: Vec<String>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            follow_links: false,
            skip_root_files: Vec::new(),
        }
    }
}

impl WalkOptions {
    /// Walk options for a sync run: skip the local manifest cache at the root.
    pub fn for_manifest(local_manifest_file: &str) -> Self {
        Self {
            skip_root_files: vec![local_manifest_file.to_string()],
            ..Self::default()
        }
    }
}

/// A file discovered during walking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Full path to the file
    pub path: PathBuf,

    /// Relative key from the root, `/` separated
    pub relative_path: String,

    /// File size in bytes
    pub size: u64,
}

impl FileInfo {
    /// Create FileInfo from a DirEntry.
    /// Returns None for directories, broken symlinks and symlinks to directories.
    fn from_entry(entry: &DirEntry, root: &Path) -> std::io::Result<Option<Self>> {
        if entry.file_type().is_dir() {
            return Ok(None);
        }

        let path = entry.path().to_path_buf();

        // file symlinks resolve here; links to directories land in `Ok(_)`
        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Ok(None),
            Err(e) if entry.path_is_symlink() => {
                tracing::debug!("Skipping broken symlink {}: {}", path.display(), e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let relative = path.strip_prefix(root).unwrap_or(&path);
        let Some(relative_path) = to_key(relative) else {
            tracing::warn!("Skipping non UTF-8 path {}", path.display());
            return Ok(None);
        };

        Ok(Some(Self {
            path,
            relative_path,
            size: metadata.len(),
        }))
    }
}

/// Walk a directory tree and collect all files, sorted by relative key.
///
/// # Arguments
/// * `root` - Root directory to start walking from
/// * `options` - Walking options
///
/// # Returns
/// * `Ok(Vec<FileInfo>)` - List of all files found
/// * `Err(io::Error)` - If the root or a subdirectory cannot be read
pub fn walk_directory(root: &Path, options: &WalkOptions) -> std::io::Result<Vec<FileInfo>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(options.follow_links)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry?;

        if entry.depth() == 1 && is_skipped_root_file(&entry, &options.skip_root_files) {
            continue;
        }

        if let Some(file_info) = FileInfo::from_entry(&entry, root)? {
            files.push(file_info);
        }
    }

    Ok(files)
}

/// Calculate total size of a file listing
pub fn total_size(files: &[FileInfo]) -> u64 {
    files.iter().map(|f| f.size).sum()
}

/// Convert a relative filesystem path into a `/` separated object key
pub fn to_key(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

fn is_skipped_root_file(entry: &DirEntry, skipped: &[String]) -> bool {
    let file_name = entry.file_name().to_string_lossy();
    skipped.iter().any(|name| file_name == name.as_str())
}
