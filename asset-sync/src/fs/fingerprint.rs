//! Content fingerprints for change detection.

use sha1::{Digest, Sha1};
use std::fs::File;
use std::io;
use std::path::Path;

use super::walker::FileInfo;
use crate::executor::manifest::Manifest;

/// SHA-1 of `bytes` as lowercase hex.
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

/// SHA-1 of the full contents of the file at `path` as lowercase hex.
pub fn fingerprint_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha1::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Build the local manifest for a file listing.
///
/// Any unreadable file fails the whole build: a manifest with holes would
/// record files as synced that were never looked at.
pub fn build_manifest(files: &[FileInfo]) -> io::Result<Manifest> {
    let mut manifest = Manifest::new();
    for file in files {
        let digest = fingerprint_file(&file.path).map_err(|e| {
            io::Error::new(e.kind(), format!("failed to read {}: {}", file.path.display(), e))
        })?;
        manifest.insert(file.relative_path.clone(), digest);
    }
    Ok(manifest)
}
