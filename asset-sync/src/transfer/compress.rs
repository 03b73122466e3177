//! Gzip variants of text assets.

use async_compression::tokio::bufread::GzipEncoder;
use async_compression::Level;
use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::utils::errors::{Result, SyncError};

/// Compression level used for uploaded variants
pub const GZIP_LEVEL: i32 = 6;

/// Marker inserted before the extension of a compressed variant's key
pub const GZIP_MARKER: &str = "gz";

/// Gzip `data` at [`GZIP_LEVEL`].
pub async fn gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzipEncoder::with_quality(data, Level::Precise(GZIP_LEVEL));
    let mut compressed = Vec::with_capacity(data.len() / 2);
    encoder
        .read_to_end(&mut compressed)
        .await
        .map_err(|e| SyncError::Compression(e.to_string()))?;
    Ok(compressed)
}

/// Key of the compressed variant: `.gz` goes right before the final extension.
///
/// `css/style.css` becomes `css/style.gz.css`; a name without an extension
/// gets the marker appended (`LICENSE` becomes `LICENSE.gz`).
pub fn compressed_key(key: &str) -> String {
    let path = Path::new(key);
    let (Some(stem), Some(ext)) = (
        path.file_stem().and_then(|s| s.to_str()),
        path.extension().and_then(|s| s.to_str()),
    ) else {
        return format!("{key}.{GZIP_MARKER}");
    };

    let file_name = format!("{stem}.{GZIP_MARKER}.{ext}");
    match key.rsplit_once('/') {
        Some((parent, _)) => format!("{parent}/{file_name}"),
        None => file_name,
    }
}
