//! Candidate selection: ignore rules plus the manifest diff.

use std::collections::BTreeSet;

use super::manifest::Manifest;
use crate::config::SyncConfig;
use crate::fs::walker::FileInfo;

/// Why a file is left out of the upload set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    IgnoredDirectory,
    IgnoredExtension,
    Unchanged,
}

/// Result of diffing scanned files against the remote manifest
#[derive(Debug, Default)]
pub struct DiffResult {
    /// Files to upload (new or modified)
    pub candidates: Vec<FileInfo>,
    pub candidate_bytes: u64,
    /// Files whose fingerprint matches the remote manifest
    pub unchanged: usize,
    /// Files excluded by an ignore rule
    pub ignored: usize,
}

/// Ignore rules from the sync configuration
#[derive(Debug, Clone)]
pub struct IgnoreRules<'a> {
    directories: &'a BTreeSet<String>,
    extensions: &'a BTreeSet<String>,
}

impl<'a> IgnoreRules<'a> {
    pub fn new(config: &'a SyncConfig) -> Self {
        Self {
            directories: &config.ignored_directories,
            extensions: &config.ignored_extensions,
        }
    }

    /// `path` lies under one of the ignored directories, compared by whole
    /// path components.
    pub fn is_inside_ignored_dir(&self, path: &str) -> bool {
        self.directories.iter().any(|dir| {
            let dir = dir.trim_matches('/');
            !dir.is_empty()
                && path
                    .strip_prefix(dir)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    /// Any dot-separated segment of the file name after the first one is an
    /// ignored extension, so `site.bak.css` counts as a `bak` file.
    pub fn has_ignored_extension(&self, path: &str) -> bool {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        file_name
            .split('.')
            .skip(1)
            .any(|segment| self.extensions.contains(segment))
    }

    pub fn check(&self, path: &str) -> Option<Skip> {
        if self.is_inside_ignored_dir(path) {
            Some(Skip::IgnoredDirectory)
        } else if self.has_ignored_extension(path) {
            Some(Skip::IgnoredExtension)
        } else {
            None
        }
    }
}

/// Compare scanned files against the remote manifest to determine what to upload.
///
/// A file is a candidate when no ignore rule matches and its local fingerprint
/// is missing from, or differs from, the remote manifest.
pub fn diff_files_against_manifest(
    files: &[FileInfo],
    local: &Manifest,
    remote: &Manifest,
    rules: &IgnoreRules<'_>,
) -> DiffResult {
    let mut result = DiffResult::default();

    for file in files {
        let rel = file.relative_path.as_str();

        let skip = rules
            .check(rel)
            .or_else(|| local.is_tracked(rel, remote).then_some(Skip::Unchanged));

        match skip {
            Some(Skip::Unchanged) => {
                tracing::debug!("Unchanged: {}", rel);
                result.unchanged += 1;
            }
            Some(reason) => {
                tracing::debug!("Ignored ({:?}): {}", reason, rel);
                result.ignored += 1;
            }
            None => {
                result.candidate_bytes += file.size;
                result.candidates.push(file.clone());
            }
        }
    }

    result
}
