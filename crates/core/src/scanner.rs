//! Directory walker (spec.md §4.3). `FileScanner` is the pluggable
//! provider contract (grounded on `walkdir::WalkDir` the same way the
//! teacher's `FileIndexService::scan_drive` is, see
//! `examples/M0nkeyFl0wer-your-little-helper-public/crates/services/src/file_index.rs`);
//! `Scanner` is the concrete component that drives a `FileScanner`,
//! upserts every visit into the repository, and optionally prunes
//! missing rows afterward.

use crate::error::Result;
use crate::model::{ScannedFile, StoredFile};
use crate::repository::files::FileRepository;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;

/// Cooperative cancellation shared between a scan and a duplicate-finder
/// run (spec.md §5). Cloning shares the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The pluggable scan strategy (registry kind "scanner").
pub trait FileScanner: Send + Sync {
    fn name(&self) -> &str;

    /// Walk `roots` in order, yielding every regular file (and every
    /// directory) in deterministic pre-order, directory entries sorted
    /// lexicographically within each root. Inaccessible entries are
    /// logged and skipped, never fatal.
    fn walk(
        &self,
        roots: &[PathBuf],
        extensions: &[String],
        follow_symlinks: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<ScannedFile>>;
}

/// Default scanner, built on `walkdir`.
pub struct WalkdirScanner;

impl WalkdirScanner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WalkdirScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl FileScanner for WalkdirScanner {
    fn name(&self) -> &str {
        "walkdir"
    }

    fn walk(
        &self,
        roots: &[PathBuf],
        extensions: &[String],
        follow_symlinks: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<ScannedFile>> {
        let allow: Vec<String> = extensions.iter().map(|e| e.to_lowercase()).collect();
        let mut out = Vec::new();

        for root in roots {
            if cancel.is_cancelled() {
                break;
            }
            let mut visited_inodes: HashSet<u64> = HashSet::new();
            let walker = WalkDir::new(root)
                .follow_links(follow_symlinks)
                .sort_by(|a, b| a.file_name().cmp(b.file_name()));

            for entry in walker {
                if cancel.is_cancelled() {
                    break;
                }
                let entry = match entry {
                    Ok(e) => e,
                    Err(e) => {
                        tracing::warn!(error = %e, "scan: inaccessible entry, skipping");
                        continue;
                    }
                };

                let metadata = match entry.metadata() {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::warn!(path = %entry.path().display(), error = %e, "scan: stat failed, skipping");
                        continue;
                    }
                };

                if follow_symlinks && entry.path_is_symlink() {
                    if let Some(ino) = inode_of(&metadata) {
                        if !visited_inodes.insert(ino) {
                            continue; // already visited this inode on this walk: cycle
                        }
                    }
                }

                let is_dir = metadata.is_dir();
                if !is_dir && !extension_allowed(entry.path(), &allow) {
                    continue;
                }

                let size = if is_dir { 0 } else { metadata.len() };
                let mtime = metadata
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| {
                        chrono::DateTime::<chrono::Utc>::from_timestamp(
                            d.as_secs() as i64,
                            d.subsec_nanos(),
                        )
                        .unwrap_or_default()
                    })
                    .unwrap_or_default();

                out.push(ScannedFile {
                    path: entry.path().to_path_buf(),
                    size,
                    mtime,
                    is_dir,
                });
            }
        }

        Ok(out)
    }
}

#[cfg(unix)]
fn inode_of(metadata: &std::fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.ino())
}

#[cfg(not(unix))]
fn inode_of(_metadata: &std::fs::Metadata) -> Option<u64> {
    None
}

fn extension_allowed(path: &Path, allow: &[String]) -> bool {
    if allow.is_empty() {
        return true;
    }
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    allow.iter().any(|a| a.trim_start_matches('.') == ext)
}

/// Drives a `FileScanner`, upserting every visit into the repository and
/// optionally pruning stale rows afterward (spec.md §4.3 (c), (d)).
pub struct Scanner {
    strategy: Box<dyn FileScanner>,
    repo: FileRepository,
}

impl Scanner {
    pub fn new(strategy: Box<dyn FileScanner>, repo: FileRepository) -> Self {
        Self { strategy, repo }
    }

    pub fn scan(
        &self,
        roots: &[PathBuf],
        extensions: &[String],
        follow_symlinks: bool,
        prune: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<StoredFile>> {
        let scanned = self
            .strategy
            .walk(roots, extensions, follow_symlinks, cancel)?;

        let mut stored = Vec::with_capacity(scanned.len());
        for file in scanned {
            stored.push(self.repo.upsert(&file)?);
        }

        if prune {
            self.repo.delete_missing(roots)?;
        }

        Ok(stored)
    }
}
