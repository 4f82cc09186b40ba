//! Core data types. Follows the teacher's split of "freshly observed" vs
//! "persisted" value objects (`FileIndexEntry` in
//! `services::file_index`) rather than the single struct with an
//! `id == 0` sentinel REDESIGN FLAG §9 calls out.

use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// A file or directory as freshly observed by the scanner, before it has
/// a row in the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub size: u64,
    pub mtime: DateTime<Utc>,
    pub is_dir: bool,
}

/// A file or directory with a persistent surrogate id, as returned by
/// `FileRepository::upsert` or any lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub id: i64,
    pub path: PathBuf,
    pub size: u64,
    pub mtime: DateTime<Utc>,
    pub is_dir: bool,
}

impl StoredFile {
    pub fn as_scanned(&self) -> ScannedFile {
        ScannedFile {
            path: self.path.clone(),
            size: self.size,
            mtime: self.mtime,
            is_dir: self.is_dir,
        }
    }
}

/// `(file_id, algorithm_name)` is unique; `value` is lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashRecord {
    pub file_id: i64,
    pub algorithm: String,
    pub value: String,
}

/// One of the three fixed perceptual-hash algorithms, stored as a u64 so
/// Hamming-distance queries stay index-friendly (spec.md §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PerceptualAlgorithm {
    AHash,
    DHash,
    PHash,
}

impl PerceptualAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            PerceptualAlgorithm::AHash => "ahash",
            PerceptualAlgorithm::DHash => "dhash",
            PerceptualAlgorithm::PHash => "phash",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "ahash" => Some(PerceptualAlgorithm::AHash),
            "dhash" => Some(PerceptualAlgorithm::DHash),
            "phash" => Some(PerceptualAlgorithm::PHash),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerceptualHash {
    pub file_id: i64,
    pub algorithm: PerceptualAlgorithm,
    pub value: u64,
}

/// `(file_id, label, source)` is unique; last write wins on `confidence`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub file_id: i64,
    pub label: String,
    pub confidence: f64,
    pub source: String,
}

/// A group of files sharing `(size, content_hash)`, `|member_ids| >= 2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub group_id: i64,
    pub content_hash: String,
    pub size: u64,
    pub member_ids: Vec<i64>,
    pub primary_file_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    Move,
    Copy,
    Rename,
    Delete,
}

impl OperationType {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationType::Move => "move",
            OperationType::Copy => "copy",
            OperationType::Rename => "rename",
            OperationType::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "move" => Some(OperationType::Move),
            "copy" => Some(OperationType::Copy),
            "rename" => Some(OperationType::Rename),
            "delete" => Some(OperationType::Delete),
            _ => None,
        }
    }
}

/// Append-only; `undone` transitions false -> true exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub op_type: OperationType,
    pub source_path: String,
    pub dest_path: String,
    pub file_size: u64,
    pub undone: bool,
}

/// Strategy for picking the member of a duplicate group to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeepStrategy {
    #[default]
    Oldest,
    Newest,
    Shortest,
    Longest,
}

impl KeepStrategy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "oldest" => Some(KeepStrategy::Oldest),
            "newest" => Some(KeepStrategy::Newest),
            "shortest" => Some(KeepStrategy::Shortest),
            "longest" => Some(KeepStrategy::Longest),
            _ => None,
        }
    }

    /// Pick the primary among `members`, breaking ties on lexicographically
    /// smallest path. Panics on an empty slice (callers only ever call
    /// this with duplicate-group members, which are never empty).
    pub fn pick_primary(self, members: &[StoredFile]) -> &StoredFile {
        members
            .iter()
            .min_by(|a, b| self.order_key(a).cmp(&self.order_key(b)))
            .expect("duplicate group members must be non-empty")
    }

    fn order_key(self, f: &StoredFile) -> (i64, &str) {
        let primary = match self {
            KeepStrategy::Oldest => f.mtime.timestamp(),
            KeepStrategy::Newest => -f.mtime.timestamp(),
            KeepStrategy::Shortest => f.path.as_os_str().len() as i64,
            KeepStrategy::Longest => -(f.path.as_os_str().len() as i64),
        };
        (primary, f.path.to_str().unwrap_or(""))
    }
}

/// A single rule in a rule set: `predicate` is evaluated first-match-wins,
/// `template` expands to the destination path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    pub predicate: Option<String>,
    pub template: String,
}
