//! Duplicate finder (spec.md §4.6): two-stage bucketing by size then
//! content hash, hashing parallelized per bucket with `rayon` the way
//! `examples/DevsHero-NeuroSiphon` parallelizes its own batch hashing
//! work, re-sorted afterward for deterministic output.

use crate::error::Result;
use crate::hash::content::ContentHasher;
use crate::model::{DuplicateGroup, HashRecord, StoredFile};
use crate::repository::files::FileRepository;
use crate::scanner::CancellationToken;
use rayon::prelude::*;
use std::collections::HashMap;

/// Groups `files` into duplicate sets. Zero-length files only participate
/// when `include_empty` is set (spec.md §9, default: include): an
/// empty-file bucket is otherwise dropped before hashing, since every
/// empty file trivially collides on size and content. Every computed
/// hash is persisted via `repo.add_hash` before a group is built, so a
/// group is never emitted ahead of its members' hashes (spec.md §5(ii)).
pub fn find_duplicates(
    files: &[StoredFile],
    hasher: &dyn ContentHasher,
    repo: &FileRepository,
    include_empty: bool,
    cancel: &CancellationToken,
) -> Result<Vec<DuplicateGroup>> {
    let mut by_size: HashMap<u64, Vec<&StoredFile>> = HashMap::new();
    for file in files {
        if file.is_dir {
            continue;
        }
        if file.size == 0 && !include_empty {
            continue;
        }
        by_size.entry(file.size).or_default().push(file);
    }
    by_size.retain(|_, members| members.len() >= 2);

    if cancel.is_cancelled() {
        return Err(crate::error::FoError::Cancelled);
    }

    let buckets: Vec<(u64, Vec<&StoredFile>)> = by_size.into_iter().collect();
    let hashed: Vec<Result<Vec<(u64, String, i64)>>> = buckets
        .into_par_iter()
        .map(|(size, members)| {
            let mut rows = Vec::with_capacity(members.len());
            for file in members {
                if cancel.is_cancelled() {
                    return Err(crate::error::FoError::Cancelled);
                }
                let value = hasher.fast64(&file.path)?;
                if file.id != 0 {
                    repo.add_hash(&HashRecord {
                        file_id: file.id,
                        algorithm: hasher.name().to_string(),
                        value: value.clone(),
                    })?;
                }
                rows.push((size, value, file.id));
            }
            Ok(rows)
        })
        .collect();

    let mut by_hash: HashMap<(u64, String), Vec<i64>> = HashMap::new();
    for result in hashed {
        for (size, value, id) in result? {
            by_hash.entry((size, value)).or_default().push(id);
        }
    }

    let mut groups: Vec<DuplicateGroup> = by_hash
        .into_iter()
        .filter(|(_, ids)| ids.len() >= 2)
        .map(|((size, content_hash), mut member_ids)| {
            member_ids.sort_unstable();
            let primary_file_id = pick_primary(files, &member_ids);
            DuplicateGroup {
                group_id: 0,
                content_hash,
                size,
                member_ids,
                primary_file_id,
            }
        })
        .collect();

    groups.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.content_hash.cmp(&b.content_hash)));
    for (idx, group) in groups.iter_mut().enumerate() {
        group.group_id = idx as i64 + 1;
    }

    Ok(groups)
}

fn pick_primary(files: &[StoredFile], member_ids: &[i64]) -> i64 {
    let members: Vec<StoredFile> = files
        .iter()
        .filter(|f| member_ids.contains(&f.id))
        .cloned()
        .collect();
    crate::model::KeepStrategy::default().pick_primary(&members).id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::content::Fast64Hasher;
    use crate::model::ScannedFile;
    use crate::repository::Database;
    use chrono::Utc;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn register(repo: &FileRepository, path: &std::path::Path, size: u64) -> StoredFile {
        repo.upsert(&ScannedFile {
            path: path.to_path_buf(),
            size,
            mtime: Utc::now(),
            is_dir: false,
        })
        .unwrap()
    }

    #[test]
    fn finds_one_group_from_three_equal_files() {
        let db = Database::open_in_memory().unwrap();
        let repo = db.files();
        let mut temps = Vec::new();
        for _ in 0..3 {
            let mut f = NamedTempFile::new().unwrap();
            f.write_all(b"same content").unwrap();
            temps.push(f);
        }
        let files: Vec<StoredFile> = temps.iter().map(|f| register(&repo, f.path(), 12)).collect();

        let groups =
            find_duplicates(&files, &Fast64Hasher, &repo, false, &CancellationToken::new()).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].member_ids.len(), 3);
        for f in &files {
            assert_eq!(repo.get_hash(f.id, "fast64").unwrap().unwrap().len(), 16);
        }
    }

    #[test]
    fn differing_content_same_size_does_not_group() {
        let db = Database::open_in_memory().unwrap();
        let repo = db.files();
        let mut a = NamedTempFile::new().unwrap();
        a.write_all(b"aaaaaaaaaa").unwrap();
        let mut b = NamedTempFile::new().unwrap();
        b.write_all(b"bbbbbbbbbb").unwrap();
        let files = vec![register(&repo, a.path(), 10), register(&repo, b.path(), 10)];
        let groups =
            find_duplicates(&files, &Fast64Hasher, &repo, false, &CancellationToken::new()).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn empty_files_excluded_unless_include_empty() {
        let db = Database::open_in_memory().unwrap();
        let repo = db.files();
        let a = NamedTempFile::new().unwrap();
        let b = NamedTempFile::new().unwrap();
        let files = vec![register(&repo, a.path(), 0), register(&repo, b.path(), 0)];
        let excluded =
            find_duplicates(&files, &Fast64Hasher, &repo, false, &CancellationToken::new()).unwrap();
        assert!(excluded.is_empty());
        let included =
            find_duplicates(&files, &Fast64Hasher, &repo, true, &CancellationToken::new()).unwrap();
        assert_eq!(included.len(), 1);
    }
}
