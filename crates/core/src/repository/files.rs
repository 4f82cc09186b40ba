//! `files`, `hashes`, `phash` and `tags` tables (spec.md §4.2). Upsert
//! idiom (`ON CONFLICT(path) DO UPDATE SET`) grounded on the teacher's
//! `FileIndexService::upsert_file`.

use crate::error::{FoError, Result};
use crate::model::{HashRecord, PerceptualAlgorithm, PerceptualHash, ScannedFile, StoredFile, Tag};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct FileRepository {
    conn: Arc<Mutex<Connection>>,
}

impl FileRepository {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn upsert(&self, file: &ScannedFile) -> Result<StoredFile> {
        let conn = self.conn.lock().unwrap();
        let path = file.path.to_string_lossy().to_string();
        conn.execute(
            "INSERT INTO files (path, size, mtime, is_dir) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(path) DO UPDATE SET size = excluded.size, mtime = excluded.mtime, is_dir = excluded.is_dir",
            params![path, file.size as i64, file.mtime.timestamp(), file.is_dir as i64],
        )?;
        let id: i64 = conn.query_row(
            "SELECT id FROM files WHERE path = ?1",
            params![path],
            |row| row.get(0),
        )?;
        Ok(StoredFile {
            id,
            path: file.path.clone(),
            size: file.size,
            mtime: file.mtime,
            is_dir: file.is_dir,
        })
    }

    /// Delete every row whose path is not under one of `roots` (anymore) --
    /// used after an incremental scan with pruning enabled.
    pub fn delete_missing(&self, roots: &[PathBuf]) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id, path FROM files")?;
        let rows: Vec<(i64, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<_, _>>()?;
        drop(stmt);

        for (id, path) in rows {
            let p = Path::new(&path);
            let still_under_root = roots.iter().any(|r| p.starts_with(r));
            if still_under_root && !p.exists() {
                conn.execute("DELETE FROM files WHERE id = ?1", params![id])?;
            } else if !still_under_root {
                continue;
            }
        }
        Ok(())
    }

    pub fn get_by_id(&self, id: i64) -> Result<StoredFile> {
        let conn = self.conn.lock().unwrap();
        row_to_stored(&conn, "id", id)
    }

    pub fn get_by_path(&self, path: &Path) -> Result<Option<StoredFile>> {
        let conn = self.conn.lock().unwrap();
        let path_str = path.to_string_lossy().to_string();
        conn.query_row(
            "SELECT id, path, size, mtime, is_dir FROM files WHERE path = ?1",
            params![path_str],
            map_stored_row,
        )
        .optional()
        .map_err(FoError::from)
    }

    pub fn iterate_all(&self) -> Result<Vec<StoredFile>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, path, size, mtime, is_dir FROM files ORDER BY path")?;
        let rows = stmt
            .query_map([], map_stored_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn add_hash(&self, record: &HashRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO hashes (file_id, algorithm, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(file_id, algorithm) DO UPDATE SET value = excluded.value",
            params![record.file_id, record.algorithm, record.value],
        )?;
        Ok(())
    }

    pub fn get_hash(&self, file_id: i64, algorithm: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT value FROM hashes WHERE file_id = ?1 AND algorithm = ?2",
            params![file_id, algorithm],
            |row| row.get(0),
        )
        .optional()
        .map_err(FoError::from)
    }

    pub fn add_perceptual_hash(&self, hash: &PerceptualHash) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO phash (file_id, algorithm, value_u64) VALUES (?1, ?2, ?3)
             ON CONFLICT(file_id, algorithm) DO UPDATE SET value_u64 = excluded.value_u64",
            params![hash.file_id, hash.algorithm.name(), hash.value as i64],
        )?;
        Ok(())
    }

    /// Every file within `max_distance` Hamming distance of `value` under
    /// `algorithm`, nearest first (spec.md §9: one algorithm per query).
    pub fn find_similar_images(
        &self,
        algorithm: PerceptualAlgorithm,
        value: u64,
        max_distance: u32,
    ) -> Result<Vec<(StoredFile, u32)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT f.id, f.path, f.size, f.mtime, f.is_dir, p.value_u64
             FROM phash p JOIN files f ON f.id = p.file_id
             WHERE p.algorithm = ?1",
        )?;
        let mut matches: Vec<(StoredFile, u32)> = stmt
            .query_map(params![algorithm.name()], |row| {
                let stored = StoredFile {
                    id: row.get(0)?,
                    path: PathBuf::from(row.get::<_, String>(1)?),
                    size: row.get::<_, i64>(2)? as u64,
                    mtime: timestamp_to_utc(row.get(3)?),
                    is_dir: row.get::<_, i64>(4)? != 0,
                };
                let other: i64 = row.get(5)?;
                Ok((stored, other as u64))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .map(|(stored, other)| (stored, crate::hash::perceptual::hamming(value, other)))
            .filter(|(_, distance)| *distance <= max_distance)
            .collect();
        matches.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.path.cmp(&b.0.path)));
        Ok(matches)
    }

    pub fn add_tag(&self, tag: &Tag) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO tags (file_id, label, source, confidence) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(file_id, label, source) DO UPDATE SET confidence = excluded.confidence",
            params![tag.file_id, tag.label, tag.source, tag.confidence],
        )?;
        Ok(())
    }

    pub fn get_tags(&self, file_id: i64) -> Result<Vec<Tag>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT file_id, label, source, confidence FROM tags WHERE file_id = ?1 ORDER BY label",
        )?;
        let rows = stmt
            .query_map(params![file_id], |row| {
                Ok(Tag {
                    file_id: row.get(0)?,
                    label: row.get(1)?,
                    source: row.get(2)?,
                    confidence: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn timestamp_to_utc(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

fn map_stored_row(row: &rusqlite::Row) -> rusqlite::Result<StoredFile> {
    Ok(StoredFile {
        id: row.get(0)?,
        path: PathBuf::from(row.get::<_, String>(1)?),
        size: row.get::<_, i64>(2)? as u64,
        mtime: timestamp_to_utc(row.get(3)?),
        is_dir: row.get::<_, i64>(4)? != 0,
    })
}

fn row_to_stored(conn: &Connection, column: &str, id: i64) -> Result<StoredFile> {
    conn.query_row(
        &format!("SELECT id, path, size, mtime, is_dir FROM files WHERE {column} = ?1"),
        params![id],
        map_stored_row,
    )
    .optional()?
    .ok_or_else(|| FoError::NotFound(format!("file {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Database;

    fn scanned(path: &str, size: u64) -> ScannedFile {
        ScannedFile {
            path: PathBuf::from(path),
            size,
            mtime: Utc.timestamp_opt(1_700_000_000, 0).single().unwrap(),
            is_dir: false,
        }
    }

    #[test]
    fn upsert_is_idempotent_on_path() {
        let db = Database::open_in_memory().unwrap();
        let repo = db.files();
        let a = repo.upsert(&scanned("/a.txt", 10)).unwrap();
        let b = repo.upsert(&scanned("/a.txt", 20)).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(b.size, 20);
        assert_eq!(repo.iterate_all().unwrap().len(), 1);
    }

    #[test]
    fn get_by_path_returns_none_when_absent() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.files().get_by_path(Path::new("/nope")).unwrap().is_none());
    }

    #[test]
    fn tags_round_trip_and_sort_by_label() {
        let db = Database::open_in_memory().unwrap();
        let repo = db.files();
        let f = repo.upsert(&scanned("/pic.jpg", 5)).unwrap();
        repo.add_tag(&Tag {
            file_id: f.id,
            label: "zebra".into(),
            confidence: 0.9,
            source: "classifier".into(),
        })
        .unwrap();
        repo.add_tag(&Tag {
            file_id: f.id,
            label: "apple".into(),
            confidence: 0.8,
            source: "classifier".into(),
        })
        .unwrap();
        let tags = repo.get_tags(f.id).unwrap();
        assert_eq!(tags.iter().map(|t| t.label.as_str()).collect::<Vec<_>>(), vec!["apple", "zebra"]);
    }

    #[test]
    fn find_similar_images_respects_max_distance_and_orders_by_distance() {
        let db = Database::open_in_memory().unwrap();
        let repo = db.files();
        let near = repo.upsert(&scanned("/near.jpg", 1)).unwrap();
        let far = repo.upsert(&scanned("/far.jpg", 1)).unwrap();
        repo.add_perceptual_hash(&PerceptualHash {
            file_id: near.id,
            algorithm: PerceptualAlgorithm::DHash,
            value: 0b0001,
        })
        .unwrap();
        repo.add_perceptual_hash(&PerceptualHash {
            file_id: far.id,
            algorithm: PerceptualAlgorithm::DHash,
            value: 0b1111,
        })
        .unwrap();

        let results = repo
            .find_similar_images(PerceptualAlgorithm::DHash, 0b0000, 1)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.id, near.id);
    }
}
