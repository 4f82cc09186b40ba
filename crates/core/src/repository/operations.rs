//! `operations` table (spec.md §4.8): append-only journal plus atomic
//! `undo_last`, grounded on the teacher's transactional
//! select-then-update pattern in `services::file_index`.

use crate::error::{FoError, Result};
use crate::model::{OperationRecord, OperationType};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct OperationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OperationRepository {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn append(
        &self,
        op_type: OperationType,
        source_path: &str,
        dest_path: &str,
        file_size: u64,
        timestamp: DateTime<Utc>,
    ) -> Result<OperationRecord> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO operations (timestamp, type, source_path, dest_path, file_size, undone)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            params![
                timestamp.timestamp(),
                op_type.as_str(),
                source_path,
                dest_path,
                file_size as i64,
            ],
        )?;
        let id = conn.last_insert_rowid();
        Ok(OperationRecord {
            id,
            timestamp,
            op_type,
            source_path: source_path.to_string(),
            dest_path: dest_path.to_string(),
            file_size,
            undone: false,
        })
    }

    pub fn history(&self, limit: Option<u32>) -> Result<Vec<OperationRecord>> {
        let conn = self.conn.lock().unwrap();
        let sql = match limit {
            Some(_) => {
                "SELECT id, timestamp, type, source_path, dest_path, file_size, undone
                 FROM operations ORDER BY id DESC LIMIT ?1"
            }
            None => {
                "SELECT id, timestamp, type, source_path, dest_path, file_size, undone
                 FROM operations ORDER BY id DESC"
            }
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = if let Some(limit) = limit {
            stmt.query_map(params![limit], map_operation_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        } else {
            stmt.query_map([], map_operation_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        };
        Ok(rows)
    }

    /// Mark the most recent not-yet-undone record as undone and return it,
    /// atomically, regardless of its type (spec.md §4.2/§4.8). `Delete`
    /// records are unrecoverable: this marks them undone with no action on
    /// disk, and the caller interprets the returned `Delete` record as a
    /// flag that nothing could be restored.
    pub fn undo_last(&self) -> Result<Option<OperationRecord>> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let candidate = tx
            .query_row(
                "SELECT id, timestamp, type, source_path, dest_path, file_size, undone
                 FROM operations
                 WHERE undone = 0
                 ORDER BY id DESC LIMIT 1",
                [],
                map_operation_row,
            )
            .optional()?;

        let Some(record) = candidate else {
            tx.commit()?;
            return Ok(None);
        };

        let updated = tx.execute(
            "UPDATE operations SET undone = 1 WHERE id = ?1 AND undone = 0",
            params![record.id],
        )?;
        if updated == 0 {
            return Err(FoError::InvalidInput(
                "operation already undone by a concurrent caller".into(),
            ));
        }
        tx.commit()?;
        Ok(Some(OperationRecord {
            undone: true,
            ..record
        }))
    }
}

fn map_operation_row(row: &rusqlite::Row) -> rusqlite::Result<OperationRecord> {
    let op_type_str: String = row.get(2)?;
    let op_type = OperationType::parse(&op_type_str).unwrap_or(OperationType::Move);
    Ok(OperationRecord {
        id: row.get(0)?,
        timestamp: Utc
            .timestamp_opt(row.get(1)?, 0)
            .single()
            .unwrap_or_default(),
        op_type,
        source_path: row.get(3)?,
        dest_path: row.get(4)?,
        file_size: row.get::<_, i64>(5)? as u64,
        undone: row.get::<_, i64>(6)? != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Database;

    #[test]
    fn undo_last_marks_the_most_recent_move_undone() {
        let db = Database::open_in_memory().unwrap();
        let repo = db.operations();
        let now = Utc::now();
        repo.append(OperationType::Move, "/a", "/b", 1, now).unwrap();
        let second = repo.append(OperationType::Rename, "/b", "/c", 1, now).unwrap();

        let undone = repo.undo_last().unwrap().unwrap();
        assert_eq!(undone.id, second.id);
        assert!(undone.undone);

        let history = repo.history(None).unwrap();
        assert!(history[0].undone);
        assert!(!history[1].undone);
    }

    #[test]
    fn undo_last_marks_delete_as_unrecoverable_without_skipping_it() {
        let db = Database::open_in_memory().unwrap();
        let repo = db.operations();
        let now = Utc::now();
        repo.append(OperationType::Move, "/a", "/b", 1, now).unwrap();
        let delete = repo.append(OperationType::Delete, "/b", "", 1, now).unwrap();

        let first = repo.undo_last().unwrap().unwrap();
        assert_eq!(first.id, delete.id);
        assert_eq!(first.op_type, OperationType::Delete);
        assert!(first.undone);

        let second = repo.undo_last().unwrap().unwrap();
        assert_eq!(second.op_type, OperationType::Move);
    }

    #[test]
    fn undo_last_returns_none_when_nothing_to_undo() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.operations().undo_last().unwrap().is_none());
    }

    #[test]
    fn history_respects_limit() {
        let db = Database::open_in_memory().unwrap();
        let repo = db.operations();
        let now = Utc::now();
        for i in 0..5 {
            repo.append(OperationType::Move, &format!("/a{i}"), &format!("/b{i}"), 1, now)
                .unwrap();
        }
        assert_eq!(repo.history(Some(2)).unwrap().len(), 2);
    }
}
