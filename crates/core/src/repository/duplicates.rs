//! `duplicate_groups` / `duplicate_members` tables (spec.md §4.2, §4.6).

use crate::error::Result;
use crate::model::DuplicateGroup;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct DuplicateRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DuplicateRepository {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Replace the stored duplicate set with `groups`, emitted by the
    /// duplicate finder.
    pub fn replace_all(&self, groups: &[DuplicateGroup]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM duplicate_members", [])?;
        tx.execute("DELETE FROM duplicate_groups", [])?;
        for group in groups {
            tx.execute(
                "INSERT INTO duplicate_groups (id, content_hash, size, primary_file_id) VALUES (?1, ?2, ?3, ?4)",
                params![group.group_id, group.content_hash, group.size as i64, group.primary_file_id],
            )?;
            for member_id in &group.member_ids {
                tx.execute(
                    "INSERT INTO duplicate_members (group_id, file_id) VALUES (?1, ?2)",
                    params![group.group_id, member_id],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn list_all(&self) -> Result<Vec<DuplicateGroup>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, content_hash, size, primary_file_id FROM duplicate_groups ORDER BY size DESC, content_hash",
        )?;
        let groups: Vec<(i64, String, u64, i64)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get::<_, i64>(2)? as u64,
                    row.get(3)?,
                ))
            })?
            .collect::<std::result::Result<_, _>>()?;
        drop(stmt);

        let mut out = Vec::with_capacity(groups.len());
        for (group_id, content_hash, size, primary_file_id) in groups {
            let mut member_stmt = conn
                .prepare("SELECT file_id FROM duplicate_members WHERE group_id = ?1 ORDER BY file_id")?;
            let member_ids = member_stmt
                .query_map(params![group_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<i64>, _>>()?;
            out.push(DuplicateGroup {
                group_id,
                content_hash,
                size,
                member_ids,
                primary_file_id,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Database;

    fn sample() -> DuplicateGroup {
        DuplicateGroup {
            group_id: 1,
            content_hash: "abc123".into(),
            size: 42,
            member_ids: vec![1, 2, 3],
            primary_file_id: 1,
        }
    }

    #[test]
    fn replace_all_then_list_round_trips() {
        let db = Database::open_in_memory().unwrap();
        let repo = db.duplicates();
        repo.replace_all(&[sample()]).unwrap();
        let groups = repo.list_all().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].member_ids, vec![1, 2, 3]);
    }

    #[test]
    fn replace_all_clears_previous_set() {
        let db = Database::open_in_memory().unwrap();
        let repo = db.duplicates();
        repo.replace_all(&[sample()]).unwrap();
        repo.replace_all(&[]).unwrap();
        assert!(repo.list_all().unwrap().is_empty());
    }
}
