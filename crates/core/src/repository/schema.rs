//! Schema creation (spec.md §6): additive-only, `CREATE TABLE IF NOT
//! EXISTS`, one statement per table, the same shape as the teacher's
//! `FileIndexService::init_schema`.

use crate::error::Result;
use rusqlite::Connection;

pub fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            path TEXT UNIQUE NOT NULL,
            size INTEGER NOT NULL,
            mtime INTEGER NOT NULL,
            is_dir INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS hashes (
            file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
            algorithm TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (file_id, algorithm)
        );
        CREATE INDEX IF NOT EXISTS idx_hashes_value ON hashes(algorithm, value);

        CREATE TABLE IF NOT EXISTS phash (
            file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
            algorithm TEXT NOT NULL,
            value_u64 INTEGER NOT NULL,
            PRIMARY KEY (file_id, algorithm)
        );

        CREATE TABLE IF NOT EXISTS tags (
            file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
            label TEXT NOT NULL,
            source TEXT NOT NULL,
            confidence REAL NOT NULL,
            PRIMARY KEY (file_id, label, source)
        );

        CREATE TABLE IF NOT EXISTS duplicate_groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content_hash TEXT NOT NULL,
            size INTEGER NOT NULL,
            primary_file_id INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS duplicate_members (
            group_id INTEGER NOT NULL REFERENCES duplicate_groups(id) ON DELETE CASCADE,
            file_id INTEGER NOT NULL,
            PRIMARY KEY (group_id, file_id)
        );

        CREATE TABLE IF NOT EXISTS operations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            type TEXT NOT NULL,
            source_path TEXT NOT NULL,
            dest_path TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            undone INTEGER NOT NULL DEFAULT 0
        );
        ",
    )?;
    Ok(())
}
