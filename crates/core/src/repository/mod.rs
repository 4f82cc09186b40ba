//! Persistence layer (spec.md §4.2 / §6): one `rusqlite` connection behind
//! a shared `Arc<Mutex<_>>`, split into typed sub-repositories the way the
//! teacher splits `FileIndexService`'s tables across query groups. Every
//! sub-repository is a thin, cheaply `Clone`-able handle onto the same
//! connection so `Scanner`, `Engine` and friends can each own one without
//! threading a lifetime through the whole crate.

mod schema;

pub mod duplicates;
pub mod files;
pub mod operations;

use crate::error::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Shared handle onto the database, opened once and cloned into each
/// sub-repository.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        schema::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn files(&self) -> files::FileRepository {
        files::FileRepository::new(self.conn.clone())
    }

    pub fn duplicates(&self) -> duplicates::DuplicateRepository {
        duplicates::DuplicateRepository::new(self.conn.clone())
    }

    pub fn operations(&self) -> operations::OperationRepository {
        operations::OperationRepository::new(self.conn.clone())
    }
}
