//! Engine facade (spec.md §4.9): resolves named providers via the
//! registry at construction time and wires scanner, hasher, and
//! repositories behind one entry point, mirroring the teacher's
//! `FileIndexService::new` single-entry-point shape.

use crate::dedup;
use crate::error::Result;
use crate::hash::content::ContentHasher;
use crate::model::{DuplicateGroup, StoredFile};
use crate::providers::Providers;
use crate::repository::duplicates::DuplicateRepository;
use crate::repository::files::FileRepository;
use crate::repository::Database;
use crate::scanner::{CancellationToken, Scanner};
use crate::config::EngineConfig;
use std::path::PathBuf;

pub struct Engine {
    config: EngineConfig,
    database: Database,
    hasher: Box<dyn ContentHasher>,
}

impl Engine {
    /// Resolve `config.scanner_name`/`config.hasher_name` against
    /// `providers` and open (or create) the database at `config.db_path`.
    /// Fails with `NotFound` if a named provider is absent (spec.md §7).
    pub fn new(config: EngineConfig, providers: &Providers) -> Result<Self> {
        let hasher = providers.hashers.require(&config.hasher_name)?;
        // Resolved eagerly to honor construction-time failure even though
        // `scan` re-resolves per call (a fresh `FileScanner` instance each
        // scan keeps any internal walker state un-shared across calls).
        providers.scanners.require(&config.scanner_name)?;
        let database = Database::open(&config.db_path)?;
        Ok(Self {
            config,
            database,
            hasher,
        })
    }

    pub fn scan(
        &self,
        roots: &[PathBuf],
        extensions: &[String],
        follow_symlinks: bool,
        prune: bool,
        providers: &Providers,
        cancel: &CancellationToken,
    ) -> Result<Vec<StoredFile>> {
        let strategy = providers.scanners.require(&self.config.scanner_name)?;
        let scanner = Scanner::new(strategy, self.file_repository());
        scanner.scan(roots, extensions, follow_symlinks, prune, cancel)
    }

    pub fn find_duplicates(
        &self,
        files: &[StoredFile],
        include_empty: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<DuplicateGroup>> {
        let groups = dedup::find_duplicates(
            files,
            self.hasher.as_ref(),
            &self.file_repository(),
            include_empty,
            cancel,
        )?;
        self.duplicate_repository().replace_all(&groups)?;
        Ok(groups)
    }

    pub fn hasher(&self) -> &dyn ContentHasher {
        self.hasher.as_ref()
    }

    pub fn file_repository(&self) -> FileRepository {
        self.database.files()
    }

    pub fn duplicate_repository(&self) -> DuplicateRepository {
        self.database.duplicates()
    }

    pub fn operation_repository(&self) -> crate::repository::operations::OperationRepository {
        self.database.operations()
    }

    pub fn database(&self) -> &Database {
        &self.database
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::bootstrap;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn new_fails_with_not_found_for_unknown_provider() {
        let providers = bootstrap();
        let dir = tempdir().unwrap();
        let config = EngineConfig {
            scanner_name: "nope".into(),
            hasher_name: "fast64".into(),
            db_path: dir.path().join("fo.db"),
            use_ads_cache: false,
        };
        let result = Engine::new(config, &providers);
        assert!(matches!(result, Err(crate::error::FoError::NotFound(_))));
    }

    #[test]
    fn scan_persists_files_and_find_duplicates_persists_groups() {
        let providers = bootstrap();
        let dir = tempdir().unwrap();
        let config = EngineConfig {
            db_path: dir.path().join("fo.db"),
            ..Default::default()
        };
        let engine = Engine::new(config, &providers).unwrap();

        let mut a = std::fs::File::create(dir.path().join("a.txt")).unwrap();
        a.write_all(b"same").unwrap();
        let mut b = std::fs::File::create(dir.path().join("b.txt")).unwrap();
        b.write_all(b"same").unwrap();

        let cancel = CancellationToken::new();
        let files = engine
            .scan(&[dir.path().to_path_buf()], &[], false, false, &providers, &cancel)
            .unwrap();
        assert!(files.iter().any(|f| f.path.ends_with("a.txt")));

        let groups = engine.find_duplicates(&files, false, &cancel).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(engine.duplicate_repository().list_all().unwrap().len(), 1);
    }
}
