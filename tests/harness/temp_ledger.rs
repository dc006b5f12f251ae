//! SQLite ledger in a temporary directory.

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use driftpool::adapter::outbound::sqlite::SqliteLedger;
use driftpool::application::EngineSettings;
use driftpool::testkit::engine::TestEngine;

/// A file-backed ledger that is removed when dropped.
pub struct TempLedger {
    dir: TempDir,
}

impl TempLedger {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join("ledger.db")
    }

    /// Open (or reopen) the ledger file.
    pub fn open(&self) -> Arc<SqliteLedger> {
        let url = self.path().to_string_lossy().into_owned();
        Arc::new(SqliteLedger::open(&url, 4).expect("open ledger"))
    }

    /// Test engine over a fresh connection pool to this file.
    pub fn engine(&self) -> TestEngine<SqliteLedger> {
        TestEngine::build(self.open(), None, EngineSettings::default())
    }
}
