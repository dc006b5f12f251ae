//! Configuration and engine wiring shared by CLI handlers.

use std::path::{Path, PathBuf};

use crate::adapter::inbound::cli::command::DEFAULT_CONFIG_FILE;
use crate::error::Result;
use crate::infrastructure::bootstrap::{self, LedgerEngine};
use crate::infrastructure::config::Config;

/// Global options every handler needs to find its configuration.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub config_path: Option<PathBuf>,
    pub database: Option<PathBuf>,
}

impl Context {
    /// Resolve the effective configuration.
    ///
    /// An explicit `--config` must exist. Without one, `./driftpool.toml` is
    /// used when present and defaults otherwise. `--db` overrides the
    /// configured database.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or fails validation.
    pub fn config(&self) -> Result<Config> {
        let mut config = match self.config_file() {
            Some(path) => Config::load(path)?,
            None => Config::parse_toml("")?,
        };
        if let Some(db) = &self.database {
            config.database = db.to_string_lossy().into_owned();
        }
        Ok(config)
    }

    /// The configuration file that [`Context::config`] reads, if any.
    #[must_use]
    pub fn config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            return Some(path.clone());
        }
        let fallback = Path::new(DEFAULT_CONFIG_FILE);
        fallback.exists().then(|| fallback.to_path_buf())
    }

    /// Load configuration and wire an engine over the SQLite ledger.
    ///
    /// # Errors
    /// Returns an error if configuration is invalid or the ledger cannot be opened.
    pub fn engine(&self) -> Result<LedgerEngine> {
        let config = self.config()?;
        bootstrap::build_engine(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, Error};

    #[test]
    fn explicit_missing_config_is_an_error() {
        let context = Context {
            config_path: Some(PathBuf::from("/nonexistent/driftpool.toml")),
            database: None,
        };
        assert!(matches!(
            context.config(),
            Err(Error::Config(ConfigError::ReadFile(_)))
        ));
    }

    #[test]
    fn database_flag_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("driftpool.toml");
        std::fs::write(&path, "database = \"from-file.db\"\n").unwrap();

        let context = Context {
            config_path: Some(path),
            database: Some(dir.path().join("override.db")),
        };
        let config = context.config().unwrap();
        assert!(config.database.ends_with("override.db"));
    }
}
