//! Application state shared by every request handler.
//!
//! Built once at startup and passed around behind an `Arc`. Holds the
//! storage backend, the optional external doctor source and the in-memory
//! reminder registry. Nothing in here is a global.

use std::sync::Arc;

use rusqlite::Connection;
use thiserror::Error;

use crate::config::AppConfig;
use crate::db::DatabaseError;
use crate::doctors::MockRegistry;
use crate::ledger::ReminderRegistry;
use crate::store::{DoctorDirectory, DoseStore, ExternalDoctorSource, SqliteStore};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    store: Arc<SqliteStore>,
    external: Option<Arc<dyn ExternalDoctorSource>>,
    /// Per-user reminder timers for the day currently on screen.
    pub reminders: ReminderRegistry,
    pub config: AppConfig,
}

impl CoreState {
    pub fn new(
        store: SqliteStore,
        external: Option<Arc<dyn ExternalDoctorSource>>,
        config: AppConfig,
    ) -> Self {
        Self {
            store: Arc::new(store),
            external,
            reminders: ReminderRegistry::new(),
            config,
        }
    }

    /// Open the configured database and wire the external source.
    pub fn open(config: AppConfig) -> Result<Self, CoreError> {
        let store = SqliteStore::open(&config.database_path)?;
        tracing::info!(path = %config.database_path.display(), "Database opened");
        let external = external_source(&config);
        Ok(Self::new(store, external, config))
    }

    /// Fresh in-memory database with default settings.
    pub fn in_memory() -> Result<Self, CoreError> {
        let config = AppConfig::default();
        let external = external_source(&config);
        Ok(Self::new(SqliteStore::in_memory()?, external, config))
    }

    pub fn dose_store(&self) -> Arc<dyn DoseStore> {
        self.store.clone()
    }

    pub fn directory(&self) -> &dyn DoctorDirectory {
        self.store.as_ref()
    }

    pub fn external(&self) -> Option<&dyn ExternalDoctorSource> {
        self.external.as_deref()
    }

    /// Run `f` on the shared connection.
    pub fn with_conn<T, E>(&self, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<DatabaseError>,
    {
        self.store.with_conn(f)
    }
}

fn external_source(config: &AppConfig) -> Option<Arc<dyn ExternalDoctorSource>> {
    if config.external_directory {
        Some(Arc::new(MockRegistry::new()))
    } else {
        tracing::info!("External doctor directory disabled");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn in_memory_state_has_schema_and_registry() {
        let core = CoreState::in_memory().unwrap();
        let tables = core.with_conn(db::count_tables).unwrap();
        assert_eq!(tables, 6);
        assert_eq!(core.external().map(|s| s.name()), Some("registry"));
    }

    #[test]
    fn external_source_follows_config() {
        let config = AppConfig {
            external_directory: false,
            ..AppConfig::default()
        };
        let core = CoreState::new(SqliteStore::in_memory().unwrap(), external_source(&config), config);
        assert!(core.external().is_none());
    }

    #[test]
    fn with_conn_passes_service_errors_through() {
        let core = CoreState::in_memory().unwrap();
        let result: Result<(), crate::medications::MedicationError> =
            core.with_conn(|_| Err(crate::medications::MedicationError::NotFound(uuid::Uuid::nil())));
        assert!(matches!(result, Err(crate::medications::MedicationError::NotFound(_))));
    }

    #[test]
    fn file_backed_state_opens_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            database_path: dir.path().join("dosewise.db"),
            ..AppConfig::default()
        };
        let core = CoreState::open(config).unwrap();
        assert!(core.config.database_path.exists());
    }
}
