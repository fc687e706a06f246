//! Catalog connection management
//!
//! The device catalog is a single SQLite file. A [`CatalogStore`] opens it
//! through a one-connection pool and begins a transaction right away; every
//! query runs inside that transaction until [`CatalogStore::disconnect`]
//! commits it or [`CatalogStore::abort`] rolls it back.

use kobosync_core::AppError;
use log::{debug, info, warn};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqliteConnection, Transaction};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Database connection pool
pub type DbPool = Pool<Sqlite>;

/// Catalog database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: PathBuf,
    /// Create the database if it doesn't exist (tests only; the device owns the real file)
    pub create_if_missing: bool,
    /// How long to wait on a locked database before failing
    pub busy_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("KoboReader.sqlite"),
            create_if_missing: false,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl DatabaseConfig {
    /// Creates a new configuration with a custom path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Sets whether to create the database if missing
    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

/// Opens a single-connection pool on the catalog file
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, AppError> {
    let options = SqliteConnectOptions::new()
        .filename(&config.path)
        .create_if_missing(config.create_if_missing)
        .busy_timeout(config.busy_timeout);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|e| {
            AppError::database(
                format!("Failed to open catalog {}", config.path.display()),
                e,
            )
        })
}

/// Checks if the database file exists
pub fn database_exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().exists()
}

struct Session {
    pool: DbPool,
    tx: Transaction<'static, Sqlite>,
}

/// Exclusive handle on the device catalog
///
/// Query functions in [`crate::queries`] take the connection returned by
/// [`CatalogStore::connection`], which fails with `NotConnected` outside a
/// `connect`/`disconnect` pair.
pub struct CatalogStore {
    config: DatabaseConfig,
    session: Option<Session>,
}

impl CatalogStore {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Opens the catalog and begins the session transaction
    pub async fn connect(&mut self) -> Result<(), AppError> {
        if self.session.is_some() {
            warn!("Catalog {} is already connected", self.config.path.display());
            return Ok(());
        }

        let pool = connect(&self.config).await?;
        let tx = pool
            .begin()
            .await
            .map_err(|e| AppError::database("Failed to begin catalog transaction", e))?;

        info!("Connected to catalog {}", self.config.path.display());
        self.session = Some(Session { pool, tx });
        Ok(())
    }

    /// Returns the connection of the open session
    pub fn connection(&mut self) -> Result<&mut SqliteConnection, AppError> {
        match self.session.as_mut() {
            Some(session) => Ok(&mut *session.tx),
            None => Err(AppError::NotConnected),
        }
    }

    /// Commits every change made since `connect` and closes the catalog
    pub async fn disconnect(&mut self) -> Result<(), AppError> {
        let Session { pool, tx } = self.session.take().ok_or(AppError::NotConnected)?;

        let committed = tx
            .commit()
            .await
            .map_err(|e| AppError::database("Failed to commit catalog changes", e));
        pool.close().await;
        committed?;

        info!("Catalog changes committed");
        Ok(())
    }

    /// Discards every change made since `connect` and closes the catalog
    pub async fn abort(&mut self) -> Result<(), AppError> {
        let Session { pool, tx } = self.session.take().ok_or(AppError::NotConnected)?;

        let rolled_back = tx
            .rollback()
            .await
            .map_err(|e| AppError::database("Failed to roll back catalog changes", e));
        pool.close().await;
        rolled_back?;

        debug!("Catalog changes rolled back");
        Ok(())
    }
}
