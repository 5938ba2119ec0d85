use crate::config::DatabaseConfig;
use crate::db::{DatabaseError, SightingStore};
use std::sync::Arc;

#[cfg(feature = "sqlite")]
use crate::db::sqlite::{SharedConnection, SqliteSightingStore, establish_connection};
#[cfg(feature = "sqlite")]
use diesel::RunQueryDsl;
#[cfg(feature = "sqlite")]
use parking_lot::Mutex;
use tracing::info;

#[derive(Clone)]
pub struct DatabaseManager {
    #[cfg(feature = "sqlite")]
    connection: SharedConnection,
    sqlite_path: String,
    sighting_store: Arc<dyn SightingStore>,
}

impl DatabaseManager {
    #[cfg(feature = "sqlite")]
    pub async fn new(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let path = config.sqlite_path().ok_or_else(|| {
            DatabaseError::Connection(format!(
                "unsupported database url: {}",
                config.connection_string()
            ))
        })?;

        let open_path = path.clone();
        let busy_timeout_ms = config.busy_timeout_ms;
        let conn = tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&open_path)?;
            diesel::sql_query(format!("PRAGMA busy_timeout = {}", busy_timeout_ms))
                .execute(&mut conn)
                .map_err(|e| DatabaseError::Connection(e.to_string()))?;
            Ok::<_, DatabaseError>(conn)
        })
        .await
        .map_err(|e| DatabaseError::Task(e.to_string()))??;

        info!("opened url history database at {}", path);

        let connection: SharedConnection = Arc::new(Mutex::new(Some(conn)));
        let sighting_store = Arc::new(SqliteSightingStore::new(connection.clone()));

        Ok(Self {
            connection,
            sqlite_path: path,
            sighting_store,
        })
    }

    #[cfg(not(feature = "sqlite"))]
    pub async fn new(_config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        Err(DatabaseError::Connection(
            "SQLite feature not enabled".to_string(),
        ))
    }

    #[cfg(feature = "sqlite")]
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        let connection = self.connection.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = connection.lock();
            let conn = guard.as_mut().ok_or(DatabaseError::Closed)?;

            let statements = [
                r#"
                CREATE TABLE IF NOT EXISTS seen (
                    id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
                    url TEXT NOT NULL,
                    nick TEXT,
                    src TEXT NOT NULL,
                    dst TEXT NOT NULL,
                    timestamp DATETIME NOT NULL
                )
                "#,
                "CREATE INDEX IF NOT EXISTS url_idx ON seen (url, dst)",
            ];

            for statement in statements {
                diesel::sql_query(statement)
                    .execute(conn)
                    .map_err(|e| DatabaseError::Migration(e.to_string()))?;
            }

            Ok(())
        })
        .await
        .map_err(|e| DatabaseError::Migration(format!("migration task failed: {e}")))?
    }

    #[cfg(not(feature = "sqlite"))]
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        Err(DatabaseError::Migration(
            "SQLite feature not enabled".to_string(),
        ))
    }

    /// Drops the shared handle. Later store calls fail with `DatabaseError::Closed`.
    pub fn close(&self) {
        #[cfg(feature = "sqlite")]
        {
            if self.connection.lock().take().is_some() {
                info!("closed url history database at {}", self.sqlite_path);
            }
        }
    }

    pub fn sighting_store(&self) -> Arc<dyn SightingStore> {
        self.sighting_store.clone()
    }

    pub fn path(&self) -> &str {
        &self.sqlite_path
    }
}
