use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use libsql::{Builder, Connection, Database};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tracing::{debug, info, warn};

/// String key/value persistence used by the theme store.
#[async_trait]
pub trait PreferenceStorage: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>>;
    async fn save(&self, key: &str, value: &str) -> Result<()>;
}

struct SqliteHandle {
    // Keeps the database alive for the lifetime of the connection.
    _db: Database,
    conn: Connection,
}

pub struct SqlitePreferenceStorage {
    handle: Option<SqliteHandle>,
    // In-memory fallback storage
    fallback: Arc<Mutex<HashMap<String, String>>>,
}

impl SqlitePreferenceStorage {
    pub async fn new(db_path: &str) -> Result<Self> {
        let mut storage = Self {
            handle: None,
            fallback: Arc::new(Mutex::new(HashMap::new())),
        };

        match storage.init_database(db_path).await {
            Ok(()) => {
                info!("Preference database initialized: {}", db_path);
            }
            Err(e) => {
                warn!(
                    "Preference database initialization failed, using in-memory fallback: {}",
                    e
                );
            }
        }

        Ok(storage)
    }

    pub fn is_persistent(&self) -> bool {
        self.handle.is_some()
    }

    async fn init_database(&mut self, db_path: &str) -> Result<()> {
        let db = Builder::new_local(db_path).build().await?;
        let conn = db.connect()?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME NOT NULL
            )
            "#,
            (),
        )
        .await?;

        self.handle = Some(SqliteHandle { _db: db, conn });
        Ok(())
    }

    async fn load_from_db(&self, conn: &Connection, key: &str) -> Result<Option<String>> {
        let mut rows = conn
            .query("SELECT value FROM preferences WHERE key = ?", [key])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    async fn save_to_db(&self, conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO preferences (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            (key, value, Utc::now().to_rfc3339()),
        )
        .await?;
        Ok(())
    }

    fn fallback(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.fallback
            .lock()
            .map_err(|e| Error::internal(format!("Mutex lock failed: {e}")))
    }
}

#[async_trait]
impl PreferenceStorage for SqlitePreferenceStorage {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        if let Some(ref handle) = self.handle {
            match self.load_from_db(&handle.conn, key).await {
                Ok(value) => {
                    debug!("Loaded preference '{}' from database", key);
                    return Ok(value);
                }
                Err(e) => {
                    warn!("Failed to read preference from database, using fallback: {}", e);
                }
            }
        }

        Ok(self.fallback()?.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> Result<()> {
        if let Some(ref handle) = self.handle {
            match self.save_to_db(&handle.conn, key, value).await {
                Ok(()) => {
                    debug!("Saved preference '{}' to database", key);
                    return Ok(());
                }
                Err(e) => {
                    warn!("Failed to save preference to database, using fallback: {}", e);
                }
            }
        }

        self.fallback()?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
