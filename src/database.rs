use rusqlite::Connection;
use rusqlite_migration::{Migrations, M};
use std::sync::{Mutex, MutexGuard};
use tokio::task;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub struct Database {
    connection: Mutex<Connection>,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, BoxError> {
        let db_path = database_url.strip_prefix("sqlite:").unwrap_or(database_url).to_string();

        // Ensure the data directory exists
        if let Some(parent) = std::path::Path::new(&db_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let connection = task::spawn_blocking(move || -> Result<Connection, BoxError> {
            let conn = Connection::open(&db_path)?;
            // Profile cascades and gender SET NULL depend on this.
            conn.pragma_update(None, "foreign_keys", "ON")?;
            Ok(conn)
        })
        .await??;

        Ok(Database {
            connection: Mutex::new(connection),
        })
    }

    pub async fn migrate(&self) -> Result<(), BoxError> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../migrations/001_initial_schema.sql"
        ))]);

        let mut conn = self.lock()?;
        migrations.to_latest(&mut conn)?;

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), BoxError> {
        let conn = self.lock()?;
        let _result: i32 = conn.query_row("SELECT 1", [], |row| row.get(0))?;
        Ok(())
    }

    /// Locks the shared connection, turning a poisoned mutex into an error.
    pub fn lock(&self) -> Result<MutexGuard<'_, Connection>, BoxError> {
        self.connection
            .lock()
            .map_err(|e| format!("database connection lock poisoned: {}", e).into())
    }
}
