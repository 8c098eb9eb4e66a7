use crate::database::{BoxError, Database};
use crate::genders::models::Gender;
use rusqlite::OptionalExtension;
use std::sync::Arc;

pub struct GenderRepository {
    db: Arc<Database>,
}

impl GenderRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<Gender>, BoxError> {
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> Result<Vec<Gender>, BoxError> {
            let conn = db.lock()?;
            let mut stmt = conn.prepare("SELECT id, name FROM genders ORDER BY id")?;
            let genders = stmt
                .query_map([], |row| {
                    Ok(Gender {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(genders)
        })
        .await?
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Gender>, BoxError> {
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> Result<Option<Gender>, BoxError> {
            let conn = db.lock()?;
            let gender = conn
                .query_row("SELECT id, name FROM genders WHERE id = ?1", [id], |row| {
                    Ok(Gender {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })
                .optional()?;
            Ok(gender)
        })
        .await?
    }

    pub async fn create(&self, name: String) -> Result<Gender, BoxError> {
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> Result<Gender, BoxError> {
            let conn = db.lock()?;
            conn.execute("INSERT INTO genders (name) VALUES (?1)", [&name])?;
            Ok(Gender {
                id: conn.last_insert_rowid(),
                name,
            })
        })
        .await?
    }

    pub async fn update(&self, id: i64, name: String) -> Result<bool, BoxError> {
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> Result<bool, BoxError> {
            let conn = db.lock()?;
            let updated = conn.execute(
                "UPDATE genders SET name = ?1 WHERE id = ?2",
                rusqlite::params![&name, id],
            )?;
            Ok(updated > 0)
        })
        .await?
    }

    /// Deletes the gender. Profiles that referenced it fall back to no
    /// gender through `ON DELETE SET NULL`.
    pub async fn delete(&self, id: i64) -> Result<bool, BoxError> {
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> Result<bool, BoxError> {
            let conn = db.lock()?;
            let deleted = conn.execute("DELETE FROM genders WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
        .await?
    }
}
