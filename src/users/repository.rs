use crate::database::{BoxError, Database};
use crate::users::auth::hash_password;
use crate::users::models::{AccountFields, NewUser, Profile, User, UserDetails};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{OptionalExtension, Row};
use std::sync::Arc;

const USER_COLUMNS: &str =
    "u.id, u.username, u.first_name, u.last_name, u.email, u.password_hash, u.is_superuser, u.last_login, u.date_joined";

const DETAIL_COLUMNS: &str = "u.id, u.username, u.first_name, u.last_name, u.email, u.password_hash, u.is_superuser, u.last_login, u.date_joined,
     p.gender_id, p.address, p.date_of_birth, p.phone_number, g.name";

const DETAIL_JOINS: &str = "FROM users u
     LEFT JOIN profiles p ON p.user_id = u.id
     LEFT JOIN genders g ON g.id = p.gender_id";

/// Case-insensitive substring filter over username, first name, last name and email.
const SEARCH_FILTER: &str = "(?1 = '' OR u.username LIKE ?2 ESCAPE '\\' OR u.first_name LIKE ?2 ESCAPE '\\'
     OR u.last_name LIKE ?2 ESCAPE '\\' OR u.email LIKE ?2 ESCAPE '\\')";

pub struct UserRepository {
    db: Arc<Database>,
}

impl UserRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Creates the user and its profile in one transaction.
    pub async fn create_user(&self, new_user: NewUser) -> Result<User, BoxError> {
        let password_hash = hash_password(&new_user.password)?;
        let db = self.db.clone();

        let user_id = tokio::task::spawn_blocking(move || -> Result<i64, BoxError> {
            let mut conn = db.lock()?;
            let tx = conn.transaction()?;

            let account = &new_user.account;
            tx.execute(
                "INSERT INTO users (username, first_name, last_name, email, password_hash, is_superuser)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    &account.username,
                    &account.first_name,
                    &account.last_name,
                    &account.email,
                    &password_hash,
                    new_user.is_superuser
                ],
            )?;
            let user_id = tx.last_insert_rowid();

            let profile = &new_user.profile;
            tx.execute(
                "INSERT INTO profiles (user_id, gender_id, address, date_of_birth, phone_number)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    user_id,
                    profile.gender_id,
                    &profile.address,
                    profile.date_of_birth.map(format_date),
                    profile.phone_number
                ],
            )?;

            tx.commit()?;
            Ok(user_id)
        })
        .await??;

        self.find_by_id(user_id)
            .await?
            .ok_or_else(|| "Created user disappeared".into())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, BoxError> {
        self.find_one(format!("SELECT {} FROM users u WHERE u.id = ?1", USER_COLUMNS), id)
            .await
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, BoxError> {
        self.find_one(
            format!("SELECT {} FROM users u WHERE u.username = ?1", USER_COLUMNS),
            username.to_string(),
        )
        .await
    }

    /// Looks a user up by exact username first, then by email.
    pub async fn find_by_username_or_email(&self, value: &str) -> Result<Option<User>, BoxError> {
        if let Some(user) = self.find_by_username(value).await? {
            return Ok(Some(user));
        }
        self.find_one(
            format!(
                "SELECT {} FROM users u WHERE u.email = ?1 AND u.email <> '' ORDER BY u.id LIMIT 1",
                USER_COLUMNS
            ),
            value.to_string(),
        )
        .await
    }

    async fn find_one<P>(&self, sql: String, param: P) -> Result<Option<User>, BoxError>
    where
        P: rusqlite::ToSql + Send + 'static,
    {
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> Result<Option<User>, BoxError> {
            let conn = db.lock()?;
            let mut stmt = conn.prepare(&sql)?;
            let user = stmt.query_row([&param], user_from_row).optional()?;
            Ok(user)
        })
        .await?
    }

    pub async fn find_details(&self, id: i64) -> Result<Option<UserDetails>, BoxError> {
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> Result<Option<UserDetails>, BoxError> {
            let conn = db.lock()?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} {} WHERE u.id = ?1",
                DETAIL_COLUMNS, DETAIL_JOINS
            ))?;
            let details = stmt.query_row([id], details_from_row).optional()?;
            Ok(details)
        })
        .await?
    }

    /// True when another user already holds `username`.
    pub async fn username_taken(
        &self,
        username: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, BoxError> {
        let db = self.db.clone();
        let username = username.to_string();

        tokio::task::spawn_blocking(move || -> Result<bool, BoxError> {
            let conn = db.lock()?;
            let mut stmt = conn.prepare(
                "SELECT 1 FROM users WHERE username = ?1 AND (?2 IS NULL OR id <> ?2)",
            )?;
            let result = stmt
                .query_row(rusqlite::params![&username, exclude_id], |_row| Ok(()))
                .optional()?;
            Ok(result.is_some())
        })
        .await?
    }

    pub async fn count_matching(&self, search: &str) -> Result<u64, BoxError> {
        let db = self.db.clone();
        let search = search.to_string();

        tokio::task::spawn_blocking(move || -> Result<u64, BoxError> {
            let conn = db.lock()?;
            let pattern = like_pattern(&search);
            let count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM users u WHERE {}", SEARCH_FILTER),
                rusqlite::params![&search, &pattern],
                |row| row.get(0),
            )?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await?
    }

    /// One page of users matching `search`, ordered by id.
    pub async fn search_page(
        &self,
        search: &str,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<UserDetails>, BoxError> {
        let db = self.db.clone();
        let search = search.to_string();
        let offset = i64::try_from(offset)?;

        tokio::task::spawn_blocking(move || -> Result<Vec<UserDetails>, BoxError> {
            let conn = db.lock()?;
            let pattern = like_pattern(&search);
            let mut stmt = conn.prepare(&format!(
                "SELECT {} {} WHERE {} ORDER BY u.id LIMIT ?3 OFFSET ?4",
                DETAIL_COLUMNS, DETAIL_JOINS, SEARCH_FILTER
            ))?;
            let users = stmt
                .query_map(rusqlite::params![&search, &pattern, limit, offset], details_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(users)
        })
        .await?
    }

    /// Updates account fields and the profile in one transaction.
    pub async fn update_user(
        &self,
        user_id: i64,
        account: AccountFields,
        profile: Profile,
    ) -> Result<(), BoxError> {
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> Result<(), BoxError> {
            let mut conn = db.lock()?;
            let tx = conn.transaction()?;

            tx.execute(
                "UPDATE users SET username = ?1, first_name = ?2, last_name = ?3, email = ?4 WHERE id = ?5",
                rusqlite::params![
                    &account.username,
                    &account.first_name,
                    &account.last_name,
                    &account.email,
                    user_id
                ],
            )?;

            tx.execute(
                "INSERT INTO profiles (user_id, gender_id, address, date_of_birth, phone_number)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(user_id) DO UPDATE SET
                     gender_id = excluded.gender_id,
                     address = excluded.address,
                     date_of_birth = excluded.date_of_birth,
                     phone_number = excluded.phone_number",
                rusqlite::params![
                    user_id,
                    profile.gender_id,
                    &profile.address,
                    profile.date_of_birth.map(format_date),
                    profile.phone_number
                ],
            )?;

            tx.commit()?;
            Ok(())
        })
        .await?
    }

    pub async fn set_password(&self, user_id: i64, password: &str) -> Result<User, BoxError> {
        let password_hash = hash_password(password)?;
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> Result<(), BoxError> {
            let conn = db.lock()?;
            conn.execute(
                "UPDATE users SET password_hash = ?1 WHERE id = ?2",
                rusqlite::params![&password_hash, user_id],
            )?;
            Ok(())
        })
        .await??;

        self.find_by_id(user_id)
            .await?
            .ok_or_else(|| format!("User {} not found", user_id).into())
    }

    pub async fn record_login(&self, user_id: i64) -> Result<(), BoxError> {
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> Result<(), BoxError> {
            let conn = db.lock()?;
            conn.execute(
                "UPDATE users SET last_login = CURRENT_TIMESTAMP WHERE id = ?1",
                [user_id],
            )?;
            Ok(())
        })
        .await?
    }

    /// Deletes the user; the profile goes with it through the foreign key.
    pub async fn delete_user(&self, user_id: i64) -> Result<bool, BoxError> {
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> Result<bool, BoxError> {
            let conn = db.lock()?;
            let deleted = conn.execute("DELETE FROM users WHERE id = ?1", [user_id])?;
            Ok(deleted > 0)
        })
        .await?
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        password_hash: row.get(5)?,
        is_superuser: row.get::<_, i64>(6)? != 0,
        last_login: row.get::<_, Option<String>>(7)?.map(parse_datetime),
        date_joined: parse_datetime(row.get::<_, String>(8)?),
    })
}

fn details_from_row(row: &Row<'_>) -> rusqlite::Result<UserDetails> {
    Ok(UserDetails {
        user: user_from_row(row)?,
        profile: Profile {
            gender_id: row.get(9)?,
            address: row.get(10)?,
            date_of_birth: row
                .get::<_, Option<String>>(11)?
                .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            phone_number: row.get(12)?,
        },
        gender_name: row.get(13)?,
    })
}

/// True when `error` is SQLite rejecting a write on a UNIQUE constraint.
pub fn is_unique_violation(error: &BoxError) -> bool {
    error
        .downcast_ref::<rusqlite::Error>()
        .and_then(rusqlite::Error::sqlite_error_code)
        .map(|code| code == rusqlite::ErrorCode::ConstraintViolation)
        .unwrap_or(false)
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Builds a `LIKE` pattern matching `search` anywhere, with `%`, `_` and the
/// escape character itself taken literally.
pub(crate) fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    // SQLite stores timestamps as strings, parse them
    // Format: YYYY-MM-DD HH:MM:SS
    chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc())
        .unwrap_or_else(Utc::now)
}
