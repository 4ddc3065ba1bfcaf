use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::schema::SCHEMA;
use super::{CategoryOrder, DocumentFilter, Store};
use crate::error::{Error, Result};
use crate::types::*;

const USER_COLUMNS: &str =
    "id, email, first_name, last_name, password_hash, is_active, is_staff, created_at";

const SESSION_COLUMNS: &str = "id, token_hash, user_id, created_at, expires_at";

const DOCUMENT_COLUMNS: &str = "d.id, d.user_id, d.category_id, d.name, d.storage_key, d.location, \
     d.size, d.notes, d.tags, d.uploaded_at, c.name";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

/// Fixed-width so that string comparison in SQL matches time order.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl ToSql for StorageLocation {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for StorageLocation {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        password_hash: row.get(4)?,
        is_active: row.get(5)?,
        is_staff: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        user_id: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        expires_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        icon: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<DocumentWithCategory> {
    Ok(DocumentWithCategory {
        document: Document {
            id: row.get(0)?,
            user_id: row.get(1)?,
            category_id: row.get(2)?,
            name: row.get(3)?,
            storage_key: row.get(4)?,
            location: row.get(5)?,
            size: row.get(6)?,
            notes: row.get(7)?,
            tags: row.get(8)?,
            uploaded_at: parse_datetime(&row.get::<_, String>(9)?),
        },
        category_name: row.get(10)?,
    })
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &NewUser, categories: &[(&str, &str)]) -> Result<User> {
        let now = Utc::now();
        let created_at = format_datetime(&now);

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT INTO users (email, first_name, last_name, password_hash, is_active, is_staff, created_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6)",
            params![
                user.email,
                user.first_name,
                user.last_name,
                user.password_hash,
                user.is_staff,
                created_at,
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => {
                return Err(Error::conflict("A user with this email already exists"));
            }
            Err(e) => return Err(Error::from(e)),
        }

        let user_id = tx.last_insert_rowid();

        for (name, icon) in categories {
            tx.execute(
                "INSERT INTO categories (user_id, name, icon, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![user_id, name, icon, created_at],
            )?;
        }

        tx.commit()?;

        Ok(User {
            id: user_id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            password_hash: user.password_hash.clone(),
            is_active: true,
            is_staff: user.is_staff,
            created_at: parse_datetime(&created_at),
        })
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            params![email],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn count_users(&self) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    // Session operations

    fn create_session(&self, session: &Session) -> Result<()> {
        self.conn().execute(
            "INSERT INTO sessions (id, token_hash, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.id,
                session.token_hash,
                session.user_id,
                format_datetime(&session.created_at),
                format_datetime(&session.expires_at),
            ],
        )?;
        Ok(())
    }

    fn get_session_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE token_hash = ?1"),
            params![token_hash],
            session_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_session(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        let rows = self.conn().execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            params![format_datetime(&now)],
        )?;
        Ok(rows)
    }

    // Category operations

    fn create_category(&self, user_id: i64, name: &str, icon: &str) -> Result<Category> {
        let created_at = Utc::now();
        let conn = self.conn();

        let result = conn.execute(
            "INSERT INTO categories (user_id, name, icon, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, name, icon, format_datetime(&created_at)],
        );

        match result {
            Ok(_) => Ok(Category {
                id: conn.last_insert_rowid(),
                user_id,
                name: name.to_string(),
                icon: icon.to_string(),
                created_at,
            }),
            Err(e) if is_constraint_violation(&e) => {
                Err(Error::conflict("A category with this name already exists"))
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_category(&self, user_id: i64, id: i64) -> Result<Option<Category>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, user_id, name, icon, created_at FROM categories WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
            category_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_category_by_name(&self, user_id: i64, name: &str) -> Result<Option<Category>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, user_id, name, icon, created_at FROM categories WHERE user_id = ?1 AND name = ?2",
            params![user_id, name],
            category_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_categories(
        &self,
        user_id: i64,
        order: CategoryOrder,
    ) -> Result<Vec<CategoryWithCount>> {
        let order_by = match order {
            CategoryOrder::ByName => "c.name, c.id",
            CategoryOrder::Newest => "c.created_at DESC, c.id DESC",
        };

        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT c.id, c.user_id, c.name, c.icon, c.created_at, COUNT(d.id)
             FROM categories c
             LEFT JOIN documents d ON d.category_id = c.id
             WHERE c.user_id = ?1
             GROUP BY c.id
             ORDER BY {order_by}"
        ))?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(CategoryWithCount {
                category: category_from_row(row)?,
                document_count: row.get(5)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_category(&self, user_id: i64, id: i64) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM categories WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(rows > 0)
    }

    // Document operations

    fn create_document(&self, doc: &NewDocument) -> Result<Document> {
        let conn = self.conn();
        let result = conn.execute(
            "INSERT INTO documents (user_id, category_id, name, storage_key, location, size, notes, tags, uploaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                doc.user_id,
                doc.category_id,
                doc.name,
                doc.storage_key,
                doc.location,
                doc.size,
                doc.notes,
                doc.tags,
                format_datetime(&doc.uploaded_at),
            ],
        );

        match result {
            Ok(_) => Ok(Document {
                id: conn.last_insert_rowid(),
                user_id: doc.user_id,
                category_id: doc.category_id,
                name: doc.name.clone(),
                storage_key: doc.storage_key.clone(),
                location: doc.location,
                size: doc.size,
                notes: doc.notes.clone(),
                tags: doc.tags.clone(),
                uploaded_at: doc.uploaded_at,
            }),
            Err(e) if is_constraint_violation(&e) => {
                Err(Error::conflict("A document with this storage key already exists"))
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_document(&self, user_id: i64, id: i64) -> Result<Option<DocumentWithCategory>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {DOCUMENT_COLUMNS}
                 FROM documents d LEFT JOIN categories c ON c.id = d.category_id
                 WHERE d.id = ?1 AND d.user_id = ?2"
            ),
            params![id, user_id],
            document_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_document_by_storage_key(
        &self,
        user_id: i64,
        storage_key: &str,
    ) -> Result<Option<DocumentWithCategory>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {DOCUMENT_COLUMNS}
                 FROM documents d LEFT JOIN categories c ON c.id = d.category_id
                 WHERE d.storage_key = ?1 AND d.user_id = ?2"
            ),
            params![storage_key, user_id],
            document_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_documents(
        &self,
        user_id: i64,
        filter: DocumentFilter,
    ) -> Result<Vec<DocumentWithCategory>> {
        // An empty lower bound and LIMIT -1 mean "no restriction" in SQLite.
        let since = filter
            .uploaded_since
            .as_ref()
            .map(format_datetime)
            .unwrap_or_default();
        let limit = filter.limit.unwrap_or(-1);

        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS}
             FROM documents d LEFT JOIN categories c ON c.id = d.category_id
             WHERE d.user_id = ?1 AND d.uploaded_at >= ?2
             ORDER BY d.uploaded_at DESC, d.id DESC
             LIMIT ?3"
        ))?;

        let rows = stmt.query_map(params![user_id, since, limit], document_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn document_stats(&self, user_id: i64) -> Result<DocumentStats> {
        let conn = self.conn();
        let (count, total_bytes): (i64, Option<i64>) = conn.query_row(
            "SELECT COUNT(*), SUM(size) FROM documents WHERE user_id = ?1",
            params![user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(DocumentStats {
            count,
            total_bytes: total_bytes.unwrap_or(0),
        })
    }

    fn count_documents(&self) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count)
    }

    fn delete_document(&self, user_id: i64, id: i64) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM documents WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(rows > 0)
    }
}
