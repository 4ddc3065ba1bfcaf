mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// Ordering for category listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryOrder {
    /// Alphabetical, used by the category picker API.
    ByName,
    /// Newest first, used on the dashboard.
    Newest,
}

/// Restricts a document listing. Results are always newest first.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentFilter {
    pub uploaded_since: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

/// Store defines the database interface.
///
/// Every category and document operation takes the owning user's id and
/// filters on it; rows belonging to other users behave as if absent.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    /// Creates the user and its starter categories in one transaction.
    /// Fails with `Error::Conflict` when the email is already registered.
    fn create_user(&self, user: &NewUser, categories: &[(&str, &str)]) -> Result<User>;
    fn get_user(&self, id: i64) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn count_users(&self) -> Result<i64>;

    // Session operations
    fn create_session(&self, session: &Session) -> Result<()>;
    fn get_session_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>>;
    fn delete_session(&self, id: &str) -> Result<bool>;
    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize>;

    // Category operations
    fn create_category(&self, user_id: i64, name: &str, icon: &str) -> Result<Category>;
    fn get_category(&self, user_id: i64, id: i64) -> Result<Option<Category>>;
    fn get_category_by_name(&self, user_id: i64, name: &str) -> Result<Option<Category>>;
    fn list_categories(&self, user_id: i64, order: CategoryOrder)
    -> Result<Vec<CategoryWithCount>>;
    fn delete_category(&self, user_id: i64, id: i64) -> Result<bool>;

    // Document operations
    fn create_document(&self, doc: &NewDocument) -> Result<Document>;
    fn get_document(&self, user_id: i64, id: i64) -> Result<Option<DocumentWithCategory>>;
    fn get_document_by_storage_key(
        &self,
        user_id: i64,
        storage_key: &str,
    ) -> Result<Option<DocumentWithCategory>>;
    fn list_documents(
        &self,
        user_id: i64,
        filter: DocumentFilter,
    ) -> Result<Vec<DocumentWithCategory>>;
    fn document_stats(&self, user_id: i64) -> Result<DocumentStats>;
    fn count_documents(&self) -> Result<i64>;
    fn delete_document(&self, user_id: i64, id: i64) -> Result<bool>;
}
