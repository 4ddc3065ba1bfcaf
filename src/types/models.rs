use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StorageLocation;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Insert payload for a user; the id is assigned by the database.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_staff: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub icon: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryWithCount {
    #[serde(flatten)]
    pub category: Category,
    pub document_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    pub name: String,
    pub storage_key: String,
    pub location: StorageLocation,
    pub size: i64,
    pub notes: String,
    pub tags: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A document joined with the name of its category, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentWithCategory {
    #[serde(flatten)]
    pub document: Document,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub name: String,
    pub storage_key: String,
    pub location: StorageLocation,
    pub size: i64,
    pub notes: String,
    pub tags: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Aggregate numbers shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DocumentStats {
    pub count: i64,
    pub total_bytes: i64,
}
