use serde::{Deserialize, Serialize};

use crate::service::documents::{DocumentEntry, DocumentSummary};
use crate::types::CategoryWithCount;

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Registration form. Accepts the `password1`/`password2` field names too.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "password1")]
    pub password: String,
    #[serde(default, alias = "password2")]
    pub password_confirm: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default, alias = "username")]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub registered: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub category: CategoryWithCount,
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<CategoryWithCount>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub documents: Vec<DocumentSummary>,
}

#[derive(Debug, Serialize)]
pub struct DocumentsResponse {
    pub documents: Vec<DocumentEntry>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
