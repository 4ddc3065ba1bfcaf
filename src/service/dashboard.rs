use chrono::{DateTime, Utc};
use serde::Serialize;

use super::documents::{self, DocumentEntry, Listing};
use super::format::human_size;
use crate::error::Result;
use crate::storage::ObjectStore;
use crate::store::{CategoryOrder, Store};
use crate::types::{CategoryWithCount, User};

/// Everything the `/platform` page shows.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub user_name: String,
    pub email: String,
    pub document_count: i64,
    pub total_size: String,
    pub categories: Vec<CategoryWithCount>,
    pub recent: Vec<DocumentEntry>,
}

pub fn load(
    store: &dyn Store,
    objects: &dyn ObjectStore,
    user: &User,
    now: DateTime<Utc>,
) -> Result<Dashboard> {
    let stats = store.document_stats(user.id)?;
    let categories = store.list_categories(user.id, CategoryOrder::Newest)?;
    let recent = documents::list(store, objects, user, Listing::Recent, now)?;

    let user_name = match user.full_name() {
        name if name.is_empty() => user.email.clone(),
        name => name,
    };

    Ok(Dashboard {
        user_name,
        email: user.email.clone(),
        document_count: stats.count,
        total_size: human_size(stats.total_bytes.unsigned_abs()),
        categories,
        recent,
    })
}
