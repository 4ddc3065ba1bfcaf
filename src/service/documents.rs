//! Document upload, listing, retrieval and deletion.
//!
//! Bytes go to the configured [`ObjectStore`] first and the metadata row is
//! written afterwards, so a row always points at an object that existed when
//! it was created. Failures after an object was stored are reconciled by
//! deleting the object again.

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::categories;
use super::format::{display_date, file_icon, human_size, split_tags};
use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::storage::{Download, ObjectStore, StorageError, storage_key};
use crate::store::{DocumentFilter, Store};
use crate::types::{Category, Document, DocumentWithCategory, NewDocument, User};

pub const RECENT_DAYS: i64 = 7;
pub const RECENT_LIMIT: i64 = 10;

/// Stands in for a URL the storage backend could not produce.
pub const URL_PLACEHOLDER: &str = "#";

pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub files: Vec<UploadFile>,
    /// Category id or name, as typed by the client.
    pub category: Option<String>,
    pub tags: String,
    pub notes: String,
}

#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_file_bytes: u64,
    pub max_files: usize,
    pub timeout: Duration,
}

impl UploadLimits {
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            max_file_bytes: config.max_upload_bytes,
            max_files: config.max_files_per_upload,
            timeout: config.upload_timeout(),
        }
    }

    pub fn check_size(&self, filename: &str, size: u64) -> Result<()> {
        if size > self.max_file_bytes {
            return Err(Error::SizeLimit {
                filename: filename.to_string(),
                limit: human_size(self.max_file_bytes),
            });
        }
        Ok(())
    }
}

/// Per-file result of an upload.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub id: i64,
    pub name: String,
    pub size: String,
    pub icon: &'static str,
    pub date: String,
    pub category: String,
}

/// One row of a document listing.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentEntry {
    pub id: i64,
    pub name: String,
    pub size: String,
    pub size_bytes: i64,
    pub icon: &'static str,
    pub date: String,
    pub uploaded_at: DateTime<Utc>,
    pub category: String,
    pub category_id: Option<i64>,
    pub tags: Vec<String>,
    pub notes: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    All,
    /// Uploaded in the last [`RECENT_DAYS`] days, at most [`RECENT_LIMIT`].
    Recent,
}

/// Stores every file of the request or none of them.
pub async fn upload(
    store: &dyn Store,
    objects: &dyn ObjectStore,
    user: &User,
    request: UploadRequest,
    limits: &UploadLimits,
) -> Result<Vec<DocumentSummary>> {
    validate_batch(&request.files, limits)?;

    let category = categories::resolve(store, user, request.category.as_deref())?;
    let tags = split_tags(&request.tags).join(", ");
    let notes = request.notes.trim();

    let mut stored: Vec<Document> = Vec::with_capacity(request.files.len());
    for file in &request.files {
        let result = store_file(
            store,
            objects,
            user,
            file,
            category.as_ref(),
            &tags,
            notes,
            limits,
        )
        .await;

        match result {
            Ok(doc) => stored.push(doc),
            Err(e) => {
                tracing::warn!(
                    user_id = user.id,
                    filename = %file.filename,
                    rolled_back = stored.len(),
                    "upload failed, rolling back batch: {e}"
                );
                rollback(store, objects, user, &stored).await;
                return Err(e);
            }
        }
    }

    tracing::info!(user_id = user.id, count = stored.len(), "uploaded documents");

    let category_name = category.map_or_else(|| UNCATEGORIZED.to_string(), |c| c.name);
    Ok(stored
        .iter()
        .map(|doc| DocumentSummary {
            id: doc.id,
            name: doc.name.clone(),
            size: human_size(doc.size.unsigned_abs()),
            icon: file_icon(&doc.name),
            date: display_date(&doc.uploaded_at),
            category: category_name.clone(),
        })
        .collect())
}

fn validate_batch(files: &[UploadFile], limits: &UploadLimits) -> Result<()> {
    if files.is_empty() {
        return Err(Error::validation("Select at least one file to upload"));
    }
    if files.len() > limits.max_files {
        return Err(Error::validation(format!(
            "At most {} files can be uploaded at once",
            limits.max_files
        )));
    }
    for file in files {
        if file.filename.trim().is_empty() {
            return Err(Error::validation("Every file needs a name"));
        }
        limits.check_size(&file.filename, file.data.len() as u64)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn store_file(
    store: &dyn Store,
    objects: &dyn ObjectStore,
    user: &User,
    file: &UploadFile,
    category: Option<&Category>,
    tags: &str,
    notes: &str,
    limits: &UploadLimits,
) -> Result<Document> {
    let name = file.filename.trim();
    let uploaded_at = Utc::now();
    let key = storage_key(user.id, uploaded_at, name);

    let put = objects.put(&key, name, file.data.clone());
    let stored_key = match tokio::time::timeout(limits.timeout, put).await {
        Ok(result) => result?,
        Err(_) => {
            // The provider may still have stored it.
            remove_object(objects, &key).await;
            return Err(StorageError::Timeout(limits.timeout.as_secs()).into());
        }
    };

    let new_doc = NewDocument {
        user_id: user.id,
        category_id: category.map(|c| c.id),
        name: name.to_string(),
        storage_key: stored_key,
        location: objects.location(),
        size: file.data.len() as i64,
        notes: notes.to_string(),
        tags: tags.to_string(),
        uploaded_at,
    };

    match store.create_document(&new_doc) {
        Ok(doc) => Ok(doc),
        Err(e) => {
            tracing::warn!(key = %new_doc.storage_key, "metadata insert failed, removing stored object");
            remove_object(objects, &new_doc.storage_key).await;
            Err(e)
        }
    }
}

async fn rollback(store: &dyn Store, objects: &dyn ObjectStore, user: &User, stored: &[Document]) {
    for doc in stored {
        remove_object(objects, &doc.storage_key).await;
        if let Err(e) = store.delete_document(user.id, doc.id) {
            tracing::warn!(document_id = doc.id, "failed to roll back document row: {e}");
        }
    }
}

/// Best-effort object removal; failures are logged, never returned.
async fn remove_object(objects: &dyn ObjectStore, key: &str) {
    match objects.delete(key).await {
        Ok(true) => {}
        Ok(false) => tracing::info!(key, "object already absent"),
        Err(e) => tracing::warn!(key, "failed to delete stored object: {e}"),
    }
}

pub fn list(
    store: &dyn Store,
    objects: &dyn ObjectStore,
    user: &User,
    listing: Listing,
    now: DateTime<Utc>,
) -> Result<Vec<DocumentEntry>> {
    let filter = match listing {
        Listing::All => DocumentFilter::default(),
        Listing::Recent => DocumentFilter {
            uploaded_since: Some(now - chrono::Duration::days(RECENT_DAYS)),
            limit: Some(RECENT_LIMIT),
        },
    };

    let documents = store.list_documents(user.id, filter)?;
    Ok(documents
        .into_iter()
        .map(|doc| entry(objects, doc))
        .collect())
}

fn entry(objects: &dyn ObjectStore, row: DocumentWithCategory) -> DocumentEntry {
    let url = fetch_url(objects, &row.document);
    let DocumentWithCategory {
        document: doc,
        category_name,
    } = row;

    DocumentEntry {
        id: doc.id,
        size: human_size(doc.size.unsigned_abs()),
        size_bytes: doc.size,
        icon: file_icon(&doc.name),
        date: display_date(&doc.uploaded_at),
        uploaded_at: doc.uploaded_at,
        category: category_name.unwrap_or_else(|| UNCATEGORIZED.to_string()),
        category_id: doc.category_id,
        tags: split_tags(&doc.tags),
        notes: doc.notes,
        name: doc.name,
        url,
    }
}

fn fetch_url(objects: &dyn ObjectStore, doc: &Document) -> String {
    let url = ensure_location(objects, doc).and_then(|()| objects.url(&doc.storage_key));
    url.unwrap_or_else(|e| {
        tracing::warn!(document_id = doc.id, "cannot resolve document url: {e}");
        URL_PLACEHOLDER.to_string()
    })
}

fn ensure_location(objects: &dyn ObjectStore, doc: &Document) -> std::result::Result<(), StorageError> {
    if doc.location == objects.location() {
        Ok(())
    } else {
        Err(StorageError::BackendMismatch)
    }
}

/// Resolves a forced download of an owned document.
pub async fn download(
    store: &dyn Store,
    objects: &dyn ObjectStore,
    user: &User,
    id: i64,
) -> Result<(Document, Download)> {
    let doc = store
        .get_document(user.id, id)?
        .ok_or(Error::NotFound)?
        .document;
    open(objects, doc).await
}

/// Resolves an owned document by its storage key, for the local media route.
pub async fn fetch(
    store: &dyn Store,
    objects: &dyn ObjectStore,
    user: &User,
    storage_key: &str,
) -> Result<(Document, Download)> {
    let doc = store
        .get_document_by_storage_key(user.id, storage_key)?
        .ok_or(Error::NotFound)?
        .document;
    open(objects, doc).await
}

async fn open(objects: &dyn ObjectStore, doc: Document) -> Result<(Document, Download)> {
    ensure_location(objects, &doc)?;
    let download = objects.download(&doc.storage_key).await?;
    Ok((doc, download))
}

/// Deletes an owned document. The stored object is removed best effort; the
/// row is always deleted.
pub async fn delete(
    store: &dyn Store,
    objects: &dyn ObjectStore,
    user: &User,
    id: i64,
) -> Result<()> {
    let doc = store
        .get_document(user.id, id)?
        .ok_or(Error::NotFound)?
        .document;

    match ensure_location(objects, &doc) {
        Ok(()) => remove_object(objects, &doc.storage_key).await,
        Err(e) => tracing::warn!(document_id = doc.id, "leaving stored object in place: {e}"),
    }

    store.delete_document(user.id, doc.id)?;
    tracing::info!(user_id = user.id, document_id = doc.id, "deleted document");
    Ok(())
}
