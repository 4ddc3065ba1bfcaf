//! Object storage for document bytes.
//!
//! A deployment configures exactly one backend. Documents record which kind of
//! backend stored them ([`StorageLocation`]) so retrieval can refuse keys that
//! belong to a backend that is no longer configured.

mod cloudinary;
mod key;
mod local;

pub use cloudinary::{CloudinaryConfig, CloudinaryStore};
pub use key::{sanitize_component, storage_key};
pub use local::LocalStore;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::io::AsyncRead;

use crate::types::StorageLocation;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found")]
    NotFound,
    #[error("object already exists")]
    AlreadyExists,
    #[error("invalid storage key")]
    InvalidKey,
    #[error("storage request timed out after {0}s")]
    Timeout(u64),
    #[error("document is stored in a backend that is not configured")]
    BackendMismatch,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider error ({status}): {message}")]
    Provider { status: u16, message: String },
}

/// How a client should receive an object's bytes.
pub enum Download {
    /// The provider serves the bytes; send the client there.
    Redirect(String),
    /// The bytes are served by this process.
    Stream {
        reader: Box<dyn AsyncRead + Send + Unpin>,
        size: u64,
    },
}

impl std::fmt::Debug for Download {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Redirect(url) => f.debug_tuple("Redirect").field(url).finish(),
            Self::Stream { size, .. } => f.debug_struct("Stream").field("size", size).finish(),
        }
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// The location tag recorded on documents stored by this backend.
    fn location(&self) -> StorageLocation;

    /// Stores `data` under `key` and returns the key the backend assigned,
    /// which is what must be persisted.
    async fn put(&self, key: &str, filename: &str, data: Bytes) -> Result<String, StorageError>;

    /// Removes an object. Returns `false` when it was already absent.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// URL that fetches the object for display.
    fn url(&self, key: &str) -> Result<String, StorageError>;

    /// Resolves how a forced download of the object is delivered.
    async fn download(&self, key: &str) -> Result<Download, StorageError>;
}
