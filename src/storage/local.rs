use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufReader};
use uuid::Uuid;

use super::{Download, ObjectStore, StorageError};
use crate::types::StorageLocation;

impl StorageError {
    fn from_io(e: std::io::Error) -> Self {
        if e.kind() == ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(e)
        }
    }
}

/// Stores objects on the local filesystem under `{data_dir}/objects`.
/// Objects are fetched through the server's `/media/{key}` route.
pub struct LocalStore {
    base_path: PathBuf,
    public_base_url: String,
}

impl LocalStore {
    pub fn new(data_dir: &Path, public_base_url: Option<&str>) -> Self {
        Self {
            base_path: data_dir.join("objects"),
            public_base_url: public_base_url
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
        }
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.base_path.join(key))
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path.join("tmp").join(Uuid::new_v4().to_string())
    }

    pub async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.object_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    pub async fn open(&self, key: &str) -> Result<(BufReader<File>, u64), StorageError> {
        let path = self.object_path(key)?;
        let file = File::open(&path).await.map_err(StorageError::from_io)?;
        let size = file.metadata().await?.len();
        Ok((BufReader::new(file), size))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    fn location(&self) -> StorageLocation {
        StorageLocation::Local
    }

    async fn put(&self, key: &str, _filename: &str, data: Bytes) -> Result<String, StorageError> {
        let final_path = self.object_path(key)?;
        if fs::try_exists(&final_path).await? {
            return Err(StorageError::AlreadyExists);
        }

        let temp_path = self.temp_path();
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        write_object(&temp_path, &final_path, &data).await?;

        tracing::debug!(key, size = data.len(), "local storage: stored object");
        Ok(key.to_string())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.object_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn url(&self, key: &str) -> Result<String, StorageError> {
        validate_key(key)?;
        Ok(format!("{}/media/{key}", self.public_base_url))
    }

    async fn download(&self, key: &str) -> Result<Download, StorageError> {
        let (reader, size) = self.open(key).await?;
        Ok(Download::Stream {
            reader: Box::new(reader),
            size,
        })
    }
}

/// Writes `data` to `temp_path` and moves it into place. The temp file is
/// removed when any step fails.
async fn write_object(temp_path: &Path, final_path: &Path, data: &[u8]) -> std::io::Result<()> {
    let result = write_and_rename(temp_path, final_path, data).await;
    if result.is_err() {
        match fs::remove_file(temp_path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => tracing::warn!(
                "local storage: failed to remove {}: {e}",
                temp_path.display()
            ),
            _ => {}
        }
    }
    result
}

async fn write_and_rename(temp_path: &Path, final_path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut temp_file = File::create(temp_path).await?;
    temp_file.write_all(data).await?;
    temp_file.sync_all().await?;
    drop(temp_file);

    if let Some(parent) = final_path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::rename(temp_path, final_path).await
}

/// Keys are relative paths of safe segments; nothing may escape the base directory.
fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() || key.starts_with('/') {
        return Err(StorageError::InvalidKey);
    }

    for segment in key.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(StorageError::InvalidKey);
        }
        if !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(StorageError::InvalidKey);
        }
    }

    Ok(())
}
