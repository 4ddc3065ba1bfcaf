use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Router,
    routing::{delete, get, post},
};

use super::html::Pages;
use super::response::{method_not_allowed, not_found};
use super::{categories, documents, media, pages};
use crate::auth::PasswordHasher;
use crate::config::{ServerConfig, StorageConfig};
use crate::error::{Error, Result};
use crate::storage::{CloudinaryStore, LocalStore, ObjectStore};
use crate::store::Store;

/// Multipart framing and the text fields of an upload.
const UPLOAD_FORM_OVERHEAD: u64 = 1024 * 1024;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub storage: Arc<dyn ObjectStore>,
    pub hasher: PasswordHasher,
    pub pages: Pages,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        storage: Arc<dyn ObjectStore>,
        config: ServerConfig,
    ) -> Result<Self> {
        Ok(Self {
            store,
            storage,
            hasher: PasswordHasher::new(),
            pages: Pages::new()?,
            config,
        })
    }

    /// Builds the state with the object store named by `config.storage`.
    pub fn from_config(store: Arc<dyn Store>, config: ServerConfig) -> Result<Self> {
        let storage: Arc<dyn ObjectStore> = match &config.storage {
            StorageConfig::Local => Arc::new(LocalStore::new(
                &config.data_dir,
                config.public_base_url.as_deref(),
            )),
            StorageConfig::Cloudinary(cloud) => Arc::new(
                CloudinaryStore::new(cloud.clone(), config.upload_timeout())
                    .map_err(|e| Error::Config(format!("cannot build storage client: {e}")))?,
            ),
        };
        Self::new(store, storage, config)
    }

    /// Largest request body the upload route accepts.
    fn upload_body_limit(&self) -> usize {
        let files = self.config.max_files_per_upload as u64;
        let limit = self
            .config
            .max_upload_bytes
            .saturating_mul(files)
            .saturating_add(UPLOAD_FORM_OVERHEAD);
        usize::try_from(limit).unwrap_or(usize::MAX)
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

fn api_router(upload_body_limit: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/categories/create", post(categories::create_category))
        .route("/categories/{id}/delete", delete(categories::delete_category))
        .route("/categories/user", get(categories::list_categories))
        .route(
            "/documents/upload",
            post(documents::upload_documents).layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route("/documents", get(documents::list_documents))
        .route("/documents/recent", get(documents::recent_documents))
        .route("/documents/{id}/download", get(documents::download_document))
        .route("/documents/{id}/delete", delete(documents::delete_document))
}

fn page_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(pages::index))
        .route("/register", get(pages::register_form).post(pages::register))
        .route("/login", get(pages::login_form).post(pages::login))
        .route("/logout", get(pages::logout))
        .route("/platform", get(pages::platform))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(page_router())
        .nest("/api", api_router(state.upload_body_limit()))
        .route("/media/{*key}", get(media::fetch_media))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
