use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::PathRejection;
use axum::extract::{Multipart, Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use bytes::BytesMut;
use chrono::Utc;

use super::AppState;
use super::dto::{DocumentsResponse, MessageResponse, UploadResponse};
use super::media::{Disposition, stream_object};
use super::response::{ApiError, ApiResponse};
use crate::auth::RequireUser;
use crate::service::documents::{self, Listing, UploadFile, UploadLimits, UploadRequest};
use crate::storage::Download;

/// Multipart field carrying the uploaded files; may repeat.
pub const FILES_FIELD: &str = "files";

/// POST /api/documents/upload
pub async fn upload_documents(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<UploadResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let limits = UploadLimits::from_config(&state.config);
    let request = read_upload(&mut multipart, &limits).await?;

    let documents = documents::upload(
        state.store.as_ref(),
        state.storage.as_ref(),
        &auth.user,
        request,
        &limits,
    )
    .await?;

    let message = match documents.len() {
        1 => "1 file uploaded successfully".to_string(),
        n => format!("{n} files uploaded successfully"),
    };

    Ok(ApiResponse::success(UploadResponse { message, documents }))
}

/// Reads the upload form, enforcing the per-file limit while the bytes
/// arrive so an oversized file is rejected before it is fully buffered.
async fn read_upload(
    multipart: &mut Multipart,
    limits: &UploadLimits,
) -> Result<UploadRequest, ApiError> {
    let mut request = UploadRequest::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read multipart: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            FILES_FIELD => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let mut data = BytesMut::new();

                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?
                {
                    data.extend_from_slice(&chunk);
                    limits.check_size(&filename, data.len() as u64)?;
                }

                // Browsers send an empty unnamed part when no file was picked.
                if filename.is_empty() && data.is_empty() {
                    continue;
                }

                if request.files.len() == limits.max_files {
                    return Err(ApiError::bad_request(format!(
                        "At most {} files can be uploaded at once",
                        limits.max_files
                    )));
                }

                request.files.push(UploadFile {
                    filename,
                    data: data.freeze(),
                });
            }
            "category" => request.category = Some(read_text(field).await?),
            "tags" => request.tags = read_text(field).await?,
            "notes" => request.notes = read_text(field).await?,
            other => tracing::debug!(field = other, "ignoring unknown upload field"),
        }
    }

    Ok(request)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read form field: {e}")))
}

/// GET /api/documents
pub async fn list_documents(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> Result<ApiResponse<DocumentsResponse>, ApiError> {
    list(&state, &auth, Listing::All)
}

/// GET /api/documents/recent
pub async fn recent_documents(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> Result<ApiResponse<DocumentsResponse>, ApiError> {
    list(&state, &auth, Listing::Recent)
}

fn list(
    state: &AppState,
    auth: &RequireUser,
    listing: Listing,
) -> Result<ApiResponse<DocumentsResponse>, ApiError> {
    let documents = documents::list(
        state.store.as_ref(),
        state.storage.as_ref(),
        &auth.user,
        listing,
        Utc::now(),
    )?;
    Ok(ApiResponse::success(DocumentsResponse { documents }))
}

/// GET /api/documents/{id}/download
pub async fn download_document(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let (doc, download) =
        documents::download(state.store.as_ref(), state.storage.as_ref(), &auth.user, id).await?;

    Ok(match download {
        Download::Redirect(url) => Redirect::temporary(&url).into_response(),
        Download::Stream { reader, size } => {
            stream_object(&doc.name, reader, size, Disposition::Attachment)
        }
    })
}

/// DELETE /api/documents/{id}/delete
pub async fn delete_document(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse<MessageResponse>, ApiError> {
    let Path(id) = id.map_err(|e| ApiError::bad_request(e.body_text()))?;
    documents::delete(state.store.as_ref(), state.storage.as_ref(), &auth.user, id).await?;
    Ok(ApiResponse::success(MessageResponse::new("Document deleted")))
}
