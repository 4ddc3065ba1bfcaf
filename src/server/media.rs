use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Redirect, Response};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use super::AppState;
use super::response::ApiError;
use crate::auth::RequireUser;
use crate::service::documents;
use crate::storage::Download;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

/// GET /media/{*key} - fetch URL for objects held by the local backend
pub async fn fetch_media(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let (doc, download) =
        documents::fetch(state.store.as_ref(), state.storage.as_ref(), &auth.user, &key).await?;

    Ok(match download {
        Download::Redirect(url) => Redirect::temporary(&url).into_response(),
        Download::Stream { reader, size } => {
            stream_object(&doc.name, reader, size, Disposition::Inline)
        }
    })
}

pub fn stream_object(
    filename: &str,
    reader: Box<dyn AsyncRead + Send + Unpin>,
    size: u64,
    disposition: Disposition,
) -> Response {
    let content_type = mime_guess::from_path(filename).first_or_octet_stream();
    let body = Body::from_stream(ReaderStream::new(reader));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_LENGTH, size)
        .header(header::CONTENT_DISPOSITION, content_disposition(filename, disposition))
        .header("X-Content-Type-Options", "nosniff")
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// Builds a Content-Disposition value with an ASCII fallback `filename` and
/// the exact name in RFC 5987 `filename*`.
fn content_disposition(filename: &str, disposition: Disposition) -> String {
    let kind = match disposition {
        Disposition::Inline => "inline",
        Disposition::Attachment => "attachment",
    };

    let safe_filename: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe_filename = if safe_filename.trim().is_empty() {
        "download".to_string()
    } else {
        safe_filename
    };

    format!(
        "{kind}; filename=\"{safe_filename}\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition("report.pdf", Disposition::Attachment),
            "attachment; filename=\"report.pdf\"; filename*=UTF-8''report.pdf"
        );
    }

    #[test]
    fn test_content_disposition_escapes_quotes_and_unicode() {
        let value = content_disposition("año \"final\".pdf", Disposition::Inline);
        assert!(value.starts_with("inline; filename=\"a_o _final_.pdf\";"));
        assert!(value.ends_with("filename*=UTF-8''a%C3%B1o%20%22final%22.pdf"));
    }

    #[tokio::test]
    async fn test_stream_object_headers() {
        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(&b"hello"[..]);
        let response = stream_object("notes.txt", reader, 5, Disposition::Attachment);

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
        assert_eq!(headers[header::CONTENT_LENGTH], "5");
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert!(
            headers[header::CONTENT_DISPOSITION]
                .to_str()
                .unwrap()
                .starts_with("attachment;")
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"hello");
    }
}
