use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{Download, ObjectStore, StorageError};
use crate::types::StorageLocation;

const DEFAULT_API_BASE_URL: &str = "https://api.cloudinary.com";
const DEFAULT_DELIVERY_BASE_URL: &str = "https://res.cloudinary.com";

/// Documents are uploaded as "raw" resources so any file type is accepted
/// and delivered byte-for-byte.
const RESOURCE_TYPE: &str = "raw";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_base_url: Option<String>,
}

pub struct CloudinaryStore {
    client: Client,
    config: CloudinaryConfig,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig, timeout: Duration) -> Result<Self, StorageError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    fn api_url(&self, action: &str) -> String {
        let base = self
            .config
            .api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
            .trim_end_matches('/');
        format!(
            "{base}/v1_1/{}/{RESOURCE_TYPE}/{action}",
            self.config.cloud_name
        )
    }

    fn delivery_url(&self, transformation: Option<&str>, key: &str) -> String {
        let base = self
            .config
            .delivery_base_url
            .as_deref()
            .unwrap_or(DEFAULT_DELIVERY_BASE_URL)
            .trim_end_matches('/');
        match transformation {
            Some(t) => format!(
                "{base}/{}/{RESOURCE_TYPE}/upload/{t}/{key}",
                self.config.cloud_name
            ),
            None => format!("{base}/{}/{RESOURCE_TYPE}/upload/{key}", self.config.cloud_name),
        }
    }

    /// Signed parameters shared by upload and destroy calls.
    fn signed_params(&self, public_id: &str) -> Vec<(&'static str, String)> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(
            &[("public_id", public_id), ("timestamp", &timestamp)],
            &self.config.api_secret,
        );
        vec![
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp),
            ("api_key", self.config.api_key.clone()),
            ("signature", signature),
            ("signature_algorithm", "sha256".to_string()),
        ]
    }
}

async fn provider_error(response: Response) -> StorageError {
    let status = response.status().as_u16();
    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error.message,
        Err(_) => "unexpected response from storage provider".to_string(),
    };
    StorageError::Provider { status, message }
}

#[async_trait]
impl ObjectStore for CloudinaryStore {
    fn location(&self) -> StorageLocation {
        StorageLocation::Remote
    }

    async fn put(&self, key: &str, filename: &str, data: Bytes) -> Result<String, StorageError> {
        let mut form = Form::new().part(
            "file",
            Part::stream(data).file_name(filename.to_string()),
        );
        for (name, value) in self.signed_params(key) {
            form = form.text(name, value);
        }

        let response = self
            .client
            .post(self.api_url("upload"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(provider_error(response).await);
        }

        let body: UploadResponse = response.json().await?;
        tracing::debug!(public_id = %body.public_id, "cloudinary: uploaded object");
        Ok(body.public_id)
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let response = self
            .client
            .post(self.api_url("destroy"))
            .form(&self.signed_params(key))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(provider_error(response).await);
        }

        let body: DestroyResponse = response.json().await?;
        match body.result.as_str() {
            "ok" => Ok(true),
            "not found" => Ok(false),
            other => Err(StorageError::Provider {
                status: 200,
                message: format!("unexpected destroy result: {other}"),
            }),
        }
    }

    fn url(&self, key: &str) -> Result<String, StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey);
        }
        Ok(self.delivery_url(None, key))
    }

    async fn download(&self, key: &str) -> Result<Download, StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey);
        }
        Ok(Download::Redirect(
            self.delivery_url(Some("fl_attachment"), key),
        ))
    }
}

/// Parameters sorted by name and joined as `a=1&b=2`.
fn string_to_sign(params: &[(&str, &str)]) -> String {
    let mut sorted: Vec<_> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(string_to_sign(params).as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CloudinaryStore {
        CloudinaryStore::new(
            CloudinaryConfig {
                cloud_name: "demo".to_string(),
                api_key: "1234".to_string(),
                api_secret: "shh".to_string(),
                api_base_url: None,
                delivery_base_url: None,
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_string_to_sign_sorts_and_skips_empty() {
        let s = string_to_sign(&[("timestamp", "1700000000"), ("public_id", "documents/a"), ("folder", "")]);
        assert_eq!(s, "public_id=documents/a&timestamp=1700000000");
    }

    #[test]
    fn test_signature_depends_on_secret_not_order() {
        let a = sign(&[("public_id", "x"), ("timestamp", "1")], "secret");
        let b = sign(&[("timestamp", "1"), ("public_id", "x")], "secret");
        let c = sign(&[("public_id", "x"), ("timestamp", "1")], "other");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_signed_params_include_credentials() {
        let params = store().signed_params("documents/1/a.pdf");
        let names: Vec<&str> = params.iter().map(|(k, _)| *k).collect();

        assert_eq!(
            names,
            vec!["public_id", "timestamp", "api_key", "signature", "signature_algorithm"]
        );
        assert!(params.iter().all(|(k, v)| *k != "api_secret" && v != "shh"));
    }

    #[test]
    fn test_api_urls() {
        let store = store();
        assert_eq!(
            store.api_url("upload"),
            "https://api.cloudinary.com/v1_1/demo/raw/upload"
        );
        assert_eq!(
            store.api_url("destroy"),
            "https://api.cloudinary.com/v1_1/demo/raw/destroy"
        );
    }

    #[tokio::test]
    async fn test_fetch_and_download_urls() {
        let store = store();
        let key = "documents/1/20261019083005000000_report_0a1b2c3d.pdf";

        assert_eq!(
            store.url(key).unwrap(),
            format!("https://res.cloudinary.com/demo/raw/upload/{key}")
        );

        match store.download(key).await.unwrap() {
            Download::Redirect(url) => assert_eq!(
                url,
                format!("https://res.cloudinary.com/demo/raw/upload/fl_attachment/{key}")
            ),
            other => panic!("expected redirect, got {other:?}"),
        }
    }

    mod provider {
        use std::collections::HashMap;

        use axum::body::Bytes as Body;
        use axum::extract::Form;
        use axum::http::StatusCode;
        use axum::routing::post;
        use axum::{Json, Router};
        use serde_json::{Value, json};

        use super::*;

        async fn upload(body: Body) -> (StatusCode, Json<Value>) {
            let body = String::from_utf8_lossy(&body);
            if !body.contains("name=\"signature\"") || !body.contains("%PDF-1.7") {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": { "message": "Missing required parameter - file" } })),
                );
            }
            (
                StatusCode::OK,
                Json(json!({ "public_id": "documents/1/assigned", "resource_type": "raw" })),
            )
        }

        async fn destroy(Form(params): Form<HashMap<String, String>>) -> Json<Value> {
            let result = match params.get("public_id").map(String::as_str) {
                Some("documents/1/gone") => "not found",
                Some("documents/1/locked") => "error",
                _ => "ok",
            };
            Json(json!({ "result": result }))
        }

        async fn rejected() -> (StatusCode, Json<Value>) {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": { "message": "Invalid Signature" } })),
            )
        }

        /// Serves a stand-in for the provider API and returns a store
        /// pointed at it.
        async fn serve(cloud_name: &str) -> CloudinaryStore {
            let app = Router::new()
                .route("/v1_1/demo/raw/upload", post(upload))
                .route("/v1_1/demo/raw/destroy", post(destroy))
                .route("/v1_1/revoked/raw/upload", post(rejected))
                .route("/v1_1/revoked/raw/destroy", post(rejected));

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            CloudinaryStore::new(
                CloudinaryConfig {
                    cloud_name: cloud_name.to_string(),
                    api_key: "1234".to_string(),
                    api_secret: "shh".to_string(),
                    api_base_url: Some(format!("http://{addr}")),
                    delivery_base_url: None,
                },
                Duration::from_secs(5),
            )
            .unwrap()
        }

        #[tokio::test]
        async fn test_put_returns_assigned_public_id() {
            let store = serve("demo").await;
            let public_id = store
                .put("documents/1/report", "report.pdf", Bytes::from_static(b"%PDF-1.7"))
                .await
                .unwrap();
            assert_eq!(public_id, "documents/1/assigned");
        }

        #[tokio::test]
        async fn test_delete_treats_absent_object_as_done() {
            let store = serve("demo").await;
            assert!(store.delete("documents/1/report").await.unwrap());
            assert!(!store.delete("documents/1/gone").await.unwrap());
            assert!(matches!(
                store.delete("documents/1/locked").await,
                Err(StorageError::Provider { status: 200, .. })
            ));
        }

        #[tokio::test]
        async fn test_error_responses_carry_provider_message() {
            let store = serve("revoked").await;

            match store
                .put("documents/1/report", "report.pdf", Bytes::from_static(b"%PDF-1.7"))
                .await
            {
                Err(StorageError::Provider { status, message }) => {
                    assert_eq!(status, 401);
                    assert_eq!(message, "Invalid Signature");
                }
                other => panic!("expected provider error, got {other:?}"),
            }

            assert!(matches!(
                store.delete("documents/1/report").await,
                Err(StorageError::Provider { status: 401, .. })
            ));
        }
    }

    #[test]
    fn test_custom_base_urls() {
        let store = CloudinaryStore::new(
            CloudinaryConfig {
                cloud_name: "demo".to_string(),
                api_key: "1234".to_string(),
                api_secret: "shh".to_string(),
                api_base_url: Some("http://127.0.0.1:9000/".to_string()),
                delivery_base_url: Some("http://127.0.0.1:9001".to_string()),
            },
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(
            store.api_url("upload"),
            "http://127.0.0.1:9000/v1_1/demo/raw/upload"
        );
        assert_eq!(
            store.url("k").unwrap(),
            "http://127.0.0.1:9001/demo/raw/upload/k"
        );
    }
}
