#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use docvault::config::ServerConfig;
use docvault::server::{AppState, create_router};
use docvault::store::{SqliteStore, Store};

pub const PASSWORD: &str = "correct horse battery";

const BOUNDARY: &str = "----docvault-test-boundary";

/// The full router over a throwaway data directory with local storage.
pub struct TestApp {
    pub temp_dir: TempDir,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(configure: impl FnOnce(&mut ServerConfig)) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let mut config = ServerConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        configure(&mut config);

        let store = SqliteStore::new(config.db_path()).expect("open database");
        store.initialize().expect("initialize database");

        let state = AppState::from_config(Arc::new(store), config).expect("build state");
        let router = create_router(Arc::new(state));

        Self { temp_dir, router }
    }

    pub fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn object_count(&self) -> usize {
        count_files(&self.data_dir().join("objects").join("documents"))
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn register(&self, email: &str) {
        let body = format!(
            "first_name=Test&last_name=User&email={}&password={}&password_confirm={}",
            urlencoding::encode(email),
            urlencoding::encode(PASSWORD),
            urlencoding::encode(PASSWORD),
        );
        let response = self.send(form_request("/register", &body, None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "registration failed");
        assert_eq!(location(&response), "/login?registered=1");
    }

    /// Logs in and returns the `Cookie` header value for the session.
    pub async fn login(&self, email: &str) -> String {
        let body = format!(
            "email={}&password={}",
            urlencoding::encode(email),
            urlencoding::encode(PASSWORD)
        );
        let response = self.send(form_request("/login", &body, None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "login failed");
        assert_eq!(location(&response), "/platform");
        session_cookie(&response).expect("login sets the session cookie")
    }

    pub async fn register_and_login(&self, email: &str) -> String {
        self.register(email).await;
        self.login(email).await
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        self.send(request("GET", uri, cookie, Body::empty())).await
    }

    pub async fn delete(&self, uri: &str, cookie: Option<&str>) -> Response {
        self.send(request("DELETE", uri, cookie, Body::empty())).await
    }

    pub async fn post_json(&self, uri: &str, cookie: Option<&str>, body: &Value) -> Response {
        let mut req = request("POST", uri, cookie, Body::from(body.to_string()));
        req.headers_mut().insert(
            header::CONTENT_TYPE,
            "application/json".parse().expect("static header"),
        );
        self.send(req).await
    }

    pub async fn upload(
        &self,
        cookie: Option<&str>,
        files: &[(&str, &[u8])],
        fields: &[(&str, &str)],
    ) -> Response {
        let mut req = request(
            "POST",
            "/api/documents/upload",
            cookie,
            Body::from(multipart_body(files, fields)),
        );
        req.headers_mut().insert(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}")
                .parse()
                .expect("multipart header"),
        );
        self.send(req).await
    }

    pub fn store(&self) -> SqliteStore {
        let config = ServerConfig {
            data_dir: self.data_dir().to_path_buf(),
            ..ServerConfig::default()
        };
        SqliteStore::new(config.db_path()).expect("open database")
    }

    pub fn user_count(&self) -> i64 {
        self.store().count_users().expect("count users")
    }

    pub fn document_count(&self) -> i64 {
        self.store().count_documents().expect("count documents")
    }
}

pub fn request(method: &str, uri: &str, cookie: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(body).expect("valid request")
}

pub fn form_request(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut req = request("POST", uri, cookie, Body::from(body.to_string()));
    req.headers_mut().insert(
        header::CONTENT_TYPE,
        "application/x-www-form-urlencoded"
            .parse()
            .expect("static header"),
    );
    req
}

pub fn multipart_body(files: &[(&str, &[u8])], fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (filename, data) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// The `name=value` pair of the session cookie set by a response.
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("docvault_session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body")
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}

fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .map(|p| if p.is_dir() { count_files(&p) } else { 1 })
        .sum()
}
