//! # DocVault
//!
//! A personal document vault: accounts, categories and uploaded documents
//! whose bytes live in a configurable object store. Usable both as a
//! standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! docvault = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::Path;
//! use docvault::config::ServerConfig;
//! use docvault::server::{AppState, create_router};
//! use docvault::store::{SqliteStore, Store};
//!
//! let config = ServerConfig::load(Path::new("./data")).unwrap();
//! let store = SqliteStore::new(config.db_path()).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::from_config(Arc::new(store), config).unwrap());
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `docvault` binary. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod server;
pub mod service;
pub mod storage;
pub mod store;
pub mod types;
