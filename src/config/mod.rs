mod server;

pub use server::{CONFIG_FILE, SECRET_ENV, ServerConfig, StorageConfig};
