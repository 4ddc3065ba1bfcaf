use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use docvault::auth::PasswordHasher;
use docvault::config::ServerConfig;
use docvault::server::{AppState, create_router};
use docvault::service::accounts::{self, Registration};
use docvault::service::format::human_size;
use docvault::store::{SqliteStore, Store};

const NOT_INITIALIZED: &str =
    "Data directory not initialized. Run 'docvault admin init' first to create the config and database.";

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "docvault")]
#[command(about = "A personal document vault", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to (overrides the config file)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides the config file)
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory holding docvault.toml, the database and local objects
        #[arg(long, env = "DOCVAULT_DATA_DIR", default_value = "./data")]
        data_dir: PathBuf,

        /// Public base URL for external access (e.g., "https://docs.example.com").
        /// Prefixes local media URLs.
        #[arg(long)]
        public_base_url: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the data directory (write default config and create database)
    Init {
        /// Data directory holding docvault.toml, the database and local objects
        #[arg(long, env = "DOCVAULT_DATA_DIR", default_value = "./data")]
        data_dir: PathBuf,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Show configuration and usage counts
    Info {
        /// Data directory holding docvault.toml, the database and local objects
        #[arg(long, env = "DOCVAULT_DATA_DIR", default_value = "./data")]
        data_dir: PathBuf,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
}

fn run_init(data_dir: PathBuf, non_interactive: bool) -> anyhow::Result<()> {
    fs::create_dir_all(&data_dir)?;

    let config = ServerConfig {
        data_dir,
        ..ServerConfig::default()
    };

    if config.config_path().exists() {
        bail!(
            "Already initialized. Config exists at: {}",
            config.config_path().display()
        );
    }

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    config.save()?;

    #[cfg(unix)]
    set_restrictive_permissions(&config.config_path());

    println!();
    println!("========================================");
    println!("Initialized docvault in {}", config.data_dir.display());
    println!();
    println!("  config:   {}", config.config_path().display());
    println!("  database: {}", config.db_path().display());
    println!("  storage:  {}", config.storage.name());
    println!();
    println!("Edit the config to switch storage backends or limits.");
    println!("========================================");
    println!();

    if !non_interactive {
        create_staff_user_prompt(&store)?;
    }

    Ok(())
}

fn create_staff_user_prompt(store: &SqliteStore) -> anyhow::Result<()> {
    let create_user = inquire::Confirm::new("Would you like to create a staff account?")
        .with_default(false)
        .prompt()?;

    if !create_user {
        return Ok(());
    }

    let not_blank = |input: &str| -> Result<inquire::validator::Validation, inquire::CustomUserError> {
        if input.trim().is_empty() {
            Ok(inquire::validator::Validation::Invalid(
                "This field cannot be empty".into(),
            ))
        } else {
            Ok(inquire::validator::Validation::Valid)
        }
    };

    let email = inquire::Text::new("Email:")
        .with_validator(not_blank)
        .prompt()?;
    let first_name = inquire::Text::new("First name:")
        .with_validator(not_blank)
        .prompt()?;
    let last_name = inquire::Text::new("Last name:")
        .with_validator(not_blank)
        .prompt()?;
    let password = inquire::Password::new("Password:").prompt()?;

    let user = accounts::register(
        store,
        &PasswordHasher::new(),
        &Registration {
            first_name,
            last_name,
            email,
            password,
            password_confirm: None,
            is_staff: true,
        },
    )?;

    println!();
    println!("Created staff account '{}' (id {}).", user.email, user.id);
    println!();

    Ok(())
}

fn run_info(data_dir: &Path, as_json: bool) -> anyhow::Result<()> {
    let config = load_config(data_dir)?;
    let store = SqliteStore::new(config.db_path())?;

    let users = store.count_users()?;
    let documents = store.count_documents()?;

    if as_json {
        let info = json!({
            "data_dir": config.data_dir,
            "database": config.db_path(),
            "storage": config.storage.name(),
            "max_upload_bytes": config.max_upload_bytes,
            "max_files_per_upload": config.max_files_per_upload,
            "users": users,
            "documents": documents,
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("Data directory:   {}", config.data_dir.display());
        println!("Database:         {}", config.db_path().display());
        println!("Storage backend:  {}", config.storage.name());
        println!(
            "Upload limit:     {} per file, {} files per upload",
            human_size(config.max_upload_bytes),
            config.max_files_per_upload
        );
        println!("Users:            {users}");
        println!("Documents:        {documents}");
    }

    Ok(())
}

fn load_config(data_dir: &Path) -> anyhow::Result<ServerConfig> {
    if !data_dir.join(docvault::config::CONFIG_FILE).exists() {
        bail!(NOT_INITIALIZED);
    }
    Ok(ServerConfig::load(data_dir)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("docvault=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
            } => {
                run_init(data_dir, non_interactive)?;
            }
            AdminCommands::Info { data_dir, json } => {
                run_info(&data_dir, json)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
            public_base_url,
        } => {
            let mut config = load_config(&data_dir)?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if public_base_url.is_some() {
                config.public_base_url = public_base_url;
            }

            let store = SqliteStore::new(config.db_path())?;
            store.initialize()?;

            info!(
                "Storage backend: {}, upload limit: {}",
                config.storage.name(),
                human_size(config.max_upload_bytes)
            );

            let addr = config.socket_addr()?;
            let state = Arc::new(AppState::from_config(Arc::new(store), config)?);
            let app = create_router(state);

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
