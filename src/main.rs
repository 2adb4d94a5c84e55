//! Command line interface for the chat. Supports initialization, serving the
//! HTTP endpoints, posting and listing through the local store, and sending
//! or watching over HTTP as a client.

mod client;
mod config;
mod error;
mod message;
mod sanitize;
mod server;
mod service;
mod storage;

use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{Parser, Subcommand};
use config::Settings;
use service::ChatService;
use storage::FileStore;

/// Command line interface entry point.
#[derive(Parser)]
#[command(name = "egchat", author, version, about = "File-backed group chat")]
struct Cli {
    /// Path to the `.env` configuration file.
    #[arg(long, default_value = ".env")]
    env: String,
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and a default `.env` file.
    Init,
    /// Launch the HTTP server.
    Serve,
    /// Append a message through the local store.
    Post {
        /// Display name to post under.
        #[arg(long)]
        name: String,
        /// Message text.
        text: String,
    },
    /// Print the stored message log once.
    List,
    /// Send a message to a running server over HTTP.
    Send {
        /// Server base URL; defaults to the configured bind address.
        #[arg(long)]
        url: Option<String>,
        /// Display name to post under.
        #[arg(long)]
        name: String,
        /// Message text.
        text: String,
    },
    /// Poll a running server and render new messages as they arrive.
    Watch {
        /// Server base URL; defaults to the configured bind address.
        #[arg(long)]
        url: Option<String>,
    },
}

/// Execute the selected CLI subcommand.
async fn run(cli: Cli) -> anyhow::Result<()> {
    ensure_env_file(&cli.env)?;
    let cfg = Settings::from_env(&cli.env)?;
    let store = FileStore::new(cfg.data_dir.clone());
    match cli.command {
        Commands::Init => {
            store.init()?;
            println!("initialized {}", cfg.data_dir.display());
        }
        Commands::Serve => {
            store.init()?;
            let addr: SocketAddr = cfg.bind_http.parse()?;
            let service = ChatService::new(Arc::new(store));
            server::serve_http(addr, service, std::future::pending()).await?;
        }
        Commands::Post { name, text } => {
            store.init()?;
            let service = ChatService::new(Arc::new(store));
            let msg = service.append_message(&name, &text)?;
            println!("posted {}", msg.id);
        }
        Commands::List => {
            let service = ChatService::new(Arc::new(store));
            for msg in service.list_messages()? {
                print!("{}", client::format_message(&msg));
            }
        }
        Commands::Send { url, name, text } => {
            let url = url.unwrap_or_else(|| format!("http://{}", cfg.bind_http));
            client::send(&url, &name, &text).await?;
        }
        Commands::Watch { url } => {
            let url = url.unwrap_or_else(|| format!("http://{}", cfg.bind_http));
            client::watch(&url, Duration::from_secs(cfg.poll_secs)).await?;
        }
    }
    Ok(())
}

/// Create a default `.env` file if one is not already present at `path`.
fn ensure_env_file(path: &str) -> anyhow::Result<()> {
    let env_path = Path::new(path);
    if env_path.exists() {
        return Ok(());
    }
    if let Some(parent) = env_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let base_dir = match env_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    let data_dir = base_dir.join("egchat-data");
    let mut content = String::new();
    content.push_str(&format!("DATA_DIR={}\n", display_path(&data_dir)));
    content.push_str("BIND_HTTP=127.0.0.1:7878\n");
    content.push_str(&format!("POLL_SECS={}\n", config::DEFAULT_POLL_SECS));
    fs::write(env_path, content)?;
    Ok(())
}

fn display_path(path: &PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    let cli = Cli::parse();
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
    run(cli).await
}
