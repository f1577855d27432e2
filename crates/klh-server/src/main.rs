//! klh-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) overlaid with
//! `KLH_*` environment variables, opens the SQLite store, and serves the
//! portal API plus the mock fixture endpoints over HTTP.
//!
//! # Password hash generation
//!
//! ```text
//! cargo run -p klh-server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use klh_api::{ApiState, auth::hash_password};
use klh_server::{ServerConfig, load_config};
use klh_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "KLH Connect campus portal server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    println!("{}", hash_password(&password)?);
    return Ok(());
  }

  let server_cfg = load_config(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let store = open_store(&server_cfg).await?;
  let state = ApiState::new(Arc::new(store))
    .with_registration_rules(server_cfg.registration_rules())
    .with_campus_offset(server_cfg.campus_offset()?);

  let app = klh_server::router(state, &server_cfg).context("failed to build router")?;
  let address = server_cfg.address();

  tracing::info!(
    mock = server_cfg.mock.enabled,
    email_domain = %server_cfg.email_domain,
    "Listening on http://{address}"
  );
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn open_store(cfg: &ServerConfig) -> anyhow::Result<SqliteStore> {
  if cfg.is_in_memory() {
    tracing::warn!("using an in-memory store; data is lost on exit");
    return SqliteStore::open_in_memory()
      .await
      .context("failed to open in-memory store");
  }
  let path = expand_tilde(&cfg.store_path);
  SqliteStore::open(&path)
    .await
    .with_context(|| format!("failed to open store at {path:?}"))
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
