//! gradewatch binary.
//!
//! Reads `gradewatch.toml` (or the path given with `--config`), opens the
//! SQLite snapshot store and polls every configured user on a fixed
//! interval. With an `[http]` table the admin API is served alongside.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `http.admin_password_hash`:
//!
//! ```text
//! cargo run -p gradewatch-sync --bin gradewatch -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use gradewatch_store_sqlite::SqliteStore;
use gradewatch_sync::{
  GradeFetcher, Poller, SessionManager,
  config::Settings,
  notify::{ConfiguredNotifier, LogNotifier, WebhookNotifier},
};
use gradewatch_upstream::GraphqlClient;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Student grade poller")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "gradewatch.toml")]
  config: PathBuf,

  /// Run a single cycle for every user, print the reports and exit.
  #[arg(long)]
  once: bool,

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
    let password = read_password_line()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let settings = Settings::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;
  if settings.users.is_empty() {
    tracing::warn!("no users configured; nothing to poll");
  }

  let store_path = expand_tilde(&settings.store_path);
  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let upstream = Arc::new(
    GraphqlClient::new(settings.upstream.clone()).context("failed to build upstream client")?,
  );
  let notifier = match &settings.notifier.webhook_url {
    Some(url) => ConfiguredNotifier::Webhook(
      WebhookNotifier::new(url, Duration::from_secs(settings.upstream.timeout_secs))
        .context("failed to build webhook client")?,
    ),
    None => ConfiguredNotifier::Log(LogNotifier),
  };

  let poller = Arc::new(
    Poller::new(
      SessionManager::new(Arc::clone(&upstream)),
      GradeFetcher::new(Arc::clone(&upstream), settings.fallback_term_ids.clone()),
      Arc::new(store),
      Arc::new(notifier),
      Some(settings.credentials()),
      settings.usernames(),
    )
    .with_policy(settings.diff_policy())
    .with_settings(settings.poller_settings()),
  );

  if cli.once {
    let reports = poller.run_all().await;
    println!(
      "{}",
      serde_json::to_string_pretty(&reports).context("failed to encode reports")?
    );
    return Ok(());
  }

  let server = match &settings.http {
    Some(http) => {
      let app = gradewatch_api::api_router(Arc::clone(&poller), settings.auth_config())
        .layer(TraceLayer::new_for_http());
      let address = format!("{}:{}", http.host, http.port);
      let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
      tracing::info!("admin API listening on http://{address}");
      Some(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
          tracing::error!(error = %e, "admin API stopped");
        }
      }))
    }
    None => None,
  };

  poller.run(shutdown_signal()).await;
  if let Some(server) = server {
    server.abort();
  }
  Ok(())
}

async fn shutdown_signal() {
  match tokio::signal::ctrl_c().await {
    Ok(()) => tracing::info!("shutdown requested"),
    Err(e) => {
      tracing::error!(error = %e, "cannot listen for ctrl-c; running until killed");
      std::future::pending::<()>().await;
    }
  }
}

/// Read one password line from stdin. The terminal echoes what is typed.
fn read_password_line() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
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
