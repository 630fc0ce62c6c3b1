use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, TimeZone, Utc};
use clap::{Parser, Subcommand};
use identity::{LocalIdentityProvider, Registration};
use policy::{Decision, Denial, SensitivityClass};
use server::{AppState, Config, Error, Result, build_router};
use storage::Store;
use tracing::info;
use tracing_subscriber::EnvFilter;

const CONFIG_FILE: &str = "carekeeper.toml";
const DB_FILE: &str = "carekeeper.db";

#[derive(Parser)]
#[command(name = "carekeeper")]
#[command(about = "Medication, appointment and panic-alert service for elderly users", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve,
    /// List accounts with their access status
    Users {
        /// Show only the first N accounts
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },
    /// Create an administrator account
    CreateAdmin {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        full_name: String,
        /// Falls back to CAREKEEPER_ADMIN_PASSWORD
        #[arg(short, long)]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,carekeeper=debug,server=debug,tower_http=info".into()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Serve) | None => cmd_serve(config).await,
        Some(Commands::Users { limit }) => cmd_users(&config, limit),
        Some(Commands::CreateAdmin {
            username,
            full_name,
            password,
        }) => cmd_create_admin(&config, username, full_name, password),
    }
}

async fn cmd_serve(config: Config) -> Result<()> {
    let addr = config.bind_addr(std::env::var("PORT").ok().as_deref())?;
    let db_path = database_path(&config)?;
    let store = Store::open(&db_path)?.shared();
    info!(path = %db_path.display(), "opened database");

    let provider = LocalIdentityProvider::new(
        store.clone(),
        config.session_ttl(),
        config.trial_period(),
    );
    let state = AppState::new(store, Arc::new(provider))?
        .with_resolve_timeout(config.resolve_timeout())
        .with_body_limit(config.server.body_limit_bytes);
    info!(routes = state.routes.len(), "route table loaded");

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

fn cmd_users(config: &Config, limit: usize) -> Result<()> {
    let store = Store::open(database_path(config)?)?;
    let users = store.list_users()?;

    if users.is_empty() {
        println!("No accounts found.");
        return Ok(());
    }

    println!(
        "{:<6}  {:<20}  {:<6}  {:<18}  STATUS",
        "ID", "USERNAME", "ROLE", "SUBSCRIPTION END"
    );
    println!("{}", "-".repeat(72));

    let now = Utc::now();
    for user in users.into_iter().take(limit) {
        let ends = Local
            .from_utc_datetime(&user.subscription_end.naive_utc())
            .format("%Y-%m-%d %H:%M");
        let decision =
            policy::evaluate(Some(&user.principal()), SensitivityClass::StandardGated, now);
        let status = match decision {
            Decision::Allow => "active",
            Decision::Deny(Denial::Blocked) => "blocked",
            Decision::Deny(Denial::SubscriptionExpired) => "expired",
            Decision::Deny(_) => "denied",
        };
        println!(
            "{:<6}  {:<20}  {:<6}  {:<18}  {status}",
            user.id, user.username, user.role, ends
        );
    }

    Ok(())
}

fn cmd_create_admin(
    config: &Config,
    username: String,
    full_name: String,
    password: Option<String>,
) -> Result<()> {
    let password = password
        .or_else(|| std::env::var("CAREKEEPER_ADMIN_PASSWORD").ok())
        .filter(|p| !p.is_empty())
        .ok_or(Error::MissingPassword)?;

    let store = Store::open(database_path(config)?)?.shared();
    let provider = LocalIdentityProvider::new(store, config.session_ttl(), config.trial_period());
    let admin = provider.create_administrator(&Registration {
        username,
        password,
        full_name,
    })?;

    println!("Created administrator {} (id {})", admin.username, admin.id);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Ok(Config::load(path)?),
        None if Path::new(CONFIG_FILE).exists() => Ok(Config::load(CONFIG_FILE)?),
        None => Ok(Config::default()),
    }
}

fn database_path(config: &Config) -> Result<PathBuf> {
    let path = match &config.storage.path {
        Some(path) => path.clone(),
        None => dirs_data_dir().ok_or(Error::NoDataDir)?.join(DB_FILE),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(path)
}

fn dirs_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share/carekeeper"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
            .map(|p| p.join("carekeeper"))
    }
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|h| PathBuf::from(h).join("carekeeper"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}
