//! CLI entry point for the MLB.tv session tool.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Parser;
use mlbtv_session::{Credentials, PersistentJar, Session, SessionStore};
use tracing::{debug, info};

mod cli;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let dir = match args.dir {
        Some(dir) => dir,
        None => default_dir()?,
    };
    debug!(dir = %dir.display(), "using session directory");

    match args.command {
        Command::Login => {
            let session = build_session(args.username, args.password, &dir)?;
            session.login().await?;
            info!("logged in");
        }
        Command::Token => {
            let session = build_session(args.username, args.password, &dir)?;
            let (token, expiry) = session.access_token().await?;
            debug!(%expiry, "access token valid");
            // The token goes to stdout so it can be piped; logs go to stderr.
            println!("{token}");
        }
        Command::Status => {
            show_status(&dir)?;
        }
        Command::Destroy => {
            let store = SessionStore::new(&dir);
            store.reset()?;
            info!("session state destroyed");
        }
    }

    Ok(())
}

/// Builds a session from CLI credentials, requiring both halves.
fn build_session(
    username: Option<String>,
    password: Option<String>,
    dir: &Path,
) -> Result<Session> {
    let (Some(username), Some(password)) = (username, password) else {
        bail!(
            "username and password are required (flags --username/--password \
             or env MLBTV_USERNAME/MLBTV_PASSWORD)"
        );
    };
    Ok(Session::new(Credentials::new(username, password), dir)?)
}

/// Reports which credentials are cached, reading the stores directly so no
/// account credentials are needed.
fn show_status(dir: &Path) -> Result<()> {
    let store = SessionStore::new(dir);
    let state = store.load()?;
    let jar = PersistentJar::load(&store.cookie_path())?;

    let cached = |present: bool| if present { "cached" } else { "absent" };
    println!("session directory: {}", dir.display());
    println!("login cookies:     {}", cached(jar.value("ipid").is_some()));
    println!("api keys:          {}", cached(state.api_key.is_some()));
    println!("subject token:     {}", cached(state.token.is_some()));
    if state.has_valid_access_token(Utc::now()) {
        let expiry = state
            .access_token_expiry
            .context("valid access token always has an expiry")?;
        println!("access token:      valid until {expiry}");
    } else if state.access_token.is_some() {
        println!("access token:      expired");
    } else {
        println!("access token:      absent");
    }
    Ok(())
}

/// Default session directory under the platform config directory.
fn default_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("could not determine the platform config directory")?;
    Ok(base.join("mlbtv-session"))
}
