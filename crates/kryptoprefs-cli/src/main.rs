//! kryptoprefs CLI - read and write encrypted preference files
//!
//! The file setup (encryption, key hash, key source) comes from
//! `kryptoprefs.json` in the storage directory, defaulting to AES-GCM with a
//! PBKDF2 passphrase key.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, warn};

use kryptoprefs::store::default_prefs_dir;
use kryptoprefs::{ConfigManager, KeyKind, KryptoBuilder, KryptoPrefs, PrefsConfig};

/// Encrypted preference files from the command line
#[derive(Parser, Debug)]
#[command(name = "kryptoprefs")]
#[command(version)]
#[command(about = "Read and write encrypted preference files")]
struct Args {
    /// Directory holding preference files and kryptoprefs.json
    #[arg(long, env = "KRYPTOPREFS_DIR")]
    dir: Option<PathBuf>,

    /// Preference file name
    #[arg(long, default_value = "prefs")]
    name: String,

    /// Salt for passphrase-based keys
    #[arg(long, env = "KRYPTOPREFS_SALT")]
    salt: Option<String>,

    /// PBKDF2 iteration count, overriding kryptoprefs.json
    #[arg(long)]
    iterations: Option<u32>,

    /// Passphrase; prompted for when needed and not given
    #[arg(long, env = "KRYPTOPREFS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the effective configuration
    Config,

    #[command(flatten)]
    Entry(EntryCommand),
}

#[derive(Subcommand, Debug)]
enum EntryCommand {
    /// Print a stored value
    Get {
        key: String,
        /// Printed when the key is not set
        #[arg(long)]
        default: Option<String>,
    },
    /// Store a value
    Put { key: String, value: String },
    /// Delete a value
    Remove { key: String },
    /// Print whether a value is stored
    Contains { key: String },
    /// Delete every value
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so values printed on stdout stay scriptable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    if let Some(output) = run(args).await? {
        println!("{}", output);
    }

    Ok(())
}

async fn run(args: Args) -> Result<Option<String>> {
    let dir = match &args.dir {
        Some(dir) => dir.clone(),
        None => default_prefs_dir()?,
    };
    let config = effective_config(&ConfigManager::new(&dir), args.iterations);

    let command = match args.command {
        Command::Config => return Ok(Some(serde_json::to_string_pretty(&config)?)),
        Command::Entry(command) => command,
    };

    let password = if config.key.needs_passphrase() {
        Some(read_password(args.password)?)
    } else {
        None
    };

    debug!("Opening '{}' in {:?}", args.name, dir);
    let prefs = KryptoBuilder::from_config(
        &dir,
        &args.name,
        &config,
        password.as_deref(),
        args.salt.as_deref(),
    )
    .await
    .with_context(|| format!("Failed to open preference file '{}'", args.name))?;

    execute(&prefs, command).await
}

fn effective_config(manager: &ConfigManager, iterations: Option<u32>) -> PrefsConfig {
    let mut config = manager.get().clone();

    if let Some(count) = iterations {
        match &mut config.key {
            KeyKind::Pbkdf2 { iterations } => *iterations = count,
            other => warn!("--iterations ignored for {:?} keys", other),
        }
    }

    config
}

fn read_password(password: Option<String>) -> Result<String> {
    match password {
        Some(password) => Ok(password),
        None => rpassword::prompt_password("Password: ").context("Failed to read password"),
    }
}

async fn execute(prefs: &KryptoPrefs, command: EntryCommand) -> Result<Option<String>> {
    match command {
        EntryCommand::Get { key, default } => {
            match prefs.get_string(&key, default.as_deref()).await? {
                Some(value) => Ok(Some(value)),
                None => anyhow::bail!("'{}' is not set", key),
            }
        }
        EntryCommand::Put { key, value } => {
            prefs.put_string(&key, Some(&value)).await?;
            Ok(None)
        }
        EntryCommand::Remove { key } => {
            prefs.remove(&key).await?;
            Ok(None)
        }
        EntryCommand::Contains { key } => Ok(Some(prefs.contains(&key).await?.to_string())),
        EntryCommand::Clear => {
            prefs.clear().await?;
            Ok(None)
        }
    }
}
