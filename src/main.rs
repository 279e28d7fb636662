//! SpaceKV command-line front end.
//!
//! Opens one redb file and runs a single space operation against it,
//! printing the result as JSON.

use clap::{Parser, Subcommand};
use spacekv::{FindMode, RedbBackend, Space, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

/// Command-line configuration
#[derive(Debug, Parser)]
#[command(
    name = "spacekv",
    version = spacekv::VERSION,
    about = "Namespaced, TTL-aware key-value spaces"
)]
struct Config {
    /// Database file
    #[arg(long, default_value = "spacekv.redb")]
    db: PathBuf,

    /// Namespace to operate on
    #[arg(short, long, default_value = spacekv::DEFAULT_NAMESPACE)]
    namespace: String,

    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Read one key, or the whole namespace when no key is given
    Get {
        key: Option<String>,
        /// Honour expiry and evict expired keys
        #[arg(long)]
        strict: bool,
    },
    /// Store a value (parsed as JSON, otherwise taken as a string)
    Set {
        key: String,
        value: String,
        /// Expire after this many days
        #[arg(long)]
        expire_days: Option<f64>,
    },
    /// List every key, markers included
    Keys,
    /// Count rows in the namespace
    Len,
    /// Search keys by regular expression
    Find {
        pattern: String,
        /// keys, values, entries or one
        #[arg(long, default_value = "keys")]
        mode: FindMode,
    },
    /// Remove keys and their expiry markers
    Rm { keys: Vec<String> },
    /// Remove every key matching a regular expression
    RmReg { pattern: String },
    /// Remove everything in the namespace
    Clear,
    /// Evict every expired key
    Clean,
}

/// Parses a CLI value as JSON, falling back to a plain string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str::<serde_json::Value>(raw)
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(raw))
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_logging(config.verbose);

    let backend = Arc::new(RedbBackend::open(&config.db)?);
    let space = Space::new(backend, config.namespace.clone());
    debug!(db = %config.db.display(), namespace = %space.namespace(), "opened space");

    let output = run(&space, config.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

async fn run(space: &Space, command: Command) -> anyhow::Result<serde_json::Value> {
    let entries_json = |entries: spacekv::Entries| -> serde_json::Value {
        entries
            .into_iter()
            .map(|(k, v)| (k, v.into_json()))
            .collect::<serde_json::Map<_, _>>()
            .into()
    };

    let output: serde_json::Value = match command {
        Command::Get { key: None, strict } => {
            let entries = if strict {
                space.get_all_by_strict().await?
            } else {
                space.get_all().await?
            };
            entries_json(entries)
        }
        Command::Get { key: Some(key), strict } => {
            let value = if strict {
                space.get_by_strict(&key).await?
            } else {
                space.get(&key).await?
            };
            value.map(Value::into_json).unwrap_or(serde_json::Value::Null)
        }
        Command::Set {
            key,
            value,
            expire_days,
        } => {
            space.set(&key, parse_value(&value), expire_days).await?;
            serde_json::json!({ "ok": true })
        }
        Command::Keys => space.keys().await?.into(),
        Command::Len => space.length().await?.into(),
        Command::Find { pattern, mode } => space.find_by_reg(pattern, mode).await?.into_json(),
        Command::Rm { keys } => {
            space.remove_by_keys(&keys).await?;
            serde_json::json!({ "removed": keys.len() })
        }
        Command::RmReg { pattern } => {
            let removed = space.remove_by_reg(pattern).await?;
            serde_json::json!({ "removed": removed })
        }
        Command::Clear => {
            space.remove_all().await?;
            serde_json::json!({ "ok": true })
        }
        Command::Clean => {
            let evicted = space.clean_all_expire_data().await?;
            serde_json::json!({ "evicted": evicted })
        }
    };

    Ok(output)
}
