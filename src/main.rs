//! blobdb CLI - Command line interface for blobdb
//!
//! Stores files by content hash and resolves them by hash or by secondary
//! id. Every command prints a JSON status object, so the tool is easy to
//! wrap from scripts.

use anyhow::Context;
use blobdb::{BlobStore, CliConfig, ContentHash, Handle};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Store root used when neither --root nor the config file names one
const DEFAULT_ROOT: &str = ".blobdb";

#[derive(Parser)]
#[command(name = "blobdb")]
#[command(about = "A content-addressed blob store")]
#[command(version)]
struct Cli {
    /// Path to the store root directory [default: .blobdb]
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Path to the config file (defaults to ~/.config/blobdb/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format (json or text)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    /// Log store operations to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a file (or stdin) and print its hash
    Put {
        /// File to store; reads stdin when omitted
        file: Option<PathBuf>,
        /// Also register this secondary id for the blob
        #[arg(short, long)]
        id: Option<String>,
    },

    /// Show size and location of a blob
    Get {
        /// The content hash
        hash: String,
    },

    /// Write a blob's bytes to stdout
    Cat {
        /// The content hash
        hash: String,
    },

    /// Delete a blob
    Delete {
        /// The content hash
        hash: String,
    },

    /// Register a secondary id for a stored blob
    Alias {
        /// The content hash
        hash: String,
        /// The secondary id
        id: String,
    },

    /// Look up a blob by secondary id
    Resolve {
        /// The secondary id
        id: String,
    },

    /// Remove a secondary id
    Unalias {
        /// The secondary id
        id: String,
    },

    /// Re-hash a blob and check it matches its name
    Verify {
        /// The content hash
        hash: String,
    },

    /// Print the on-disk path for a hash, stored or not
    Path {
        /// The content hash
        hash: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => {
            CliConfig::load(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => CliConfig::load_default().context("loading default config")?,
    };
    let root = cli
        .root
        .clone()
        .or(config.root.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT));

    let store = BlobStore::open_with_config(&root, config.store.clone())
        .with_context(|| format!("opening store at {}", root.display()))?;

    match cli.command {
        Commands::Put { file, id } => {
            let handle = match file {
                Some(path) => {
                    let file = File::open(&path)
                        .with_context(|| format!("opening {}", path.display()))?;
                    store.put(file)?
                }
                None => store.put(io::stdin().lock())?,
            };
            if let Some(id) = &id {
                handle.add_secondary_id(id)?;
            }
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "hash": handle.hash().to_hex(),
                    "size": handle.size(),
                    "id": id
                }),
            );
        }

        Commands::Get { hash } => {
            let hash = parse_hash(&hash)?;
            match store.get(&hash) {
                Ok(handle) => output(&cli.format, &describe(&handle)),
                Err(e) if e.is_not_found() => not_found(&cli.format, &hash.to_hex()),
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Cat { hash } => {
            let hash = parse_hash(&hash)?;
            match store.get(&hash) {
                Ok(handle) => {
                    let mut file = handle.open()?;
                    let mut stdout = io::stdout().lock();
                    io::copy(&mut file, &mut stdout)?;
                    stdout.flush()?;
                }
                Err(e) if e.is_not_found() => not_found(&cli.format, &hash.to_hex()),
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Delete { hash } => {
            let hash = parse_hash(&hash)?;
            store.delete(&hash)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "hash": hash.to_hex()
                }),
            );
        }

        Commands::Alias { hash, id } => {
            let hash = parse_hash(&hash)?;
            match store.get(&hash) {
                Ok(handle) => {
                    handle.add_secondary_id(&id)?;
                    output(
                        &cli.format,
                        &serde_json::json!({
                            "status": "ok",
                            "hash": hash.to_hex(),
                            "id": id
                        }),
                    );
                }
                Err(e) if e.is_not_found() => not_found(&cli.format, &hash.to_hex()),
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Resolve { id } => match store.find_by_secondary_id(&id) {
            Ok(Some(handle)) => {
                let mut value = describe(&handle);
                value["id"] = serde_json::Value::String(id);
                output(&cli.format, &value);
            }
            Ok(None) => not_found(&cli.format, &id),
            Err(e) if e.is_not_found() => {
                output(
                    &cli.format,
                    &serde_json::json!({
                        "status": "error",
                        "message": format!("Secondary id {} points at a deleted blob", id)
                    }),
                );
                std::process::exit(1);
            }
            Err(e) => return Err(e.into()),
        },

        Commands::Unalias { id } => {
            let removed = store.remove_secondary_id(&id)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "id": id,
                    "removed": removed
                }),
            );
        }

        Commands::Verify { hash } => {
            let hash = parse_hash(&hash)?;
            match store.get(&hash).and_then(|handle| handle.verify()) {
                Ok(()) => output(
                    &cli.format,
                    &serde_json::json!({
                        "status": "ok",
                        "hash": hash.to_hex()
                    }),
                ),
                Err(e) if e.is_not_found() => not_found(&cli.format, &hash.to_hex()),
                Err(blobdb::Error::Corruption(message)) => {
                    output(
                        &cli.format,
                        &serde_json::json!({
                            "status": "error",
                            "message": message
                        }),
                    );
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Path { hash } => {
            let hash = parse_hash(&hash)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "hash": hash.to_hex(),
                    "path": store.blob_path(&hash).display().to_string(),
                    "exists": store.contains(&hash)
                }),
            );
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("blobdb=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn parse_hash(s: &str) -> anyhow::Result<ContentHash> {
    ContentHash::from_hex(s).with_context(|| format!("Invalid hash: {}", s))
}

fn describe(handle: &Handle<'_>) -> serde_json::Value {
    serde_json::json!({
        "hash": handle.hash().to_hex(),
        "size": handle.size(),
        "path": handle.path().display().to_string()
    })
}

fn not_found(format: &OutputFormat, what: &str) -> ! {
    output(
        format,
        &serde_json::json!({
            "status": "error",
            "message": format!("Not found: {}", what)
        }),
    );
    std::process::exit(1);
}

fn output(format: &OutputFormat, value: &serde_json::Value) {
    match format {
        OutputFormat::Json => {
            println!("{}", value);
        }
        OutputFormat::Text => {
            println!("{:#}", value);
        }
    }
}
