//! dstore CLI - Command line interface for deltastore
//!
//! Each invocation opens the repository snapshot, runs one command and
//! writes the snapshot back if anything changed.

use anyhow::Context;
use clap::{Parser, Subcommand};
use deltastore::{Config, Hash, Repository};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dstore")]
#[command(about = "A content-addressed object store with delta-compressed history")]
#[command(version)]
struct Cli {
    /// Path to the repository snapshot file
    #[arg(short, long, default_value = ".dstore")]
    repo: PathBuf,

    /// Output format (json or text)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    /// Config file (defaults to ~/.config/dstore/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the delta chunk size in bytes
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Store every commit in full instead of as a delta
    #[arg(long)]
    no_delta: bool,

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
    /// Initialize a new, empty repository
    Init,

    /// Commit a new revision and move HEAD to it
    Commit {
        /// The full content of the revision
        #[arg(required_unless_present = "file")]
        content: Option<String>,
        /// Read the revision from a file instead
        #[arg(long, conflicts_with = "content")]
        file: Option<PathBuf>,
    },

    /// Store content as a standalone object without touching HEAD
    HashObject {
        content: Option<String>,
        #[arg(long, conflicts_with = "content")]
        file: Option<PathBuf>,
    },

    /// Retrieve a revision (hash, HEAD or HEAD~n)
    Get {
        reference: String,
        /// Write the raw bytes to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the current HEAD
    Head,

    /// Show the commit chain leading to a revision
    Log {
        #[arg(default_value = "HEAD")]
        reference: String,
        /// Maximum number of commits to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Describe how a revision is stored
    Inspect {
        #[arg(default_value = "HEAD")]
        reference: String,
    },

    /// Show repository statistics
    Stats,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Init => {
            if cli.repo.exists() {
                anyhow::bail!("{} already exists", cli.repo.display());
            }
            let repo = Repository::open(&cli.repo, config)?;
            repo.save()?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "message": format!("Created repository at {}", cli.repo.display())
                }),
            );
        }

        Commands::Commit { content, file } => {
            let data = read_input(content.as_deref(), file.as_deref())?;
            let repo = Repository::open(&cli.repo, config)?;
            let hash = repo.commit(&data)?;
            repo.save()?;
            let info = repo.inspect(&hash)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "hash": hash.to_hex(),
                    "kind": info.kind,
                    "size": data.len(),
                    "stored_size": info.stored_size
                }),
            );
        }

        Commands::HashObject { content, file } => {
            let data = read_input(content.as_deref(), file.as_deref())?;
            let repo = Repository::open(&cli.repo, config)?;
            let hash = repo.hash_object(&data);
            repo.save()?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "hash": hash.to_hex()
                }),
            );
        }

        Commands::Get {
            reference,
            output: out_path,
        } => {
            let repo = Repository::open(&cli.repo, config)?;
            let hash = resolve_ref(&repo, reference)?;
            let data = repo.get(&hash)?;

            if let Some(path) = out_path {
                std::fs::write(path, &data)
                    .with_context(|| format!("writing {}", path.display()))?;
                output(
                    &cli.format,
                    &serde_json::json!({
                        "status": "ok",
                        "hash": hash.to_hex(),
                        "size": data.len(),
                        "path": path.display().to_string()
                    }),
                );
            } else {
                let text = std::str::from_utf8(&data).ok();
                output(
                    &cli.format,
                    &serde_json::json!({
                        "hash": hash.to_hex(),
                        "size": data.len(),
                        "binary": text.is_none(),
                        "content": text.map(str::to_string)
                            .unwrap_or_else(|| String::from_utf8_lossy(&data).into_owned())
                    }),
                );
            }
        }

        Commands::Head => {
            let repo = Repository::open(&cli.repo, config)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "head": repo.head()
                }),
            );
        }

        Commands::Log { reference, limit } => {
            let repo = Repository::open(&cli.repo, config)?;
            let hash = resolve_ref(&repo, reference)?;
            let mut chain = repo.history(&hash)?;
            if let Some(limit) = limit {
                chain.truncate(*limit);
            }
            let items = chain
                .iter()
                .map(|h| repo.inspect(h))
                .collect::<deltastore::Result<Vec<_>>>()?;
            output(
                &cli.format,
                &serde_json::json!({
                    "count": items.len(),
                    "commits": items
                }),
            );
        }

        Commands::Inspect { reference } => {
            let repo = Repository::open(&cli.repo, config)?;
            let hash = resolve_ref(&repo, reference)?;
            output(&cli.format, &serde_json::to_value(repo.inspect(&hash)?)?);
        }

        Commands::Stats => {
            let repo = Repository::open(&cli.repo, config)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "repository": cli.repo.display().to_string(),
                    "stats": repo.stats(),
                    "config": repo.config()
                }),
            );
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dstore=info,deltastore=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let path = cli.config.clone().or_else(Config::default_path);
    let mut config = Config::load_or_default(path.as_deref()).with_context(|| match &path {
        Some(path) => format!("loading config from {}", path.display()),
        None => "loading default config".to_string(),
    })?;

    if let Some(chunk_size) = cli.chunk_size {
        config = config.with_chunk_size(chunk_size);
    }
    if cli.no_delta {
        config = config.with_delta_encoding(false);
    }
    Ok(config)
}

fn read_input(content: Option<&str>, file: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    match (content, file) {
        (Some(content), _) => Ok(content.as_bytes().to_vec()),
        (None, Some(path)) => {
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))
        }
        (None, None) => anyhow::bail!("either content or --file is required"),
    }
}

fn output(format: &OutputFormat, value: &serde_json::Value) {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string(value),
        OutputFormat::Text => serde_json::to_string_pretty(value),
    };
    match rendered {
        Ok(s) => println!("{}", s),
        Err(e) => tracing::error!("failed to render output: {}", e),
    }
}

/// Accepts a full hash, `HEAD`, or `HEAD~n`
fn resolve_ref(repo: &Repository, reference: &str) -> anyhow::Result<Hash> {
    if let Some(rest) = reference.strip_prefix("HEAD") {
        let head = repo
            .head()
            .ok_or_else(|| anyhow::anyhow!("No commits yet"))?;
        if rest.is_empty() {
            return Ok(head);
        }

        let n: usize = rest
            .strip_prefix('~')
            .ok_or_else(|| anyhow::anyhow!("Invalid reference: {}", reference))?
            .parse()?;
        return repo
            .history(&head)?
            .get(n)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Not enough commits in history"));
    }

    Hash::from_hex(reference).map_err(|_| anyhow::anyhow!("Invalid reference: {}", reference))
}
