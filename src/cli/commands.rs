//! CLI command definitions for imgforge.
//!
//! This module provides the command-line interface for running the
//! preprocessing pipeline on a selection descriptor, packing image
//! directories into archives, and inspecting the result cache.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use crate::cache::{result_key, MemoryCache, RedisCache, ResultCache};
use crate::config::PipelineConfig;
use crate::pipeline::{ManifestProcessor, PipelineRunner, TaskStatus};
use crate::select::{pack_tar, pack_zip, FileSelection};
use crate::service::TaskService;

/// Image preprocessing pipeline for cached gallery results.
#[derive(Parser)]
#[command(name = "imgforge")]
#[command(about = "Stage image selections and cache processed results")]
#[command(version)]
#[command(
    long_about = "imgforge stages a file selection (zip or tar archive, directory, or image list),\nfilters it to valid images, and caches the processed result under the task's key.\n\nExample usage:\n  imgforge run --selection selection.json --image-dir /srv/images --output result.json"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the preprocessing pipeline on a selection descriptor.
    Run(RunArgs),

    /// Pack a directory into a zip or tar archive.
    Pack(PackArgs),

    /// Inspect or clear cached results.
    Cache(CacheArgs),
}

/// Arguments for the run command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the selection descriptor JSON ("-" reads stdin).
    #[arg(short = 's', long, default_value = "-")]
    pub selection: String,

    /// Root of the image store.
    #[arg(long, env = "IMAGE_DIR")]
    pub image_dir: Option<String>,

    /// Staging directory root.
    #[arg(long, env = "STAGING_DIR")]
    pub staging_dir: Option<String>,

    /// Result expiry in seconds for selections that carry none.
    #[arg(long, env = "CACHE_DURATION")]
    pub cache_duration: Option<u64>,

    /// Redis endpoint for the result cache (in-process cache when unset).
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Write the cached result blob to this file on success.
    #[arg(short = 'o', long)]
    pub output: Option<String>,

    /// Print status records as JSON lines.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for the pack command.
#[derive(Parser, Debug)]
pub struct PackArgs {
    /// Directory whose contents will be packed.
    #[arg(short = 'i', long)]
    pub input: String,

    /// Output archive path (.zip, .tar, .tar.gz or .tgz).
    #[arg(short = 'o', long)]
    pub output: String,
}

/// Arguments for the cache command group.
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Cache subcommand to run.
    #[command(subcommand)]
    pub command: CacheSubcommand,
}

/// Cache subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum CacheSubcommand {
    /// Print the cached result for a task.
    Get(CacheGetArgs),

    /// Remove the cached result for a task.
    #[command(alias = "rm")]
    Del(CacheDelArgs),
}

/// Arguments for `imgforge cache get`.
#[derive(Parser, Debug)]
pub struct CacheGetArgs {
    /// Raw task name the result was cached under.
    #[arg(short = 't', long)]
    pub task: String,

    /// Redis endpoint holding the result cache.
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Write the blob to this file instead of stdout.
    #[arg(short = 'o', long)]
    pub output: Option<String>,
}

/// Arguments for `imgforge cache del`.
#[derive(Parser, Debug)]
pub struct CacheDelArgs {
    /// Raw task name the result was cached under.
    #[arg(short = 't', long)]
    pub task: String,

    /// Redis endpoint holding the result cache.
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
///
/// This is a convenience function that parses CLI args and runs the command.
/// For more control over logging initialization, use `parse_cli()` and `run_with_cli()`.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
///
/// This is the main entry point for the imgforge CLI.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => {
            run_run_command(args).await?;
        }
        Commands::Pack(args) => {
            run_pack_command(args).await?;
        }
        Commands::Cache(args) => match args.command {
            CacheSubcommand::Get(args) => {
                run_cache_get_command(args).await?;
            }
            CacheSubcommand::Del(args) => {
                run_cache_del_command(args).await?;
            }
        },
    }
    Ok(())
}

// ============================================================================
// Run Command Implementation
// ============================================================================

async fn run_run_command(args: RunArgs) -> anyhow::Result<()> {
    let selection = load_selection(&args.selection)?;
    let config = resolve_config(&args)?;

    let cache: Arc<dyn ResultCache> = match &config.redis_url {
        Some(url) => {
            info!(redis = %url, "Using Redis result cache");
            Arc::new(RedisCache::connect(url).await?)
        }
        None => {
            info!("Using in-process result cache");
            Arc::new(MemoryCache::new())
        }
    };

    let runner = PipelineRunner::new(config, Arc::new(ManifestProcessor), Arc::clone(&cache));
    let service = TaskService::new(runner);

    let task_name = selection.name.clone();
    let run_id = service.submit(selection);
    if !args.json {
        println!("Submitted run {} for task '{}'", run_id, task_name);
    }

    let mut follower = service
        .follow(&run_id)
        .ok_or_else(|| anyhow::anyhow!("Run {} was not registered", run_id))?;

    let terminal = loop {
        let latest = follower.borrow().clone();
        print_status(&latest, args.json)?;
        if latest.is_terminal() {
            break latest;
        }
        if follower.changed().await.is_err() {
            break follower.borrow().clone();
        }
    };

    match terminal {
        TaskStatus::Success { task, .. } => {
            if let Some(path) = &args.output {
                match cache.get(&result_key(&task)).await? {
                    Some(blob) => {
                        fs::write(path, &blob)?;
                        if !args.json {
                            println!("✓ Wrote {} bytes to {}", blob.len(), path);
                        }
                    }
                    None => {
                        warn!(task = %task, "Cached result expired before it could be written");
                    }
                }
            }
            Ok(())
        }
        TaskStatus::Failure { kind, message } => {
            anyhow::bail!("Run failed [{}]: {}", kind, message)
        }
        other => {
            anyhow::bail!("Run ended without a terminal record: {:?}", other)
        }
    }
}

/// Build the pipeline configuration from the environment and CLI overrides.
fn resolve_config(args: &RunArgs) -> anyhow::Result<PipelineConfig> {
    let mut config = PipelineConfig::from_env()?;
    if let Some(dir) = &args.image_dir {
        config = config.with_image_dir(dir);
    }
    if let Some(dir) = &args.staging_dir {
        config = config.with_staging_root(dir);
    }
    if let Some(secs) = args.cache_duration {
        config = config.with_default_cache_ttl(Duration::from_secs(secs));
    }
    if let Some(url) = &args.redis_url {
        config = config.with_redis_url(url);
    }
    config.validate()?;
    Ok(config)
}

/// Read a selection descriptor from a file or stdin.
fn load_selection(source: &str) -> anyhow::Result<FileSelection> {
    let content = if source == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(source)
            .map_err(|e| anyhow::anyhow!("Failed to read selection file {}: {}", source, e))?
    };

    serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse selection descriptor: {}", e))
}

fn print_status(status: &TaskStatus, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(status)?);
        return Ok(());
    }

    match status {
        TaskStatus::Pending => println!("  PENDING"),
        TaskStatus::Progress {
            step,
            step_num,
            step_total,
            substeps,
        } => {
            if *substeps > 0 {
                println!(
                    "  [{}/{}] {} ({} items)",
                    step_num, step_total, step, substeps
                );
            } else {
                println!("  [{}/{}] {}", step_num, step_total, step);
            }
        }
        TaskStatus::Success {
            task, autodownload, ..
        } => {
            println!("✓ Task '{}' complete (autodownload: {})", task, autodownload);
        }
        TaskStatus::Failure { .. } => {}
    }
    Ok(())
}

// ============================================================================
// Pack Command Implementation
// ============================================================================

async fn run_pack_command(args: PackArgs) -> anyhow::Result<()> {
    let input = Path::new(&args.input);
    if !input.is_dir() {
        anyhow::bail!("Input directory does not exist: {}", args.input);
    }

    let output = Path::new(&args.output);
    let name = output.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let entries = if name.ends_with(".zip") {
        pack_zip(input, output)?
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        pack_tar(input, output, true)?
    } else if name.ends_with(".tar") {
        pack_tar(input, output, false)?
    } else {
        anyhow::bail!(
            "Unsupported archive extension: {} (expected .zip, .tar, .tar.gz or .tgz)",
            args.output
        );
    };

    println!("✓ Packed {} entries into {}", entries, args.output);
    Ok(())
}

// ============================================================================
// Cache Command Implementation
// ============================================================================

async fn run_cache_get_command(args: CacheGetArgs) -> anyhow::Result<()> {
    let cache = connect_cache(args.redis_url).await?;
    let key = result_key(&args.task);

    match cache.get(&key).await? {
        Some(blob) => {
            if let Some(path) = &args.output {
                fs::write(path, &blob)?;
                println!("✓ Wrote {} bytes to {}", blob.len(), path);
            } else {
                match std::str::from_utf8(&blob) {
                    Ok(text) => println!("{}", text),
                    Err(_) => anyhow::bail!(
                        "Cached result for '{}' is not valid UTF-8; use --output to save it",
                        args.task
                    ),
                }
            }
        }
        None => {
            println!("No cached result under {}", key);
        }
    }
    Ok(())
}

async fn run_cache_del_command(args: CacheDelArgs) -> anyhow::Result<()> {
    let cache = connect_cache(args.redis_url).await?;
    let key = result_key(&args.task);
    cache.remove(&key).await?;
    println!("✓ Removed {}", key);
    Ok(())
}

async fn connect_cache(redis_url: Option<String>) -> anyhow::Result<RedisCache> {
    let Some(url) = redis_url else {
        anyhow::bail!(
            "REDIS_URL is required but not set.\n\
             Provide it via --redis-url <URL> or set the REDIS_URL environment variable."
        );
    };
    Ok(RedisCache::connect(&url).await?)
}
