mod cli;
mod config;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use rk_av::{Encoder, FfmpegEncoder, ToolRegistry};
use rk_core::config::Config;
use rk_db::pool::{get_conn, init_pool_with_size, open_pool_with_size, reset_database};
use rk_db::TxnManager;
use rk_generate::{
    generate_markers, ArtifactPaths, ArtifactStore, BatchTarget, GenerateOptions,
    GenerateSettings, GenerateSummary, GenerationContext,
};
use tokio_util::sync::CancellationToken;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "reelkeep=trace,rk_generate=trace,rk_av=debug,rk_db=debug,rk_core=debug".to_string()
        } else {
            "reelkeep=info,rk_generate=info,rk_av=info,rk_db=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::GenerateMarkers {
            scene,
            marker,
            overwrite,
            dry_run,
            json,
        } => {
            let target = match (scene, marker) {
                (Some(id), _) => BatchTarget::Scene(id),
                (None, Some(id)) => BatchTarget::Marker(id),
                (None, None) => BatchTarget::All,
            };
            let options = GenerateMarkersArgs {
                target,
                overwrite,
                dry_run,
                json,
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_generate_markers(cli.config.as_deref(), options))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::ResetDb { yes } => reset_db(cli.config.as_deref(), yes),
        Commands::Version => {
            println!("reelkeep {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

struct GenerateMarkersArgs {
    target: BatchTarget,
    overwrite: bool,
    dry_run: bool,
    json: bool,
}

fn open_database(config: &Config) -> Result<TxnManager> {
    let path = &config.database.path;
    tracing::info!("Opening database at {}", path.display());
    let pool = init_pool_with_size(path, config.database.max_connections)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    Ok(TxnManager::new(pool))
}

/// Open the database only if it already exists; counting must not create
/// or migrate it.
fn open_existing_database(config: &Config) -> Result<Option<TxnManager>> {
    let path = &config.database.path;
    match open_pool_with_size(path, config.database.max_connections) {
        Ok(pool) => Ok(Some(TxnManager::new(pool))),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err::<Option<TxnManager>, _>(e)
            .with_context(|| format!("Failed to open database {}", path.display())),
    }
}

async fn run_generate_markers(config_path: Option<&Path>, args: GenerateMarkersArgs) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let txn = if args.dry_run {
        match open_existing_database(&config)? {
            Some(txn) => txn,
            None => {
                tracing::info!(
                    "No database at {}; nothing to generate",
                    config.database.path.display()
                );
                return report_summary(&GenerateSummary::default(), &args);
            }
        }
    } else {
        open_database(&config)?
    };

    let registry = ToolRegistry::discover(&config.tools);
    let timeout = config.generate.encode_timeout();
    let encoder: Arc<dyn Encoder> = match FfmpegEncoder::from_registry(&registry, timeout) {
        Ok(encoder) => Arc::new(encoder),
        // Counting needs no encoder.
        Err(_) if args.dry_run => Arc::new(FfmpegEncoder::new("ffmpeg", timeout)),
        Err(e) => return Err(e.into()),
    };

    let ctx = GenerationContext::new(
        txn,
        ArtifactStore::new(ArtifactPaths::from_config(&config.paths)),
        encoder,
        GenerateSettings::from_config(&config.generate),
    );
    let options = GenerateOptions {
        target: args.target,
        overwrite: args.overwrite,
        dry_run: args.dry_run,
        concurrency: config.generate.concurrency(),
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; finishing running tasks");
            on_signal.cancel();
        }
    });

    let summary = generate_markers(&ctx, &options, cancel).await?;
    report_summary(&summary, &args)
}

fn report_summary(summary: &GenerateSummary, args: &GenerateMarkersArgs) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        print_summary(summary, args.dry_run);
    }
    Ok(())
}

fn print_summary(summary: &GenerateSummary, dry_run: bool) {
    if dry_run {
        println!(
            "[DRY RUN] {} marker artifacts to generate across {} tasks",
            summary.outstanding, summary.tasks
        );
        return;
    }

    println!("Marker generation complete");
    println!("  Tasks:      {}", summary.tasks);
    println!("  Attempted:  {}", summary.attempted);
    println!("  Generated:  {}", summary.generated);
    println!("  Skipped:    {}", summary.skipped);
    println!("  Failed:     {}", summary.failed);
    if summary.aborted > 0 {
        println!("  Aborted tasks:   {}", summary.aborted);
    }
    if summary.cancelled > 0 {
        println!("  Cancelled tasks: {}", summary.cancelled);
    }
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    println!("Checking external tools...\n");

    let registry = ToolRegistry::discover(&config.tools);
    let mut all_ok = true;

    for tool in registry.check_all() {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);
        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }
        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }
        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Marker generation needs ffmpeg.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let (config, source) = match path {
        Some(p) => (config::load_config(p)?, p.display().to_string()),
        None => match config::find_config() {
            Some(p) => (config::load_config(&p)?, p.display().to_string()),
            None => (Config::default(), "defaults".to_string()),
        },
    };

    println!("Validating config: {source}");
    let warnings = config.validate();
    if warnings.is_empty() {
        println!("✓ Configuration is valid");
    } else {
        for warning in &warnings {
            println!("⚠ {warning}");
        }
    }
    println!("  Database: {}", config.database.path.display());
    println!("  Generated root: {}", config.paths.generated.display());
    println!("  Parallel tasks: {}", config.generate.concurrency());
    println!("  Marker width: {}", config.generate.marker_width);
    println!("  Hash algorithm: {}", config.generate.hash_algorithm);

    Ok(())
}

fn reset_db(config_path: Option<&Path>, yes: bool) -> Result<()> {
    if !yes {
        anyhow::bail!("Refusing to reset the database without --yes");
    }
    let config = config::load_config_or_default(config_path)?;
    let txn = open_database(&config)?;
    let conn = get_conn(txn.pool())?;
    reset_database(&conn)?;
    println!("Database reset: {}", config.database.path.display());
    Ok(())
}
