//! graph-crawler CLI
//!
//! Thin wrapper over the crawl engine: loads configuration, applies flag
//! overrides and runs a crawl.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use graph_crawler::{
    error::Result,
    models::Config,
    pipeline,
    storage::LocalStorage,
};

/// graph-crawler - depth-limited link graph crawler
#[derive(Parser, Debug)]
#[command(name = "graph-crawler", version, about = "Depth-limited link graph crawler")]
struct Cli {
    /// Directory containing config.toml
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl outward from a start URL
    Crawl {
        /// Seed URL
        url: String,

        /// Maximum hop distance from the seed
        #[arg(short = 'd', long)]
        max_depth: Option<u32>,

        /// Number of workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Maximum simultaneous fetches
        #[arg(long)]
        max_fetches: Option<usize>,

        /// Retries per URL after the first attempt
        #[arg(long)]
        retries: Option<u32>,

        /// Output directory for the snapshot, edge store and stats
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate configuration
    Validate,

    /// Show what the last run wrote
    Info {
        /// Output directory to inspect (default: from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Initialize logging; `RUST_LOG` takes precedence over `level`.
fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.storage_dir.join("config.toml");
    let loaded = Config::load_if_present(&config_path);
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        loaded
            .as_ref()
            .map(|c| c.logging.level.clone())
            .unwrap_or_else(|_| "info".to_string())
    };
    init_logging(&level);

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, mut config: Config) -> Result<()> {
    match command {
        Command::Crawl {
            url,
            max_depth,
            workers,
            max_fetches,
            retries,
            output,
        } => {
            if let Some(depth) = max_depth {
                config.crawler.max_depth = depth;
            }
            if let Some(workers) = workers {
                config.crawler.max_workers = workers;
            }
            if let Some(fetches) = max_fetches {
                config.crawler.max_concurrent_fetches = fetches;
            }
            if let Some(retries) = retries {
                config.crawler.max_retries = retries;
            }
            if let Some(output) = output {
                config.storage = config.storage.with_output_dir(output);
            }

            let report = pipeline::run_crawler(Arc::new(config), &url).await?;
            if report.summary.interrupted {
                log::info!("Stopped after interrupt.");
            } else {
                log::info!("Crawl complete!");
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            config.validate()?;
            log::info!("✓ Config OK");
        }

        Command::Info { output } => {
            let storage_config = match output {
                Some(dir) => config.storage.with_output_dir(dir),
                None => config.storage,
            };
            let storage = LocalStorage::from_config(&storage_config);
            log::info!("Output directory: {}", storage.root().display());

            match storage.load_summary().await? {
                Some(summary) => {
                    log::info!("Seed: {}", summary.seed);
                    log::info!("Finished: {}", summary.end_time);
                    log::info!(
                        "Visited {} pages, {} permanent failures{}",
                        summary.visited,
                        summary.permanent_failures,
                        if summary.interrupted { " (interrupted)" } else { "" }
                    );
                }
                None => log::info!("No stats found yet."),
            }
            match storage.load_snapshot().await? {
                Some(graph) => log::info!("Snapshot holds {} pages", graph.len()),
                None => log::info!("No snapshot found yet."),
            }
        }
    }

    Ok(())
}
