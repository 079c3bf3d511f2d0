//! site-harvest main entry point
//!
//! Command-line interface for the crawl and transform stages and the
//! pipeline that runs them as child processes.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use site_harvest::config::{load_config_with_hash, validate, Config, FetchEngine};
use site_harvest::crawler::{parse_seed, run_crawl};
use site_harvest::output::print_statistics;
use site_harvest::pipeline::{ConsoleSink, Orchestrator, StageCommand, SITE_DIR_PLACEHOLDER};
use site_harvest::storage::allocate_site_dir;
use site_harvest::transform::{load_api_key, transform_site, GeminiGenerator, ENV_FILE};
use site_harvest::url::netloc;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// site-harvest: a bounded, SSRF-aware site crawler
///
/// Crawls one site breadth-first into per-page folders with a JSON manifest,
/// then optionally regenerates every page with a text model.
#[derive(Parser, Debug)]
#[command(name = "site-harvest")]
#[command(version)]
#[command(about = "A bounded, SSRF-aware site crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a site and write its pages and manifest
    Crawl(CrawlArgs),

    /// Regenerate the pages of a crawled site directory
    Transform(TransformArgs),

    /// Crawl, then transform, as two child processes
    Run {
        #[command(flatten)]
        crawl: CrawlArgs,

        #[command(flatten)]
        transform: ModelArgs,
    },
}

#[derive(Args, Debug, Clone)]
struct CrawlArgs {
    /// Seed URL
    url: String,

    /// Maximum number of pages to store
    #[arg(long)]
    max_pages: Option<u32>,

    /// Maximum link depth from the seed
    #[arg(long)]
    max_depth: Option<u32>,

    /// Exact site directory (allocated under the configured base dir when omitted)
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Page rendering engine
    #[arg(long, value_enum)]
    engine: Option<FetchEngine>,
}

#[derive(Args, Debug, Clone, Default)]
struct ModelArgs {
    /// Generative model name
    #[arg(long)]
    model: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f32>,
}

#[derive(Args, Debug, Clone)]
struct TransformArgs {
    /// Crawled site directory
    site_dir: PathBuf,

    #[command(flatten)]
    model: ModelArgs,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = load(cli.config.as_deref())?;

    match cli.command {
        Command::Crawl(args) => {
            apply_crawl_args(&mut config, &args);
            validate(&config).context("Invalid crawl options")?;
            handle_crawl(&config, args).await
        }
        Command::Transform(args) => {
            apply_model_args(&mut config, &args.model);
            validate(&config).context("Invalid transform options")?;
            handle_transform(&config, &args.site_dir).await
        }
        Command::Run { crawl, transform } => {
            apply_crawl_args(&mut config, &crawl);
            apply_model_args(&mut config, &transform);
            validate(&config).context("Invalid pipeline options")?;
            handle_run(&config, cli.config.as_deref(), crawl).await
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr; stdout carries only the statistics summary.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_harvest=info,warn"),
            1 => EnvFilter::new("site_harvest=debug,info"),
            2 => EnvFilter::new("site_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file, or the defaults when none is given
fn load(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

fn apply_crawl_args(config: &mut Config, args: &CrawlArgs) {
    if let Some(max_pages) = args.max_pages {
        config.crawler.max_pages = max_pages;
    }
    if let Some(max_depth) = args.max_depth {
        config.crawler.max_depth = max_depth;
    }
    if let Some(engine) = args.engine {
        config.crawler.engine = engine;
    }
}

fn apply_model_args(config: &mut Config, args: &ModelArgs) {
    if let Some(model) = &args.model {
        config.transform.model = model.clone();
    }
    if let Some(temperature) = args.temperature {
        config.transform.temperature = temperature;
    }
}

/// Handles the crawl subcommand
///
/// Exits 0 when the manifest status is `completed` or `partial`.
async fn handle_crawl(config: &Config, args: CrawlArgs) -> Result<ExitCode> {
    let outcome = tokio::select! {
        result = run_crawl(config, &args.url, args.output_dir) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::error!("Interrupted, no manifest written");
            return Ok(ExitCode::FAILURE);
        }
    };

    match outcome {
        Ok(outcome) => {
            print_statistics(&outcome.manifest);
            println!("Manifest: {}", outcome.manifest_path.display());

            if outcome.status().is_usable() {
                Ok(ExitCode::SUCCESS)
            } else {
                tracing::error!("Crawl failed ({})", outcome.status());
                Ok(ExitCode::FAILURE)
            }
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Handles the transform subcommand
async fn handle_transform(config: &Config, site_dir: &Path) -> Result<ExitCode> {
    let api_key = load_api_key(Path::new(ENV_FILE))?;
    let generator = GeminiGenerator::new(&config.transform, api_key)?;

    let report = tokio::select! {
        result = transform_site(site_dir, &generator) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::error!("Interrupted");
            return Ok(ExitCode::FAILURE);
        }
    };

    println!("Enhanced site: {}", report.output_dir.display());
    Ok(ExitCode::SUCCESS)
}

/// Handles the run subcommand
///
/// The site directory is allocated here so the orchestrator knows where the
/// crawl child will leave its manifest.
async fn handle_run(
    config: &Config,
    config_path: Option<&Path>,
    crawl: CrawlArgs,
) -> Result<ExitCode> {
    let seed = parse_seed(&crawl.url)?;
    let site_dir = match crawl.output_dir.clone() {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            dir
        }
        None => allocate_site_dir(&config.output.base_dir, &netloc(&seed))?,
    };

    let exe = std::env::current_exe().context("Cannot locate the site-harvest binary")?;

    let mut crawl_cmd = StageCommand::new(&exe)
        .arg("crawl")
        .arg(seed.as_str())
        .arg("--output-dir")
        .arg(site_dir.display().to_string())
        .args([
            "--max-pages".to_string(),
            config.crawler.max_pages.to_string(),
            "--max-depth".to_string(),
            config.crawler.max_depth.to_string(),
        ]);
    let mut transform_cmd = StageCommand::new(&exe)
        .arg("transform")
        .arg(SITE_DIR_PLACEHOLDER)
        .args([
            "--model".to_string(),
            config.transform.model.clone(),
            "--temperature".to_string(),
            config.transform.temperature.to_string(),
        ]);

    if let Some(engine) = crawl.engine {
        let name = match engine {
            FetchEngine::Http => "http",
            FetchEngine::Browser => "browser",
        };
        crawl_cmd = crawl_cmd.arg("--engine").arg(name);
    }
    if let Some(path) = config_path {
        let path = path.display().to_string();
        crawl_cmd = crawl_cmd.arg("--config").arg(path.clone());
        transform_cmd = transform_cmd.arg("--config").arg(path);
    }
    let orchestrator = Orchestrator::new(crawl_cmd, &site_dir, transform_cmd);
    let mut sink = ConsoleSink;

    let run = tokio::select! {
        result = orchestrator.run(&mut sink) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::error!("Interrupted");
            return Ok(ExitCode::FAILURE);
        }
    };

    tracing::info!(
        "Pipeline finished: crawl {}, transform {}",
        run.crawl.status,
        run.transform.status
    );
    for (name, record) in [("crawl", &run.crawl), ("transform", &run.transform)] {
        if let Some(error) = &record.error {
            tracing::error!("{} stage: {}", name, error);
        }
    }

    if run.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
