//! Litscout CLI - Command-line interface for automated literature reviews

mod report;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use litscout_agent::{AgentResult, ReviewEngine};
use litscout_core::{
    config_error, init_logging, ErrorContext, FileCache, LitError, ReviewConfig, ReviewTarget,
};
use litscout_llm::{RelevanceScorer, ResearchPlanner, SiumaiBackend};
use litscout_search::{CachedSearch, SemanticScholarClient, SemanticScholarConfig};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "litscout")]
#[command(about = "Automated literature review: discover and rank related work")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a literature review for a paper
    Review {
        /// Title of your paper
        #[arg(long)]
        title: String,

        /// Abstract of your paper
        #[arg(long = "abstract")]
        abstract_text: Option<String>,

        /// Read the abstract from a file instead
        #[arg(long)]
        abstract_file: Option<PathBuf>,

        /// Number of papers to include in the review
        #[arg(long)]
        num_papers: Option<usize>,

        /// Minimum relevance score for inclusion (0.0-1.0)
        #[arg(long)]
        relevance_threshold: Option<f64>,

        /// Maximum discovery iterations
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Only include papers published in or after this year
        #[arg(long)]
        start_year: Option<i32>,

        /// Only include papers published in or before this year
        #[arg(long)]
        end_year: Option<i32>,

        /// Skip citation expansion of accepted papers
        #[arg(long)]
        no_expand_refs: bool,

        /// Keep papers with near-duplicate titles
        #[arg(long)]
        keep_duplicates: bool,

        /// Bypass the result cache for this run
        #[arg(long)]
        no_cache: bool,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// LLM model override
        #[arg(long)]
        model: Option<String>,

        /// LLM provider override (openai, anthropic, ollama, groq)
        #[arg(long)]
        provider: Option<String>,
    },

    /// Manage the result cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage configuration
    Config {
        /// Write a default configuration file
        #[arg(long)]
        init: bool,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove expired cache entries
    Cleanup,
    /// Remove all cache entries
    Clear,
}

#[tokio::main]
async fn main() -> AgentResult<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ReviewConfig::from_file(path)?,
        None => ReviewConfig::default(),
    };

    if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    init_logging(&config.logging).map_err(|e| LitError::Config {
        message: format!("Failed to initialize logging: {}", e),
        source: None,
        context: ErrorContext::new("cli").with_operation("init_logging"),
    })?;

    match cli.command {
        Commands::Review {
            title,
            abstract_text,
            abstract_file,
            num_papers,
            relevance_threshold,
            max_iterations,
            start_year,
            end_year,
            no_expand_refs,
            keep_duplicates,
            no_cache,
            output,
            model,
            provider,
        } => {
            apply_overrides(
                &mut config,
                num_papers,
                relevance_threshold,
                max_iterations,
                start_year,
                end_year,
                no_expand_refs,
                keep_duplicates,
                no_cache,
                output,
                model,
                provider,
            );
            let abstract_text = resolve_abstract(abstract_text, abstract_file)?;
            handle_review(config, ReviewTarget::new(title, abstract_text)).await
        }
        Commands::Cache { action } => handle_cache(&config, action),
        Commands::Config { init } => handle_config(&config, cli.config, init),
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_overrides(
    config: &mut ReviewConfig,
    num_papers: Option<usize>,
    relevance_threshold: Option<f64>,
    max_iterations: Option<usize>,
    start_year: Option<i32>,
    end_year: Option<i32>,
    no_expand_refs: bool,
    keep_duplicates: bool,
    no_cache: bool,
    output: Option<PathBuf>,
    model: Option<String>,
    provider: Option<String>,
) {
    if let Some(n) = num_papers {
        config.review.num_papers = n;
    }
    if let Some(t) = relevance_threshold {
        config.review.relevance_threshold = t;
    }
    if let Some(n) = max_iterations {
        config.review.max_iterations = n;
    }
    if start_year.is_some() {
        config.review.start_year = start_year;
    }
    if end_year.is_some() {
        config.review.end_year = end_year;
    }
    if no_expand_refs {
        config.review.expand_references = false;
    }
    if keep_duplicates {
        config.review.keep_duplicates = true;
    }
    if no_cache {
        config.cache.enabled = false;
    }
    if let Some(dir) = output {
        config.output.dir = dir.to_string_lossy().into_owned();
    }
    if let Some(model) = model {
        config.llm.model = model;
    }
    if let Some(provider) = provider {
        config.llm.provider = provider;
    }
}

fn resolve_abstract(
    abstract_text: Option<String>,
    abstract_file: Option<PathBuf>,
) -> Result<String, LitError> {
    match (abstract_text, abstract_file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => Ok(std::fs::read_to_string(path)?),
        (None, None) => Err(config_error!(
            "Provide the abstract with --abstract or --abstract-file",
            "cli"
        )),
    }
}

async fn handle_review(config: ReviewConfig, target: ReviewTarget) -> AgentResult<()> {
    config.validate()?;

    std::fs::create_dir_all(&config.output.dir).map_err(|e| LitError::Config {
        message: format!("Cannot create output directory {}: {}", config.output.dir, e),
        source: Some(Box::new(e)),
        context: ErrorContext::new("cli")
            .with_operation("create_output_dir")
            .with_suggestion("Check the output path and its permissions"),
    })?;

    let cache = if config.cache.enabled {
        FileCache::new(&config.cache)
    } else {
        FileCache::disabled()
    };

    let s2_config =
        SemanticScholarConfig::from_search_config(&config.search, config.review.page_size);
    let client = Arc::new(SemanticScholarClient::new(s2_config, &config.search)?);
    let search = Arc::new(CachedSearch::new(client, cache.clone()));

    let backend = Arc::new(SiumaiBackend::new(config.llm.clone()).await?);
    let planner = ResearchPlanner::new(backend.clone(), cache.clone());
    let scorer = RelevanceScorer::new(backend, cache);

    let engine = ReviewEngine::new(search, planner, scorer, config.review.clone());

    // first Ctrl-C finishes the run with what has been accepted so far
    let cancel = engine.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, finishing review with current results");
            cancel.store(true, Ordering::Relaxed);
        }
    });

    info!(title = %target.title, "Starting literature review");
    let outcome = engine.run(target).await?;

    let output_dir = PathBuf::from(&config.output.dir);
    let report_path = output_dir.join("review.md");
    let bib_path = output_dir.join("references.bib");
    let json_path = output_dir.join("review.json");

    std::fs::write(&report_path, report::render_report(&outcome)).map_err(LitError::Io)?;
    std::fs::write(&bib_path, report::render_bibliography(&outcome)).map_err(LitError::Io)?;
    std::fs::write(&json_path, serde_json::to_string_pretty(&outcome.papers).map_err(LitError::from)?)
        .map_err(LitError::Io)?;

    println!(
        "Review finished: {} papers accepted ({} candidates seen, {} iterations)",
        outcome.papers.len(),
        outcome.progress.candidates_seen,
        outcome.progress.iteration
    );
    println!("  report:     {}", report_path.display());
    println!("  references: {}", bib_path.display());
    println!("  data:       {}", json_path.display());

    Ok(())
}

fn handle_cache(config: &ReviewConfig, action: CacheAction) -> AgentResult<()> {
    let cache = FileCache::new(&config.cache);
    match action {
        CacheAction::Cleanup => {
            let removed = cache.cleanup()?;
            println!("Removed {} expired cache entries", removed);
        }
        CacheAction::Clear => {
            let removed = cache.clear()?;
            println!("Removed {} cache entries", removed);
        }
    }
    Ok(())
}

fn handle_config(
    config: &ReviewConfig,
    path: Option<PathBuf>,
    init: bool,
) -> AgentResult<()> {
    let path = path.unwrap_or_else(|| PathBuf::from("litscout.toml"));

    if init {
        if path.exists() {
            error!(path = %path.display(), "Config file already exists, not overwriting");
            return Err(config_error!(
                format!("{} already exists", path.display()),
                "cli"
            )
            .into());
        }
        ReviewConfig::default().save_to_file(&path)?;
        println!("Wrote default configuration to {}", path.display());
    } else {
        println!("{}", toml_preview(config)?);
    }

    Ok(())
}

fn toml_preview(config: &ReviewConfig) -> Result<String, LitError> {
    toml::to_string_pretty(config).map_err(|e| LitError::Config {
        message: format!("Failed to render configuration: {}", e),
        source: Some(Box::new(e)),
        context: ErrorContext::new("cli").with_operation("toml_preview"),
    })
}
