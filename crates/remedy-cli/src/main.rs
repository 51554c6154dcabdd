//! Remedy CLI - evidence-mined remediation patterns
//!
//! Usage:
//!   remedy init                  Write the default configuration
//!   remedy collect               Collect merged PRs from GitHub
//!   remedy stats                 Summarize collected PRs
//!   remedy extract               Cluster PRs into candidate patterns
//!   remedy score                 Score candidate patterns
//!   remedy validate <files>      Validate fix templates
//!   remedy templates [dir]       List the template library
//!   remedy report                Summarize every pipeline stage

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::TryStreamExt;
use remedy_collector::{GitHubClient, GitHubCredentials, PrCollector};
use remedy_core::{
    read_json_array, write_json_array, CandidatePattern, CollectionStats, EmbeddingBackend,
    PrStore, RemedyConfig, RepoSpec, ScoredPattern, ScoringWeights,
};
use remedy_extractor::{build_embedder, PatternExtractor};
use remedy_scoring::{rank, ConfidenceScorer};
use remedy_validation::{TemplateLibrary, TemplateValidator};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "remedy")]
#[command(author, version, about = "Mine merged PRs for recurring, low-risk remediation patterns")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to .remedy/config.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration
    Init {
        /// Project directory (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Collect merged PRs from GitHub into the JSONL store
    Collect {
        /// Repository to walk; repeat to override the configured list
        #[arg(long = "repo", value_name = "OWNER/NAME")]
        repos: Vec<RepoSpec>,

        /// Maximum PRs to keep per repository
        #[arg(long)]
        max_prs: Option<usize>,

        /// Keep every merged PR, not only security-related ones
        #[arg(long)]
        all: bool,

        /// Output JSONL file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarize the collected PRs
    Stats {
        /// Input JSONL file
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Cluster collected PRs into candidate patterns
    Extract {
        /// Input JSONL file
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output patterns file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Embedding backend (ollama, hashing)
        #[arg(long)]
        backend: Option<EmbeddingBackend>,

        /// DBSCAN neighborhood radius (cosine distance)
        #[arg(long)]
        eps: Option<f64>,

        /// DBSCAN minimum neighbors
        #[arg(long)]
        min_samples: Option<usize>,
    },

    /// Score candidate patterns
    Score {
        /// Input patterns file
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output scored patterns file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate fix template files
    Validate {
        /// Template files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List the templates in a directory
    Templates {
        /// Templates directory (defaults to the configured one)
        dir: Option<PathBuf>,
    },

    /// Summarize every pipeline stage
    Report,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Token may live in .env
    dotenvy::dotenv().ok();

    let config = cli.config;
    match cli.command {
        Commands::Init { path, force } => cmd_init(path, force).await,
        Commands::Collect {
            repos,
            max_prs,
            all,
            output,
        } => cmd_collect(config, repos, max_prs, all, output).await,
        Commands::Stats { input, json } => cmd_stats(config, input, json).await,
        Commands::Extract {
            input,
            output,
            backend,
            eps,
            min_samples,
        } => cmd_extract(config, input, output, backend, eps, min_samples).await,
        Commands::Score { input, output } => cmd_score(config, input, output).await,
        Commands::Validate { files } => cmd_validate(files).await,
        Commands::Templates { dir } => cmd_templates(config, dir).await,
        Commands::Report => cmd_report(config).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<RemedyConfig> {
    let config = match path {
        Some(path) => RemedyConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => RemedyConfig::load_or_default(Path::new("."))
            .context("Failed to load .remedy/config.toml")?,
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn cmd_init(path: PathBuf, force: bool) -> Result<()> {
    let config_path = path.join(RemedyConfig::CONFIG_PATH);
    if config_path.exists() && !force {
        println!("Configuration already exists: {}", config_path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    let written = RemedyConfig::write_default(&path)?;
    let defaults = RemedyConfig::default();
    tokio::fs::create_dir_all(path.join(&defaults.output.templates_dir)).await?;

    println!("Initialized Remedy in {:?}", path);
    println!("Created:");
    println!("  {}", written.display());
    println!("  {}/", defaults.output.templates_dir.display());
    println!("\nNext steps:");
    println!("  1. Export GITHUB_TOKEN (or put it in .env)");
    println!("  2. Run 'remedy collect' to gather merged PRs");
    println!("  3. Run 'remedy extract' and 'remedy score'");

    Ok(())
}

async fn cmd_collect(
    config_path: Option<PathBuf>,
    repos: Vec<RepoSpec>,
    max_prs: Option<usize>,
    all: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config(config_path.as_deref())?;
    if !repos.is_empty() {
        config.collector.repositories = repos;
    }
    if let Some(max) = max_prs {
        config.collector.max_prs_per_repo = max;
    }
    if all {
        config.collector.security_only = false;
    }
    if let Some(output) = output {
        config.collector.output_file = output;
    }
    config.validate().context("Invalid configuration")?;

    let credentials = GitHubCredentials::from_env(&config.github.token_env)
        .context("GitHub credentials are required for collection")?;
    let client = GitHubClient::new(&config.github, &credentials)?;
    let mut collector = PrCollector::new(config.collector.clone(), client)?;

    info!(
        "Collecting from {} repositories into {}",
        collector.repositories().len(),
        config.collector.output_file.display()
    );

    {
        let records = collector.collect();
        futures::pin_mut!(records);
        while let Some(record) = records.try_next().await? {
            debug!("Collected {}: {}", record.pr_id(), record.title);
        }
    }

    println!(
        "Collected {} PRs ({} skipped) -> {}",
        collector.collected_count(),
        collector.skipped_count(),
        config.collector.output_file.display()
    );

    if let Some(stats) = collector.statistics().await? {
        println!();
        print_stats(&stats);
    }

    Ok(())
}

async fn cmd_stats(config_path: Option<PathBuf>, input: Option<PathBuf>, json: bool) -> Result<()> {
    let config = load_config(config_path.as_deref())?;
    let input = input.unwrap_or(config.collector.output_file);

    let records = PrStore::new(&input).load().await?;
    let Some(stats) = CollectionStats::compute(&records) else {
        println!("No PRs collected yet ({})", input.display());
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(&stats);
    }

    Ok(())
}

fn print_stats(stats: &CollectionStats) {
    println!("Collection Statistics");
    println!("=====================");
    println!("Total PRs:      {}", stats.total_prs);
    println!(
        "Security PRs:   {} ({:.1}%)",
        stats.security_prs, stats.security_percentage
    );
    println!(
        "Merge hours:    median {:.1}, mean {:.1}, min {:.1}, max {:.1}",
        stats.median_merge_hours,
        stats.mean_merge_hours,
        stats.min_merge_hours,
        stats.max_merge_hours
    );
    println!(
        "Reverts:        {} ({:.1}%)",
        stats.revert_count,
        stats.revert_rate * 100.0
    );
}

async fn cmd_extract(
    config_path: Option<PathBuf>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    backend: Option<EmbeddingBackend>,
    eps: Option<f64>,
    min_samples: Option<usize>,
) -> Result<()> {
    let mut config = load_config(config_path.as_deref())?;
    let extractor_config = &mut config.extractor;
    if let Some(input) = input {
        extractor_config.input_file = input;
    }
    if let Some(output) = output {
        extractor_config.output_file = output;
    }
    if let Some(backend) = backend {
        extractor_config.embedding.backend = backend;
    }
    if let Some(eps) = eps {
        extractor_config.eps = eps;
    }
    if let Some(min_samples) = min_samples {
        extractor_config.min_samples = min_samples;
    }
    config.validate().context("Invalid configuration")?;

    let embedder = build_embedder(&config.extractor.embedding)?;
    info!("Embedding titles with {}", embedder.describe());

    let extractor = PatternExtractor::new(embedder, config.extractor.clone())?;
    let patterns = extractor
        .extract_and_save()
        .await
        .context("Pattern extraction failed")?;

    println!(
        "Extracted {} patterns -> {}",
        patterns.len(),
        config.extractor.output_file.display()
    );
    for pattern in &patterns {
        print_pattern(pattern);
    }

    Ok(())
}

fn print_pattern(pattern: &CandidatePattern) {
    let e = &pattern.evidence;
    println!(
        "  cluster {:>3}: {} PRs across {} repos, median merge {:.1}h, revert rate {:.0}%",
        pattern.cluster_id,
        e.occurrence_count,
        e.repo_count,
        e.median_merge_hours,
        e.revert_rate * 100.0
    );
}

async fn cmd_score(
    config_path: Option<PathBuf>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path.as_deref())?;
    let input = input.unwrap_or(config.extractor.output_file);
    let output = output.unwrap_or(config.output.scored_file);

    let patterns: Vec<CandidatePattern> = read_json_array(&input)
        .await
        .with_context(|| format!("Failed to read patterns from {}", input.display()))?;
    if patterns.is_empty() {
        warn!("No patterns in {}; run 'remedy extract' first", input.display());
    }

    let scorer = ConfidenceScorer::new(config.scoring)?;
    let scored = rank(scorer.score_patterns(patterns));
    write_json_array(&output, &scored).await?;

    println!("Scored {} patterns -> {}", scored.len(), output.display());
    print_weights(&scorer.policy().weights);
    for pattern in &scored {
        print_scored(pattern);
    }

    Ok(())
}

fn print_scored(scored: &ScoredPattern) {
    let b = &scored.breakdown;
    println!(
        "  cluster {:>3}: confidence {:.3} (velocity {:.2}, stability {:.2}, discussion {:.2}, frequency {:.2}, diversity {:.2})",
        scored.pattern.cluster_id,
        scored.confidence,
        b.merge_velocity,
        b.stability,
        b.discussion,
        b.frequency,
        b.diversity
    );
}

fn print_weights(weights: &ScoringWeights) {
    println!(
        "Weights: merge velocity {:.0}%, stability {:.0}%, discussion {:.0}%, frequency {:.0}%, diversity {:.0}%",
        weights.merge_velocity * 100.0,
        weights.stability * 100.0,
        weights.discussion * 100.0,
        weights.frequency * 100.0,
        weights.diversity * 100.0
    );
}

async fn cmd_validate(files: Vec<PathBuf>) -> Result<()> {
    let mut failed = 0;

    for file in &files {
        let outcome = TemplateValidator::validate_file(file).await;

        if outcome.is_valid() {
            println!("OK    {}", file.display());
        } else {
            failed += 1;
            println!("FAIL  {}", file.display());
            for error in &outcome.errors {
                println!("      - {}", error);
            }
        }
        for warning in &outcome.warnings {
            println!("      warning: {}", warning);
        }
    }

    if failed > 0 {
        bail!("{} of {} templates failed validation", failed, files.len());
    }

    Ok(())
}

async fn cmd_templates(config_path: Option<PathBuf>, dir: Option<PathBuf>) -> Result<()> {
    let dir = match dir {
        Some(dir) => dir,
        None => load_config(config_path.as_deref())?.output.templates_dir,
    };

    let library = TemplateLibrary::load(&dir).await?;

    println!("Templates in {}", dir.display());
    println!("=============");
    if library.templates().is_empty() && library.rejected().is_empty() {
        println!("No templates found");
        return Ok(());
    }

    for loaded in library.templates() {
        let t = &loaded.template;
        println!(
            "  {} ({}) confidence {:.2}, languages: {}",
            t.id,
            t.name,
            t.confidence,
            t.languages.join(", ")
        );
    }
    for rejected in library.rejected() {
        println!("  INVALID {}", rejected.path.display());
        for error in &rejected.errors {
            println!("      - {}", error);
        }
    }

    Ok(())
}

async fn cmd_report(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path.as_deref())?;

    println!("Remedy Pipeline Report");
    println!("======================");

    println!("\n[1] Collection ({})", config.collector.output_file.display());
    let records = PrStore::new(&config.collector.output_file).load().await?;
    match CollectionStats::compute(&records) {
        Some(stats) => print_stats(&stats),
        None => println!("No PRs collected yet"),
    }

    println!("\n[2] Extraction ({})", config.extractor.output_file.display());
    let patterns: Vec<CandidatePattern> = read_json_array(&config.extractor.output_file).await?;
    println!("{} candidate patterns", patterns.len());

    println!("\n[3] Scoring ({})", config.output.scored_file.display());
    let scored: Vec<ScoredPattern> = read_json_array(&config.output.scored_file).await?;
    println!("{} scored patterns", scored.len());
    for pattern in scored.iter().take(5) {
        print_scored(pattern);
    }
    print_weights(&config.scoring.weights);

    println!("\n[4] Templates ({})", config.output.templates_dir.display());
    let library = TemplateLibrary::load(&config.output.templates_dir).await?;
    println!(
        "{} valid, {} invalid",
        library.templates().len(),
        library.rejected().len()
    );

    Ok(())
}
