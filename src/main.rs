use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use govfeeds::config::Config;
use govfeeds::content::ContentScraper;
use govfeeds::feed::LinkExtractor;
use govfeeds::pipeline::{InsertMode, Pipeline};
use govfeeds::storage::{Column, Database, DatabaseError, Filter};
use govfeeds::summarize::{OllamaClient, Summarizer, TextSplitter};
use govfeeds::util::build_client;

#[derive(Parser, Debug)]
#[command(
    name = "govfeeds",
    version,
    about = "Harvest government RSS directories into SQLite"
)]
struct Cli {
    /// Configuration file (optional; defaults apply when missing)
    #[arg(long, global = true, value_name = "FILE", default_value = "govfeeds.toml")]
    config: PathBuf,

    /// Database file, overriding `database_path` from the config
    #[arg(long, global = true, value_name = "FILE")]
    db: Option<String>,

    /// Reset database (delete and recreate)
    #[arg(long, global = true)]
    reset_db: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest every configured directory once, or repeatedly with --every
    Run {
        /// Generate AI summaries with the configured Ollama model
        #[arg(long)]
        summarize: bool,

        /// Repeat the harvest every N minutes until Ctrl-C
        #[arg(long, value_name = "MINUTES", value_parser = clap::value_parser!(u64).range(1..))]
        every: Option<u64>,

        /// When collected records are written
        #[arg(long, value_enum)]
        insert_mode: Option<InsertMode>,
    },

    /// Print every stored record as one JSON object per line
    List,

    /// Print selected columns of matching rows as JSON arrays
    Query {
        /// Columns to project, comma separated (all columns when omitted)
        #[arg(long, value_delimiter = ',', value_name = "COL,...")]
        columns: Vec<Column>,

        /// Exact-match filter; repeat to AND several
        #[arg(long = "where", value_name = "COL=VALUE")]
        filters: Vec<Filter>,
    },
}

async fn open_database(path: &str, reset: bool) -> Result<Database> {
    if reset && path != ":memory:" && Path::new(path).exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to delete database '{}'", path))?;
        eprintln!("Database reset.");
    }

    match Database::open(path).await {
        Ok(db) => Ok(db),
        Err(DatabaseError::Locked) => anyhow::bail!(
            "Database '{}' is locked by another process. Wait for it to finish and try again.",
            path
        ),
        Err(e) => Err(e).with_context(|| format!("Failed to open database '{}'", path)),
    }
}

async fn run(
    config: &Config,
    db: Database,
    summarize: bool,
    every: Option<u64>,
    insert_mode: Option<InsertMode>,
) -> Result<Database> {
    let client = build_client(Duration::from_secs(config.request_timeout_secs))
        .context("Failed to build HTTP client")?;
    let links = LinkExtractor::new(
        config.link_class.as_str(),
        config.feed_suffix.as_str(),
        config.excluded_hosts.clone(),
    )
    .context("Invalid link_class")?;
    let scraper =
        ContentScraper::new(&config.content_selector).context("Invalid content_selector")?;

    let mut pipeline: Pipeline = Pipeline::new(
        db,
        client,
        config.directory_urls.clone(),
        links,
        scraper,
    )
    .with_insert_mode(insert_mode.unwrap_or(config.insert_mode));

    if summarize || config.summarizer.enabled {
        let settings = &config.summarizer;
        let splitter = TextSplitter::new(settings.chunk_size, settings.chunk_overlap)
            .context("Invalid [summarizer] chunk settings")?;
        let model_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to build model client")?;
        let model = OllamaClient::new(
            model_client,
            &settings.base_url,
            settings.model.as_str(),
            settings.temperature,
        );
        tracing::info!(model = %settings.model, method = ?settings.method, "Summaries enabled");
        pipeline = pipeline.with_summarizer(Summarizer::new(model, splitter, settings.method));
    }

    match every {
        Some(minutes) => {
            pipeline.run_every(Duration::from_secs(minutes.saturating_mul(60))).await;
        }
        None => {
            let report = pipeline.run_once().await.context("Harvest run failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(pipeline.into_database())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load config '{}'", cli.config.display()))?;
    let db_path = cli.db.clone().unwrap_or_else(|| config.database_path.clone());
    let db = open_database(&db_path, cli.reset_db).await?;

    let db = match cli.command {
        Command::Run {
            summarize,
            every,
            insert_mode,
        } => run(&config, db, summarize, every, insert_mode).await?,
        Command::List => {
            let records = db.query_all().await.context("Failed to read records")?;
            let mut out = std::io::stdout().lock();
            for record in &records {
                writeln!(out, "{}", serde_json::to_string(record)?)?;
            }
            db
        }
        Command::Query { columns, filters } => {
            let rows = db
                .query_columns(&columns, &filters)
                .await
                .context("Query failed")?;
            let mut out = std::io::stdout().lock();
            for row in &rows {
                writeln!(out, "{}", serde_json::to_string(row)?)?;
            }
            db
        }
    };

    db.close().await;
    Ok(())
}
