//! fittrack-import - Exercise reference data importer
//!
//! Sequential CLI that seeds and maintains the exercise tables: imports from
//! the Hevy API or the bundled seed table, enriches rows from the detail
//! endpoint, backfills media, and reports coverage.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fittrack_common::config::{
    load_config_or_default, resolve_database_path, resolve_root_folder, BatchFailurePolicy,
    TomlConfig, ROOT_FOLDER_ENV,
};
use fittrack_common::db::init_database;
use fittrack_import::config::resolve_hevy_api_key;
use fittrack_import::db::coverage_report;
use fittrack_import::models::ExerciseRecord;
use fittrack_import::services::seed_data::load_seed_records;
use fittrack_import::services::url_validator::collect_media_urls;
use fittrack_import::services::{
    HevyClient, HevyClientSettings, PlaceholderPolicy, RecordCache, Translator, UrlValidator,
};
use fittrack_import::workflow::{
    backfill_media, enrich_exercises, ImportDriver, ImportOptions, ImportOutcome, MediaTable,
};
use fittrack_import::ImportResult;
use futures::stream;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fittrack-import", version, about = "FitTrack exercise reference data importer")]
struct Cli {
    /// Config file (defaults to ~/.config/fittrack/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root folder holding the database and caches
    #[arg(long, global = true)]
    root_folder: Option<PathBuf>,

    /// Database file (overrides the root folder default)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Rows per transaction
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    /// What to do when a batch fails to commit: skip or abort
    #[arg(long, global = true)]
    on_batch_failure: Option<BatchFailurePolicy>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Command {
    /// Import exercise templates from the Hevy API
    ImportApi {
        #[command(flatten)]
        api: ApiKeyArgs,
        /// Raw record cache; loaded when present, written after a fetch
        #[arg(long)]
        cache: Option<PathBuf>,
        /// Fetch even when the cache exists
        #[arg(long, default_value_t = false)]
        refresh: bool,
        /// Import names and labels untranslated
        #[arg(long, default_value_t = false)]
        no_translate: bool,
        /// Translation tables (defaults to the bundled Portuguese tables)
        #[arg(long)]
        translations: Option<PathBuf>,
        #[command(flatten)]
        placeholders: PlaceholderArgs,
    },
    /// Import the bundled (or given) seed table
    ImportSeed {
        /// Seed JSON file
        #[arg(long)]
        file: Option<PathBuf>,
        #[command(flatten)]
        placeholders: PlaceholderArgs,
    },
    /// Fill missing descriptions and media from the detail endpoint
    Enrich {
        #[command(flatten)]
        api: ApiKeyArgs,
        /// Stop after this many exercises
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Apply the media table, then placeholders where no image is stored
    BackfillMedia {
        /// Media table JSON (name -> {image, animation})
        #[arg(long)]
        media: Option<PathBuf>,
        /// Placeholder rules JSON
        #[arg(long)]
        placeholders: Option<PathBuf>,
    },
    /// Print the coverage report
    Report {
        /// Sample rows to show
        #[arg(long, default_value_t = 5)]
        sample: usize,
    },
    /// Check that seed table media URLs answer HEAD requests
    ValidateUrls {
        /// Seed JSON file
        #[arg(long)]
        file: Option<PathBuf>,
        /// Invalid URLs to list
        #[arg(long, default_value_t = 5)]
        show: usize,
    },
}

#[derive(Args, Debug)]
struct ApiKeyArgs {
    /// Hevy API key (or FITTRACK_HEVY_API_KEY, or hevy_api_key in the config)
    #[arg(long)]
    api_key: Option<String>,
}

#[derive(Args, Debug)]
struct PlaceholderArgs {
    /// Fill missing images with keyword placeholders
    #[arg(long, default_value_t = false)]
    with_placeholders: bool,
    /// Placeholder rules JSON (defaults to the bundled rules)
    #[arg(long)]
    placeholder_rules: Option<PathBuf>,
}

impl PlaceholderArgs {
    fn policy(&self) -> ImportResult<Option<PlaceholderPolicy>> {
        if !self.with_placeholders && self.placeholder_rules.is_none() {
            return Ok(None);
        }
        let policy = match &self.placeholder_rules {
            Some(path) => PlaceholderPolicy::load(path)?,
            None => PlaceholderPolicy::builtin()?,
        };
        Ok(Some(policy))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str())),
        )
        .init();

    info!(
        "Starting fittrack-import v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if let Some(batch_size) = cli.batch_size {
        config.import.batch_size = batch_size;
    }
    if let Some(policy) = cli.on_batch_failure {
        config.import.on_batch_failure = policy;
    }

    let root_folder = resolve_root_folder(cli.root_folder.as_deref(), ROOT_FOLDER_ENV, &config);
    let db_path = resolve_database_path(cli.database.as_deref(), &config, &root_folder);
    info!("Database: {}", db_path.display());

    let pool = init_database(&db_path, &config.fallbacks)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let result = run_command(cli.command, &config, &root_folder, &pool).await;
    pool.close().await;

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

async fn run_command(
    command: Command,
    config: &TomlConfig,
    root_folder: &Path,
    pool: &SqlitePool,
) -> Result<()> {
    match command {
        Command::ImportApi {
            api,
            cache,
            refresh,
            no_translate,
            translations,
            placeholders,
        } => {
            let api_key = resolve_hevy_api_key(api.api_key.as_deref(), config)?;
            let client = HevyClient::new(&api_key, HevyClientSettings::from_config(config))?;

            let mut driver = new_driver(pool, config).await?;
            if !no_translate {
                let translator = match &translations {
                    Some(path) => Translator::load(path)?,
                    None => Translator::builtin()?,
                };
                driver = driver.with_translator(translator);
            }
            if let Some(policy) = placeholders.policy()? {
                driver = driver.with_placeholders(policy);
            }

            // Relative cache paths live in the root folder
            let cache = cache.map(|p| if p.is_relative() { root_folder.join(p) } else { p });

            let outcome = match cache {
                Some(path) => {
                    let cached = if refresh { None } else { RecordCache::load(&path)? };
                    let records = match cached {
                        Some(records) => records,
                        None => {
                            let records = client.fetch_all().await?;
                            RecordCache::save(&path, &records)?;
                            records
                        }
                    };
                    driver.run(stream::iter(records.into_iter().map(Ok))).await
                }
                None => driver.run(client.exercise_stream()).await,
            };
            finish_import(outcome)
        }

        Command::ImportSeed { file, placeholders } => {
            let records: Vec<ExerciseRecord> = load_seed_records(file.as_deref())?;
            info!(records = records.len(), "Loaded seed table");

            let mut driver = new_driver(pool, config).await?;
            if let Some(policy) = placeholders.policy()? {
                driver = driver.with_placeholders(policy);
            }
            let outcome = driver.run(stream::iter(records.into_iter().map(Ok))).await;
            finish_import(outcome)
        }

        Command::Enrich { api, limit } => {
            let api_key = resolve_hevy_api_key(api.api_key.as_deref(), config)?;
            let client = HevyClient::new(&api_key, HevyClientSettings::from_config(config))?;

            let stats = enrich_exercises(pool, &client, config.import.batch_size, limit).await?;
            println!(
                "Enrichment: {} candidates, {} updated, {} without detail, {} failed",
                stats.candidates, stats.updated, stats.missing, stats.failed
            );
            Ok(())
        }

        Command::BackfillMedia {
            media,
            placeholders,
        } => {
            let table = match &media {
                Some(path) => MediaTable::load(path)?,
                None => MediaTable::builtin()?,
            };
            let policy = match &placeholders {
                Some(path) => PlaceholderPolicy::load(path)?,
                None => PlaceholderPolicy::builtin()?,
            };

            let stats = backfill_media(pool, &table, &policy).await?;
            println!(
                "Media backfill: {} matched, {} placeholders, {} untouched",
                stats.matched, stats.placeholders, stats.untouched
            );
            print!("{}", coverage_report(pool, 5).await?.render());
            Ok(())
        }

        Command::Report { sample } => {
            print!("{}", coverage_report(pool, sample).await?.render());
            Ok(())
        }

        Command::ValidateUrls { file, show } => {
            let records = load_seed_records(file.as_deref())?;
            let urls = collect_media_urls(&records);
            info!(urls = urls.len(), "Validating media URLs");

            let validator =
                UrlValidator::new(Duration::from_secs(config.import.request_timeout_secs))?;
            let report = validator.validate(&urls).await;
            print!("{}", report.render(show));
            Ok(())
        }
    }
}

async fn new_driver(pool: &SqlitePool, config: &TomlConfig) -> ImportResult<ImportDriver> {
    ImportDriver::new(
        pool.clone(),
        config.fallbacks.clone(),
        ImportOptions::from_settings(&config.import),
    )
    .await
}

fn finish_import(outcome: ImportOutcome) -> Result<()> {
    let summary = &outcome.summary;
    println!(
        "Import: {} received, {} processed, {} skipped, {} written, {} failed, {} new categories",
        summary.received,
        summary.processed,
        summary.skipped,
        summary.written,
        summary.failed,
        summary.categories_created
    );
    for failed in &summary.failed_batches {
        println!(
            "  batch {} (records {}..={}, {} rows) rolled back: {}",
            failed.batch, failed.first_index, failed.last_index, failed.rows, failed.reason
        );
    }
    if let Some(report) = &summary.report {
        print!("{}", report.render());
    }

    outcome.into_result()?;
    Ok(())
}
