//! Operational entry point: run ingestion batches, the tagging pass, and
//! the listing/moderation commands. All logic lives in `rideau-core`; this
//! binary only wires it together.

mod file_connector;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rideau_core::classify::TheatreClassifier;
use rideau_core::config::AppConfig;
use rideau_core::connector::{Connector, NoopPreviewFetcher};
use rideau_core::gateway::{run_batch, Gateway};
use rideau_core::storage::Storage;
use rideau_core::tagger::{run_tagging_pass, GenreStyleTagger};
use rideau_fetch::PreviewClient;

use crate::file_connector::FileConnector;

#[derive(Parser)]
#[command(name = "rideau", about = "Theatre listings aggregator", version)]
struct Cli {
    /// Database file. Defaults to the platform data dir.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a JSON batch of candidate records through the gateway.
    Ingest {
        /// JSON file holding an array of candidate records.
        file: PathBuf,
        /// Source identifier stamped on records that lack one.
        #[arg(long)]
        source: Option<String>,
        /// Reject ambiguous records (overrides config).
        #[arg(long)]
        strict: bool,
        /// Skip preview-image recovery.
        #[arg(long)]
        no_images: bool,
    },
    /// Backfill genre/style on persisted shows.
    Tag,
    /// Print publicly listable representations.
    List {
        /// Restrict to one date (YYYY-MM-DD).
        #[arg(long)]
        date: Option<String>,
    },
    /// Soft-hide a representation (kept in store, excluded from listings).
    Hide {
        fingerprint: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Clear a soft-hide marker.
    Unhide { fingerprint: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("loading configuration")?;
    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => AppConfig::ensure_db_path().context("resolving database path")?,
    };
    let storage = Storage::open(&db_path)
        .with_context(|| format!("opening database at {}", db_path.display()))?;

    match cli.command {
        Command::Ingest {
            file,
            source,
            strict,
            no_images,
        } => {
            let connector = FileConnector::new(file, source);
            let records = connector.produce().await?;
            let classifier = TheatreClassifier::new(&config.classifier);
            let gateway = Gateway::new(&storage).with_image_budget(config.ingest.image_budget);
            let strict = strict || config.ingest.strict;

            let outcome = if no_images {
                run_batch(&classifier, &gateway, records, strict, &NoopPreviewFetcher).await?
            } else {
                let fetcher = PreviewClient::new();
                run_batch(&classifier, &gateway, records, strict, &fetcher).await?
            };
            println!(
                "{} received, {} upserted ({} rejected, {} vetoed, {} invalid, {} duplicates, {} images recovered)",
                outcome.received,
                outcome.upserted,
                outcome.rejected,
                outcome.vetoed,
                outcome.invalid,
                outcome.duplicates,
                outcome.images_recovered,
            );
        }
        Command::Tag => {
            let tagger = GenreStyleTagger::new(&config.tagger);
            let outcome = run_tagging_pass(&storage, &tagger)?;
            println!(
                "{} shows, {} genres applied, {} styles applied",
                outcome.shows, outcome.genres_applied, outcome.styles_applied
            );
        }
        Command::List { date } => {
            let rows = match date {
                Some(date) => storage.visible_on_date(&date)?,
                None => storage.visible_representations()?,
            };
            for row in &rows {
                println!(
                    "{} {} | {} @ {} [{}]",
                    row.record.date,
                    row.record.heure.as_deref().unwrap_or("--:--:--"),
                    row.record.titre,
                    row.record.theatre_nom,
                    &row.fingerprint[..12],
                );
            }
            println!("{} representation(s)", rows.len());
        }
        Command::Hide {
            fingerprint,
            reason,
        } => {
            if storage.hide(&fingerprint, reason.as_deref())? {
                println!("hidden {fingerprint}");
            } else {
                println!("no representation with fingerprint {fingerprint}");
            }
        }
        Command::Unhide { fingerprint } => {
            if storage.unhide(&fingerprint)? {
                println!("unhidden {fingerprint}");
            } else {
                println!("no representation with fingerprint {fingerprint}");
            }
        }
    }
    Ok(())
}
