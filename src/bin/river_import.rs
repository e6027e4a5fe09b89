use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use sqlx::postgres::PgPoolOptions;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use river_tracker_service::db::ReadingRepository;
use river_tracker_service::ingest::{csv_files_in, IngestSummary, Ingester};

#[derive(Parser)]
#[command(name = "river-import")]
#[command(about = "Import hydrological station CSV exports into the readings table", long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env)]
    database_url: String,

    /// Path to a single station export CSV file
    #[arg(long)]
    file: Option<PathBuf>,

    /// Directory of export CSV files to ingest sequentially
    #[arg(long)]
    dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,river_tracker_service=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&cli.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let ingester = Ingester::new(ReadingRepository::new(pool));

    let summary = match (&cli.file, &cli.dir) {
        (Some(file), None) => ingester.ingest_file(file).await?,
        (None, Some(dir)) => {
            let files = csv_files_in(dir)?;
            if files.is_empty() {
                return Err(format!("No CSV files found in {}", dir.display()).into());
            }

            let pb = ProgressBar::new(files.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                    .progress_chars("#>-"),
            );

            let mut summary = IngestSummary::default();
            for file in &files {
                pb.set_message(
                    file.file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                );
                summary.merge(ingester.ingest_file(file).await?);
                pb.inc(1);
            }
            pb.finish_with_message("done");
            summary
        }
        _ => {
            return Err("Specify exactly one of --file or --dir".into());
        }
    };

    println!(
        "Import complete: {} readings inserted, {} duplicates skipped",
        summary.inserted, summary.skipped
    );

    Ok(())
}
