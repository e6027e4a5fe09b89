use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Trim};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::db::{DbError, NewReading};
use crate::ingest::station_export::{is_data_header, parse_data_row, StationHeader};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to read file: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to decode CSV stream: {0}")]
    Csv(#[from] csv::Error),
}

/// Counts reported by one ingestion call. Rows skipped for validation
/// reasons are counted by neither field; `skipped` is duplicates only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub inserted: u64,
    pub skipped: u64,
}

impl IngestSummary {
    pub fn merge(&mut self, other: IngestSummary) {
        self.inserted += other.inserted;
        self.skipped += other.skipped;
    }
}

/// Store seam for the ingestion parser.
///
/// The duplicate check and the insert are one conditional operation:
/// implementations return true when a row was written and false when an
/// equal (station, date, time) reading already existed.
#[allow(async_fn_in_trait)]
pub trait ReadingStore {
    async fn insert_reading_if_absent(&self, reading: &NewReading) -> Result<bool, DbError>;
}

/// Ingests station CSV export files into a reading store.
///
/// Processing is sequential: one file at a time, one row at a time, with
/// the store round trip awaited before the next row is touched.
#[derive(Clone)]
pub struct Ingester<S> {
    store: S,
}

impl<S: ReadingStore> Ingester<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Ingest a single export file.
    ///
    /// Only file-level I/O and stream decode failures abort the call.
    /// Per-row anomalies skip the row: validation failures silently,
    /// duplicates counted in the summary, and store rejections logged.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestSummary, IngestError> {
        info!("Ingesting file {}", path.display());

        let text = fs::read_to_string(path)?;
        let header = StationHeader::scan(&text);
        info!(
            "Found station: {:?}, location: {:?}",
            header.station, header.location
        );

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let mut summary = IngestSummary::default();
        let mut in_data_section = false;

        for result in reader.records() {
            let record = result?;

            // Everything before the "Year" header row is preamble; the
            // header row itself is consumed, not treated as data.
            if !in_data_section {
                if is_data_header(&record) {
                    in_data_section = true;
                }
                continue;
            }

            let Some(row) = parse_data_row(&record) else {
                continue;
            };

            let reading = NewReading {
                station: header.station.clone(),
                location: header.location.clone(),
                year: row.year,
                date: row.date,
                time: row.time,
                level: row.level,
                flow: row.flow,
            };

            match self.store.insert_reading_if_absent(&reading).await {
                Ok(true) => summary.inserted += 1,
                Ok(false) => {
                    debug!(
                        "Skipping duplicate: {} - {} {}",
                        reading.station, reading.date, reading.time
                    );
                    summary.skipped += 1;
                }
                Err(e) => {
                    warn!(
                        "Failed to insert reading {} {} {}: {}",
                        reading.station, reading.date, reading.time, e
                    );
                }
            }
        }

        info!(
            "Finished {}: {} inserted, {} duplicates skipped",
            path.display(),
            summary.inserted,
            summary.skipped
        );
        Ok(summary)
    }

    /// Ingest every `*.csv` file in a directory, one after another in
    /// name order, summing the per-file summaries.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn ingest_dir(&self, dir: &Path) -> Result<IngestSummary, IngestError> {
        let files = csv_files_in(dir)?;
        info!("Ingesting {} CSV files from {}", files.len(), dir.display());

        let mut summary = IngestSummary::default();
        for file in &files {
            summary.merge(self.ingest_file(file).await?);
        }

        Ok(summary)
    }
}

/// CSV files directly under a directory, sorted by name
pub fn csv_files_in(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        })
        .collect();

    files.sort();
    Ok(files)
}
