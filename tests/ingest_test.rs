// Ingestion tests driven through an in-memory reading store, so the
// whole parse-coerce-dedupe-insert path runs without a database.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use river_tracker_service::db::{DbError, NewReading};
use river_tracker_service::ingest::{IngestError, IngestSummary, Ingester, ReadingStore};
use tempfile::TempDir;

/// In-memory store enforcing the (station, date, time) uniqueness rule
#[derive(Clone, Default)]
struct MemoryStore {
    rows: Arc<Mutex<Vec<NewReading>>>,
}

impl MemoryStore {
    fn rows(&self) -> Vec<NewReading> {
        self.rows.lock().unwrap().clone()
    }
}

impl ReadingStore for MemoryStore {
    async fn insert_reading_if_absent(&self, reading: &NewReading) -> Result<bool, DbError> {
        let mut rows = self.rows.lock().unwrap();
        let exists = rows.iter().any(|r| {
            r.station == reading.station && r.date == reading.date && r.time == reading.time
        });
        if exists {
            return Ok(false);
        }
        rows.push(reading.clone());
        Ok(true)
    }
}

/// Store that rejects inserts for one specific time value, to exercise
/// the log-and-continue path for store failures.
#[derive(Clone)]
struct RejectingStore {
    inner: MemoryStore,
    reject_time: String,
}

impl ReadingStore for RejectingStore {
    async fn insert_reading_if_absent(&self, reading: &NewReading) -> Result<bool, DbError> {
        if reading.time == self.reject_time {
            return Err(DbError::SqlxError(sqlx::Error::RowNotFound));
        }
        self.inner.insert_reading_if_absent(reading).await
    }
}

const SAMPLE_EXPORT: &str = "\
Station export utility v2.1

D1H003 Orange River @ Aliwal-North
Hydrological daily data

Year,Date,Time,Level,Flow
2020,20200115,0800,1.234,5.678
2020,20200116,0800,1.300,
2020,20200117,0800,bad,5.9
Total,3 rows,,,
";

fn write_export(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write fixture file");
    path
}

#[tokio::test]
async fn test_ingest_records_station_and_rows() {
    let dir = TempDir::new().unwrap();
    let path = write_export(&dir, "D1H003YRPK.csv", SAMPLE_EXPORT);

    let store = MemoryStore::default();
    let ingester = Ingester::new(store.clone());

    let summary = ingester.ingest_file(&path).await.unwrap();
    assert_eq!(
        summary,
        IngestSummary {
            inserted: 3,
            skipped: 0
        }
    );

    let rows = store.rows();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.station == "D1H003"));
    assert!(rows.iter().all(|r| r.location == "Orange River @ Aliwal-North"));

    assert_eq!(rows[0].year, 2020);
    assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2020, 1, 15).unwrap());
    assert_eq!(rows[0].time, "0800");
    assert_eq!(rows[0].level, Some(1.234));
    assert_eq!(rows[0].flow, Some(5.678));

    // Empty flow field stays NULL
    assert_eq!(rows[1].flow, None);
    // Unparseable level collapses to NULL, the row itself survives
    assert_eq!(rows[2].level, None);
    assert_eq!(rows[2].flow, Some(5.9));
}

#[tokio::test]
async fn test_reingest_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = write_export(&dir, "D1H003YRPK.csv", SAMPLE_EXPORT);

    let store = MemoryStore::default();
    let ingester = Ingester::new(store.clone());

    let first = ingester.ingest_file(&path).await.unwrap();
    assert_eq!(first.inserted, 3);
    assert_eq!(first.skipped, 0);

    let second = ingester.ingest_file(&path).await.unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped, 3);

    assert_eq!(store.rows().len(), 3);
}

#[tokio::test]
async fn test_rows_with_missing_date_or_time_are_not_counted() {
    let export = "\
D1H003 Orange River @ Aliwal-North
Hydro export

Year,Date,Time,Level,Flow
2020,,0800,1.0,2.0
2020,20200115,,1.0,2.0
2020,20200116,0800,1.0,2.0
";
    let dir = TempDir::new().unwrap();
    let path = write_export(&dir, "export.csv", export);

    let store = MemoryStore::default();
    let ingester = Ingester::new(store.clone());

    let summary = ingester.ingest_file(&path).await.unwrap();
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(store.rows().len(), 1);
}

#[tokio::test]
async fn test_malformed_dates_skip_the_row() {
    let export = "\
D1H003 Orange River @ Aliwal-North
Hydro export

Year,Date,Time,Level,Flow
2020,2020011,0800,1.0,2.0
2020,20201332,0800,1.0,2.0
2020,20200116,0800,1.0,2.0
";
    let dir = TempDir::new().unwrap();
    let path = write_export(&dir, "export.csv", export);

    let store = MemoryStore::default();
    let ingester = Ingester::new(store.clone());

    let summary = ingester.ingest_file(&path).await.unwrap();
    assert_eq!(summary.inserted, 1);
    assert_eq!(
        store.rows()[0].date,
        NaiveDate::from_ymd_opt(2020, 1, 16).unwrap()
    );
}

#[tokio::test]
async fn test_file_without_year_header_ingests_nothing() {
    let export = "\
D1H003 Orange River @ Aliwal-North
Hydro export

2020,20200115,0800,1.0,2.0
";
    let dir = TempDir::new().unwrap();
    let path = write_export(&dir, "export.csv", export);

    let store = MemoryStore::default();
    let ingester = Ingester::new(store.clone());

    let summary = ingester.ingest_file(&path).await.unwrap();
    assert_eq!(summary, IngestSummary::default());
    assert!(store.rows().is_empty());
}

#[tokio::test]
async fn test_file_without_hydro_marker_ingests_with_empty_station() {
    let export = "\
Year,Date,Time,Level,Flow
2020,20200115,0800,1.0,2.0
";
    let dir = TempDir::new().unwrap();
    let path = write_export(&dir, "export.csv", export);

    let store = MemoryStore::default();
    let ingester = Ingester::new(store.clone());

    let summary = ingester.ingest_file(&path).await.unwrap();
    assert_eq!(summary.inserted, 1);

    let rows = store.rows();
    assert_eq!(rows[0].station, "");
    assert_eq!(rows[0].location, "");
}

#[tokio::test]
async fn test_bom_prefixed_year_header_is_recognized() {
    let export = "\u{feff}Year,Date,Time,Level,Flow\n2020,20200115,0800,1.0,2.0\n";
    let dir = TempDir::new().unwrap();
    let path = write_export(&dir, "export.csv", export);

    let store = MemoryStore::default();
    let ingester = Ingester::new(store.clone());

    let summary = ingester.ingest_file(&path).await.unwrap();
    assert_eq!(summary.inserted, 1);
}

#[tokio::test]
async fn test_missing_file_is_an_error() {
    let store = MemoryStore::default();
    let ingester = Ingester::new(store);

    let result = ingester.ingest_file(Path::new("/nonexistent/export.csv")).await;
    assert!(matches!(result, Err(IngestError::Io(_))));
}

#[tokio::test]
async fn test_store_rejections_are_skipped_without_failing_the_file() {
    let dir = TempDir::new().unwrap();
    let export = "\
D1H003 Orange River @ Aliwal-North
Hydro export

Year,Date,Time,Level,Flow
2020,20200115,0800,1.0,2.0
2020,20200115,1600,1.1,2.1
2020,20200116,0800,1.2,2.2
";
    let path = write_export(&dir, "export.csv", export);

    let store = RejectingStore {
        inner: MemoryStore::default(),
        reject_time: "1600".to_string(),
    };
    let ingester = Ingester::new(store.clone());

    let summary = ingester.ingest_file(&path).await.unwrap();
    // Rejected row is neither inserted nor a duplicate
    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(store.inner.rows().len(), 2);
}

#[tokio::test]
async fn test_ingest_dir_processes_csv_files_only() {
    let dir = TempDir::new().unwrap();
    write_export(&dir, "a.csv", SAMPLE_EXPORT);

    let other_station = SAMPLE_EXPORT.replace("D1H003", "A5H006");
    write_export(&dir, "b.csv", &other_station);
    write_export(&dir, "notes.txt", "not a csv file");

    let store = MemoryStore::default();
    let ingester = Ingester::new(store.clone());

    let summary = ingester.ingest_dir(dir.path()).await.unwrap();
    assert_eq!(summary.inserted, 6);
    assert_eq!(summary.skipped, 0);

    let rows = store.rows();
    assert_eq!(rows.iter().filter(|r| r.station == "D1H003").count(), 3);
    assert_eq!(rows.iter().filter(|r| r.station == "A5H006").count(), 3);
}
