pub mod ingester;
pub mod station_export;

pub use ingester::{csv_files_in, IngestError, IngestSummary, Ingester, ReadingStore};
pub use station_export::{DataRow, StationHeader};
