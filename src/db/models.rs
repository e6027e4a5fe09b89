use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

// Database entity models
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Reading {
    pub id: i64,
    pub station: String,
    pub location: String,
    pub year: i32,
    pub date: NaiveDate,
    pub time: String,
    pub level: Option<f64>,
    pub flow: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// A reading as produced by the CSV ingestion parser, before it has an id.
///
/// `level` and `flow` are None when the source field was empty or could
/// not be parsed as a finite number.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub station: String,
    pub location: String,
    pub year: i32,
    pub date: NaiveDate,
    pub time: String,
    pub level: Option<f64>,
    pub flow: Option<f64>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StationSummary {
    pub station: String,
    pub location: String,
}

// API response DTOs (to avoid circular dependency between services and api modules)
#[derive(Debug, Clone, Serialize)]
pub struct StationInfo {
    pub station: String,
    pub location: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StationSeries {
    pub station: String,
    pub river_name: String,
    pub total_readings: usize,
    pub readings: Vec<Reading>,
}
