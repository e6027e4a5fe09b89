use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::{debug, instrument};

use crate::db::{DbError, NewReading, Reading, StationSummary};
use crate::ingest::ReadingStore;

#[derive(Clone)]
pub struct ReadingRepository {
    pool: PgPool,
}

impl ReadingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a reading unless one already exists for the same
    /// (station, date, time) triple. Returns true when a row was written.
    ///
    /// Uniqueness is enforced here rather than by a schema constraint, so
    /// the duplicate check and the insert are folded into one statement.
    #[instrument(skip(self, reading), fields(station = %reading.station, date = %reading.date, time = %reading.time))]
    pub async fn insert_if_absent(&self, reading: &NewReading) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO river_readings (station, location, year, date, time, level, flow)
            SELECT $1, $2, $3, $4, $5, $6, $7
            WHERE NOT EXISTS (
                SELECT 1 FROM river_readings
                WHERE station = $1 AND date = $4 AND time = $5
            )
            "#,
        )
        .bind(&reading.station)
        .bind(&reading.location)
        .bind(reading.year)
        .bind(reading.date)
        .bind(&reading.time)
        .bind(reading.level)
        .bind(reading.flow)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All readings for a station in chart order (year, then date, then time)
    #[instrument(skip(self))]
    pub async fn find_by_station(&self, station: &str) -> Result<Vec<Reading>, DbError> {
        debug!("Querying readings for station {}", station);

        let readings = sqlx::query_as::<_, Reading>(
            r#"
            SELECT id, station, location, year, date, time, level, flow, created_at
            FROM river_readings
            WHERE station = $1
            ORDER BY year ASC, date ASC, time ASC
            "#,
        )
        .bind(station)
        .fetch_all(&self.pool)
        .await?;

        debug!("Found {} readings for station {}", readings.len(), station);
        Ok(readings)
    }

    /// Distinct stations present in the readings table
    #[instrument(skip(self))]
    pub async fn list_stations(&self) -> Result<Vec<StationSummary>, DbError> {
        debug!("Querying distinct stations");

        let stations = sqlx::query_as::<_, StationSummary>(
            r#"
            SELECT DISTINCT station, location
            FROM river_readings
            ORDER BY station ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!("Found {} stations", stations.len());
        Ok(stations)
    }

    /// Most recent reading for a station
    #[instrument(skip(self))]
    pub async fn find_latest(&self, station: &str) -> Result<Option<Reading>, DbError> {
        debug!("Querying latest reading for station {}", station);

        let reading = sqlx::query_as::<_, Reading>(
            r#"
            SELECT id, station, location, year, date, time, level, flow, created_at
            FROM river_readings
            WHERE station = $1
            ORDER BY date DESC, time DESC
            LIMIT 1
            "#,
        )
        .bind(station)
        .fetch_optional(&self.pool)
        .await?;

        if reading.is_some() {
            debug!("Found latest reading for station {}", station);
        } else {
            debug!("No readings found for station {}", station);
        }

        Ok(reading)
    }

    /// Delete a single reading by row id. Returns the number of rows removed.
    #[instrument(skip(self))]
    pub async fn delete_by_id(&self, id: i64) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM river_readings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete all readings for a station on an exact date
    #[instrument(skip(self))]
    pub async fn delete_by_date(&self, station: &str, date: NaiveDate) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM river_readings WHERE station = $1 AND date = $2")
            .bind(station)
            .bind(date)
            .execute(&self.pool)
            .await?;

        debug!(
            "Deleted {} readings for station {} on {}",
            result.rows_affected(),
            station,
            date
        );
        Ok(result.rows_affected())
    }
}

impl ReadingStore for ReadingRepository {
    async fn insert_reading_if_absent(&self, reading: &NewReading) -> Result<bool, DbError> {
        self.insert_if_absent(reading).await
    }
}
