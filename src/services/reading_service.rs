use chrono::NaiveDate;

use crate::db::{DbError, Reading, ReadingRepository, StationInfo, StationSeries};

#[derive(Clone)]
pub struct ReadingService {
    reading_repo: ReadingRepository,
}

impl ReadingService {
    pub fn new(reading_repo: ReadingRepository) -> Self {
        Self { reading_repo }
    }

    /// Distinct stations with chart-friendly display names
    pub async fn list_stations(&self) -> Result<Vec<StationInfo>, DbError> {
        let stations = self.reading_repo.list_stations().await?;

        Ok(stations
            .into_iter()
            .map(|s| {
                let display_name = Self::display_name(&s.station, &s.location);
                StationInfo {
                    station: s.station,
                    location: s.location,
                    display_name,
                }
            })
            .collect())
    }

    /// Full time series for one station, in chart order.
    ///
    /// An unknown station yields an empty series rather than an error,
    /// matching the empty-chart behavior of the visualization pages.
    pub async fn get_station_series(&self, station: &str) -> Result<StationSeries, DbError> {
        let readings = self.reading_repo.find_by_station(station).await?;

        let river_name = readings
            .first()
            .map(|r| Self::display_name(station, &r.location))
            .unwrap_or_else(|| station.to_string());

        Ok(StationSeries {
            station: station.to_string(),
            river_name,
            total_readings: readings.len(),
            readings,
        })
    }

    /// Latest reading for a specific station
    pub async fn get_latest_reading(&self, station: &str) -> Result<Option<Reading>, DbError> {
        self.reading_repo.find_latest(station).await
    }

    /// Delete one reading by row id. Returns false when no such row exists.
    pub async fn delete_reading(&self, id: i64) -> Result<bool, DbError> {
        Ok(self.reading_repo.delete_by_id(id).await? > 0)
    }

    /// Delete all readings for a station on an exact date, returning the count
    pub async fn delete_readings_for_date(
        &self,
        station: &str,
        date: NaiveDate,
    ) -> Result<u64, DbError> {
        self.reading_repo.delete_by_date(station, date).await
    }

    /// Human-facing river name: the part of the location before " @ ",
    /// falling back to the station code when the location is empty.
    fn display_name(station: &str, location: &str) -> String {
        if location.trim().is_empty() {
            return station.to_string();
        }

        match location.split_once(" @ ") {
            Some((river, _)) => river.trim().to_string(),
            None => location.trim().to_string(),
        }
    }
}
