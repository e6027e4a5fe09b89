use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::db::{Reading, StationInfo, StationSeries};
use crate::services::ReadingService;

#[derive(Clone)]
pub struct AppState {
    pub reading_service: ReadingService,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub deleted: u64,
}

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/stations", get(get_stations))
        .route("/stations/{station}/readings", get(get_station_readings))
        .route("/stations/{station}/readings/latest", get(get_latest))
        .route(
            "/stations/{station}/readings/{date}",
            delete(delete_readings_for_date),
        )
        .route("/readings/{id}", delete(delete_reading))
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}

#[instrument(skip(_state))]
async fn health(State(_state): State<AppState>) -> impl IntoResponse {
    debug!("Health check requested");
    let response = HealthResponse {
        status: "healthy".to_string(),
    };
    (StatusCode::OK, Json(response))
}

#[instrument(skip(state))]
async fn get_stations(
    State(state): State<AppState>,
) -> Result<Json<Vec<StationInfo>>, StatusCode> {
    debug!("Fetching station list");
    let stations = state.reading_service.list_stations().await.map_err(|e| {
        error!("Failed to fetch station list: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    info!("Retrieved {} stations", stations.len());
    Ok(Json(stations))
}

#[instrument(skip(state), fields(station = %station))]
async fn get_station_readings(
    State(state): State<AppState>,
    Path(station): Path<String>,
) -> Result<Json<StationSeries>, StatusCode> {
    debug!("Fetching readings for station {}", station);
    let series = state
        .reading_service
        .get_station_series(&station)
        .await
        .map_err(|e| {
            error!("Failed to fetch readings for station {}: {}", station, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if series.total_readings == 0 {
        warn!("No readings found for station {}", station);
    }

    info!(
        "Retrieved {} readings for station {} ({})",
        series.total_readings, station, series.river_name
    );
    Ok(Json(series))
}

#[instrument(skip(state), fields(station = %station))]
async fn get_latest(
    State(state): State<AppState>,
    Path(station): Path<String>,
) -> Result<Json<Reading>, StatusCode> {
    debug!("Fetching latest reading for station {}", station);
    let reading = state
        .reading_service
        .get_latest_reading(&station)
        .await
        .map_err(|e| {
            error!("Failed to fetch latest reading for station {}: {}", station, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or_else(|| {
            warn!("No readings found for station {}", station);
            StatusCode::NOT_FOUND
        })?;

    info!(
        "Retrieved latest reading for station {} from {} {}",
        station, reading.date, reading.time
    );
    Ok(Json(reading))
}

#[instrument(skip(state), fields(id = %id))]
async fn delete_reading(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, StatusCode> {
    debug!("Deleting reading {}", id);
    let deleted = state.reading_service.delete_reading(id).await.map_err(|e| {
        error!("Failed to delete reading {}: {}", id, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    if !deleted {
        warn!("Reading {} not found", id);
        return Err(StatusCode::NOT_FOUND);
    }

    info!("Deleted reading {}", id);
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state), fields(station = %station, date = %date))]
async fn delete_readings_for_date(
    State(state): State<AppState>,
    Path((station, date)): Path<(String, NaiveDate)>,
) -> Result<Json<DeleteResponse>, StatusCode> {
    debug!("Deleting readings for station {} on {}", station, date);
    let deleted = state
        .reading_service
        .delete_readings_for_date(&station, date)
        .await
        .map_err(|e| {
            error!(
                "Failed to delete readings for station {} on {}: {}",
                station, date, e
            );
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    info!("Deleted {} readings for station {} on {}", deleted, station, date);
    Ok(Json(DeleteResponse { deleted }))
}
