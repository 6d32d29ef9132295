use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use common::domain::{Measurements, SensorReading};
use serde::{Deserialize, Serialize};

use super::{AircontrolApiServices, ApiError};
use crate::domain::IngestSensorReadingInput;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReadingResponse {
    pub id: i64,
    pub device_id: i64,
    pub temperature: f64,
    pub humidity: f64,
    #[serde(rename = "carbondioxide")]
    pub carbon_dioxide: f64,
    pub air_quality_index: f64,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<SensorReading> for SensorReadingResponse {
    fn from(reading: SensorReading) -> Self {
        Self {
            id: reading.reading_id,
            device_id: reading.device_id,
            temperature: reading.measurements.temperature,
            humidity: reading.measurements.humidity,
            carbon_dioxide: reading.measurements.carbon_dioxide,
            air_quality_index: reading.measurements.air_quality_index,
            created_at: reading.created_at,
        }
    }
}

/// Body of `POST /sensorreading`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReadingPayload {
    #[serde(default)]
    pub device_mac_address: String,
    pub temperature: f64,
    pub humidity: f64,
    #[serde(rename = "carbondioxide")]
    pub carbon_dioxide: f64,
    pub air_quality_index: f64,
}

pub async fn list_readings(
    State(services): State<AircontrolApiServices>,
) -> Result<Json<Vec<SensorReadingResponse>>, ApiError> {
    let readings = services.sensor_reading_service.list_readings().await?;
    Ok(Json(
        readings
            .into_iter()
            .map(SensorReadingResponse::from)
            .collect(),
    ))
}

pub async fn list_readings_by_device(
    State(services): State<AircontrolApiServices>,
    device_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<SensorReadingResponse>>, ApiError> {
    let Path(device_id) = device_id?;

    let readings = services
        .sensor_reading_service
        .list_readings_by_device(device_id)
        .await?;

    Ok(Json(
        readings
            .into_iter()
            .map(SensorReadingResponse::from)
            .collect(),
    ))
}

pub async fn ingest_reading(
    State(services): State<AircontrolApiServices>,
    payload: Result<Json<SensorReadingPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;

    let reading = services
        .ingestion_service
        .ingest(IngestSensorReadingInput {
            hardware_address: payload.device_mac_address,
            measurements: Measurements {
                temperature: payload.temperature,
                humidity: payload.humidity,
                carbon_dioxide: payload.carbon_dioxide,
                air_quality_index: payload.air_quality_index,
            },
        })
        .await?;

    Ok((StatusCode::CREATED, Json(SensorReadingResponse::from(reading))))
}
