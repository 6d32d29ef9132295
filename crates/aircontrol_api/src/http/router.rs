use axum::{
    routing::{get, post},
    Router,
};
use common::domain::{DeviceRepository, SensorReadingRepository};
use serde_json::json;
use std::sync::Arc;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::{device_handler, sensor_reading_handler};
use crate::domain::{DeviceLifecycleService, IngestionService, SensorReadingService};

/// Services shared by every handler
#[derive(Clone)]
pub struct AircontrolApiServices {
    pub device_lifecycle_service: Arc<DeviceLifecycleService>,
    pub ingestion_service: Arc<IngestionService>,
    pub sensor_reading_service: Arc<SensorReadingService>,
}

impl AircontrolApiServices {
    pub fn new(
        device_repository: Arc<dyn DeviceRepository>,
        sensor_reading_repository: Arc<dyn SensorReadingRepository>,
    ) -> Self {
        Self {
            device_lifecycle_service: Arc::new(DeviceLifecycleService::new(
                device_repository.clone(),
            )),
            ingestion_service: Arc::new(IngestionService::new(
                device_repository,
                sensor_reading_repository.clone(),
            )),
            sensor_reading_service: Arc::new(SensorReadingService::new(sensor_reading_repository)),
        }
    }
}

pub fn build_router(services: AircontrolApiServices) -> Router {
    Router::new()
        .route(
            "/device",
            get(device_handler::list_devices).post(device_handler::approve_device),
        )
        .route("/device/id/{device_id}", get(device_handler::get_device_by_id))
        .route(
            "/device/request",
            get(device_handler::list_requests).post(device_handler::request_device),
        )
        .route(
            "/device/request/decline",
            post(device_handler::decline_device),
        )
        .route(
            "/device/request/{mac_address}",
            get(device_handler::get_request_by_address),
        )
        .route(
            "/device/{mac_address}",
            get(device_handler::get_device_by_address),
        )
        .route(
            "/device/{mac_address}/state",
            get(device_handler::get_device_state),
        )
        .route(
            "/sensorreading",
            get(sensor_reading_handler::list_readings).post(sensor_reading_handler::ingest_reading),
        )
        .route(
            "/sensorreading/device/{device_id}",
            get(sensor_reading_handler::list_readings_by_device),
        )
        .route(
            "/healthz",
            get(|| async { axum::Json(json!({"status": "ok"})) }),
        )
        .with_state(services)
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                let request_id = req
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http",
                    %request_id,
                    method = %req.method(),
                    uri = %req.uri(),
                )
            }),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
