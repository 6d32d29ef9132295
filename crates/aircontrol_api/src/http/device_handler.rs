use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use common::domain::{Device, DeviceRequest};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AircontrolApiServices, ApiError};
use crate::domain::{
    ApproveDeviceRequest, DeclineDeviceRequest, LookupDeviceRequest, RequestDeviceRequest,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceResponse {
    pub id: i64,
    pub mac_address: String,
    pub name: String,
    pub localization: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Device> for DeviceResponse {
    fn from(device: Device) -> Self {
        Self {
            id: device.device_id,
            mac_address: device.hardware_address,
            name: device.name,
            localization: device.location,
            created_at: device.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRequestResponse {
    pub id: i64,
    pub mac_address: String,
    pub created_at: Option<DateTime<Utc>>,
    pub active: bool,
}

impl From<DeviceRequest> for DeviceRequestResponse {
    fn from(request: DeviceRequest) -> Self {
        Self {
            id: request.request_id,
            mac_address: request.hardware_address,
            created_at: request.created_at,
            active: request.active,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStateResponse {
    pub mac_address: String,
    pub state: String,
}

/// Body of `POST /device`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveDevicePayload {
    #[serde(default)]
    pub mac_address: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub localization: String,
}

/// Body of `POST /device/request` and `POST /device/request/decline`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAddressPayload {
    #[serde(default)]
    pub mac_address: String,
}

pub async fn list_devices(
    State(services): State<AircontrolApiServices>,
) -> Result<Json<Vec<DeviceResponse>>, ApiError> {
    let devices = services.device_lifecycle_service.list_devices().await?;
    Ok(Json(devices.into_iter().map(DeviceResponse::from).collect()))
}

pub async fn approve_device(
    State(services): State<AircontrolApiServices>,
    payload: Result<Json<ApproveDevicePayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;

    let device = services
        .device_lifecycle_service
        .approve_device(ApproveDeviceRequest {
            hardware_address: payload.mac_address,
            name: payload.name,
            location: payload.localization,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(DeviceResponse::from(device))))
}

pub async fn get_device_by_address(
    State(services): State<AircontrolApiServices>,
    mac_address: Result<Path<String>, PathRejection>,
) -> Result<Json<DeviceResponse>, ApiError> {
    let Path(mac_address) = mac_address?;

    let device = services
        .device_lifecycle_service
        .get_device_by_address(LookupDeviceRequest {
            hardware_address: mac_address.clone(),
        })
        .await?
        .ok_or_else(|| ApiError::not_found(format!("unknown device: {}", mac_address)))?;

    Ok(Json(device.into()))
}

pub async fn get_device_by_id(
    State(services): State<AircontrolApiServices>,
    device_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<DeviceResponse>, ApiError> {
    let Path(device_id) = device_id?;

    let device = services
        .device_lifecycle_service
        .get_device(device_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("unknown device: {}", device_id)))?;

    Ok(Json(device.into()))
}

pub async fn get_device_state(
    State(services): State<AircontrolApiServices>,
    mac_address: Result<Path<String>, PathRejection>,
) -> Result<Json<DeviceStateResponse>, ApiError> {
    let Path(mac_address) = mac_address?;

    let state = services
        .device_lifecycle_service
        .device_state(LookupDeviceRequest {
            hardware_address: mac_address.clone(),
        })
        .await?;

    Ok(Json(DeviceStateResponse {
        mac_address,
        state: state.to_string(),
    }))
}

pub async fn list_requests(
    State(services): State<AircontrolApiServices>,
) -> Result<Json<Vec<DeviceRequestResponse>>, ApiError> {
    let requests = services.device_lifecycle_service.list_requests().await?;
    Ok(Json(
        requests
            .into_iter()
            .map(DeviceRequestResponse::from)
            .collect(),
    ))
}

pub async fn request_device(
    State(services): State<AircontrolApiServices>,
    payload: Result<Json<DeviceAddressPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;

    let request = services
        .device_lifecycle_service
        .request_device(RequestDeviceRequest {
            hardware_address: payload.mac_address,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(DeviceRequestResponse::from(request))))
}

pub async fn get_request_by_address(
    State(services): State<AircontrolApiServices>,
    mac_address: Result<Path<String>, PathRejection>,
) -> Result<Json<DeviceRequestResponse>, ApiError> {
    let Path(mac_address) = mac_address?;

    let request = services
        .device_lifecycle_service
        .get_request_by_address(LookupDeviceRequest {
            hardware_address: mac_address.clone(),
        })
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no request for device: {}", mac_address)))?;

    Ok(Json(request.into()))
}

pub async fn decline_device(
    State(services): State<AircontrolApiServices>,
    payload: Result<Json<DeviceAddressPayload>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(payload) = payload?;
    debug!(mac_address = %payload.mac_address, "Decline requested");

    services
        .device_lifecycle_service
        .decline_device(DeclineDeviceRequest {
            hardware_address: payload.mac_address,
        })
        .await?;

    Ok(StatusCode::OK)
}
