use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Environmental values carried by one telemetry sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurements {
    pub temperature: f64,
    pub humidity: f64,
    pub carbon_dioxide: f64,
    pub air_quality_index: f64,
}

/// A stored telemetry sample, immutable once written
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub reading_id: i64,
    pub device_id: i64,
    pub measurements: Measurements,
    pub created_at: Option<DateTime<Utc>>,
}

/// Repository input for storing a reading against a resolved device
#[derive(Debug, Clone, PartialEq)]
pub struct CreateSensorReadingRepoInput {
    pub device_id: i64,
    pub measurements: Measurements,
}

/// Repository input for listing readings of one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSensorReadingsRepoInput {
    pub device_id: i64,
}

/// Repository trait for telemetry storage.
/// The foreign reference to a device is not checked here; callers resolve it first.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SensorReadingRepository: Send + Sync {
    async fn create_reading(
        &self,
        input: CreateSensorReadingRepoInput,
    ) -> DomainResult<SensorReading>;

    async fn list_readings(&self) -> DomainResult<Vec<SensorReading>>;

    async fn list_readings_by_device(
        &self,
        input: ListSensorReadingsRepoInput,
    ) -> DomainResult<Vec<SensorReading>>;
}
