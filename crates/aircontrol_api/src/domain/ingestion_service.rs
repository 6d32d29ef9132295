use common::domain::{
    CreateSensorReadingRepoInput, DeviceRepository, DomainError, DomainResult,
    GetDeviceByAddressRepoInput, Measurements, SensorReading, SensorReadingRepository,
};
use common::garde::not_blank;
use garde::Validate;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Input for ingesting one telemetry sample on behalf of a hardware address
#[derive(Debug, Clone, Validate)]
pub struct IngestSensorReadingInput {
    #[garde(custom(not_blank))]
    pub hardware_address: String,
    #[garde(skip)]
    pub measurements: Measurements,
}

/// Domain service that binds telemetry to a registered device before storing it
///
/// Flow:
/// 1. Validate input fields
/// 2. Resolve the device by hardware address; requests and declined
///    addresses do not count
/// 3. Store the reading against the resolved device id
pub struct IngestionService {
    device_repository: Arc<dyn DeviceRepository>,
    sensor_reading_repository: Arc<dyn SensorReadingRepository>,
}

impl IngestionService {
    pub fn new(
        device_repository: Arc<dyn DeviceRepository>,
        sensor_reading_repository: Arc<dyn SensorReadingRepository>,
    ) -> Self {
        Self {
            device_repository,
            sensor_reading_repository,
        }
    }

    /// Returns `DeviceNotFound` when no device is registered for the address;
    /// nothing is written in that case.
    #[instrument(skip(self, input), fields(hardware_address = %input.hardware_address))]
    pub async fn ingest(&self, input: IngestSensorReadingInput) -> DomainResult<SensorReading> {
        common::garde::validate_struct(&input)?;

        let device = match self
            .device_repository
            .get_device_by_address(GetDeviceByAddressRepoInput {
                hardware_address: input.hardware_address.clone(),
            })
            .await?
        {
            Some(device) => device,
            None => {
                warn!("Reading rejected, unknown device");
                return Err(DomainError::DeviceNotFound(input.hardware_address));
            }
        };

        debug!(device_id = device.device_id, "Resolved device for reading");

        let reading = self
            .sensor_reading_repository
            .create_reading(CreateSensorReadingRepoInput {
                device_id: device.device_id,
                measurements: input.measurements,
            })
            .await?;

        info!(
            device_id = reading.device_id,
            reading_id = reading.reading_id,
            "Sensor reading stored"
        );
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::domain::{Device, MockDeviceRepository, MockSensorReadingRepository};

    const ADDRESS: &str = "AA:BB:CC:DD:EE:FF";

    fn measurements() -> Measurements {
        Measurements {
            temperature: 21.5,
            humidity: 40.0,
            carbon_dioxide: 410.0,
            air_quality_index: 12.0,
        }
    }

    #[tokio::test]
    async fn test_ingest_attaches_resolved_device_id() {
        let mut mock_device_repo = MockDeviceRepository::new();
        let mut mock_reading_repo = MockSensorReadingRepository::new();

        mock_device_repo
            .expect_get_device_by_address()
            .withf(|input| input.hardware_address == ADDRESS)
            .times(1)
            .return_once(|_| {
                Ok(Some(Device {
                    device_id: 42,
                    hardware_address: ADDRESS.to_string(),
                    name: "Living Room".to_string(),
                    location: "Floor1".to_string(),
                    created_at: Some(Utc::now()),
                }))
            });

        mock_reading_repo
            .expect_create_reading()
            .withf(|input| input.device_id == 42 && input.measurements.temperature == 21.5)
            .times(1)
            .return_once(|input| {
                Ok(SensorReading {
                    reading_id: 1,
                    device_id: input.device_id,
                    measurements: input.measurements,
                    created_at: Some(Utc::now()),
                })
            });

        let service =
            IngestionService::new(Arc::new(mock_device_repo), Arc::new(mock_reading_repo));
        let reading = service
            .ingest(IngestSensorReadingInput {
                hardware_address: ADDRESS.to_string(),
                measurements: measurements(),
            })
            .await
            .unwrap();

        assert_eq!(reading.device_id, 42);
        assert_eq!(reading.measurements, measurements());
    }

    #[tokio::test]
    async fn test_ingest_unknown_device() {
        let mut mock_device_repo = MockDeviceRepository::new();
        let mut mock_reading_repo = MockSensorReadingRepository::new();

        mock_device_repo
            .expect_get_device_by_address()
            .times(1)
            .return_once(|_| Ok(None));
        mock_reading_repo.expect_create_reading().times(0);

        let service =
            IngestionService::new(Arc::new(mock_device_repo), Arc::new(mock_reading_repo));
        let result = service
            .ingest(IngestSensorReadingInput {
                hardware_address: ADDRESS.to_string(),
                measurements: measurements(),
            })
            .await;

        assert!(matches!(result, Err(DomainError::DeviceNotFound(_))));
    }

    #[tokio::test]
    async fn test_ingest_blank_address() {
        let mut mock_device_repo = MockDeviceRepository::new();
        let mock_reading_repo = MockSensorReadingRepository::new();
        mock_device_repo.expect_get_device_by_address().times(0);

        let service =
            IngestionService::new(Arc::new(mock_device_repo), Arc::new(mock_reading_repo));
        let result = service
            .ingest(IngestSensorReadingInput {
                hardware_address: String::new(),
                measurements: measurements(),
            })
            .await;

        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_ingest_storage_failure_propagates() {
        let mut mock_device_repo = MockDeviceRepository::new();
        let mut mock_reading_repo = MockSensorReadingRepository::new();

        mock_device_repo
            .expect_get_device_by_address()
            .times(1)
            .return_once(|_| {
                Ok(Some(Device {
                    device_id: 7,
                    hardware_address: ADDRESS.to_string(),
                    name: "Kitchen".to_string(),
                    location: String::new(),
                    created_at: None,
                }))
            });
        mock_reading_repo
            .expect_create_reading()
            .times(1)
            .return_once(|_| Err(DomainError::RepositoryError(anyhow::anyhow!("write failed"))));

        let service =
            IngestionService::new(Arc::new(mock_device_repo), Arc::new(mock_reading_repo));
        let result = service
            .ingest(IngestSensorReadingInput {
                hardware_address: ADDRESS.to_string(),
                measurements: measurements(),
            })
            .await;

        assert!(matches!(result, Err(DomainError::RepositoryError(_))));
    }
}
