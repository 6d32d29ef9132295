use common::domain::{
    DomainResult, ListSensorReadingsRepoInput, SensorReading, SensorReadingRepository,
};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Read side of the telemetry store
pub struct SensorReadingService {
    sensor_reading_repository: Arc<dyn SensorReadingRepository>,
}

impl SensorReadingService {
    pub fn new(sensor_reading_repository: Arc<dyn SensorReadingRepository>) -> Self {
        Self {
            sensor_reading_repository,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_readings(&self) -> DomainResult<Vec<SensorReading>> {
        let readings = self.sensor_reading_repository.list_readings().await?;
        debug!(count = readings.len(), "Listed sensor readings");
        Ok(readings)
    }

    /// Readings of one device. An unknown device id yields an empty list.
    #[instrument(skip(self))]
    pub async fn list_readings_by_device(
        &self,
        device_id: i64,
    ) -> DomainResult<Vec<SensorReading>> {
        let readings = self
            .sensor_reading_repository
            .list_readings_by_device(ListSensorReadingsRepoInput { device_id })
            .await?;
        debug!(count = readings.len(), "Listed sensor readings for device");
        Ok(readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::domain::{Measurements, MockSensorReadingRepository};

    #[tokio::test]
    async fn test_list_readings_by_device() {
        let mut mock_repo = MockSensorReadingRepository::new();
        mock_repo
            .expect_list_readings_by_device()
            .withf(|input| input.device_id == 3)
            .times(1)
            .return_once(|_| {
                Ok(vec![SensorReading {
                    reading_id: 10,
                    device_id: 3,
                    measurements: Measurements {
                        temperature: 19.0,
                        humidity: 55.0,
                        carbon_dioxide: 600.0,
                        air_quality_index: 30.0,
                    },
                    created_at: None,
                }])
            });

        let service = SensorReadingService::new(Arc::new(mock_repo));
        let readings = service.list_readings_by_device(3).await.unwrap();

        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].reading_id, 10);
    }

    #[tokio::test]
    async fn test_list_readings_empty() {
        let mut mock_repo = MockSensorReadingRepository::new();
        mock_repo
            .expect_list_readings()
            .times(1)
            .return_once(|| Ok(vec![]));

        let service = SensorReadingService::new(Arc::new(mock_repo));
        assert!(service.list_readings().await.unwrap().is_empty());
    }
}
