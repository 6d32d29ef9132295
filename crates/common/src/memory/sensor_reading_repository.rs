use crate::domain::{
    CreateSensorReadingRepoInput, DomainResult, ListSensorReadingsRepoInput, SensorReading,
    SensorReadingRepository,
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct ReadingTable {
    readings: Vec<SensorReading>,
    last_reading_id: i64,
}

/// In-memory implementation of SensorReadingRepository
#[derive(Clone, Default)]
pub struct InMemorySensorReadingRepository {
    table: Arc<RwLock<ReadingTable>>,
}

impl InMemorySensorReadingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SensorReadingRepository for InMemorySensorReadingRepository {
    async fn create_reading(
        &self,
        input: CreateSensorReadingRepoInput,
    ) -> DomainResult<SensorReading> {
        let mut table = self.table.write().await;
        table.last_reading_id += 1;

        let reading = SensorReading {
            reading_id: table.last_reading_id,
            device_id: input.device_id,
            measurements: input.measurements,
            created_at: Some(Utc::now()),
        };
        table.readings.push(reading.clone());
        Ok(reading)
    }

    async fn list_readings(&self) -> DomainResult<Vec<SensorReading>> {
        let table = self.table.read().await;
        Ok(table.readings.clone())
    }

    async fn list_readings_by_device(
        &self,
        input: ListSensorReadingsRepoInput,
    ) -> DomainResult<Vec<SensorReading>> {
        let table = self.table.read().await;
        Ok(table
            .readings
            .iter()
            .filter(|r| r.device_id == input.device_id)
            .cloned()
            .collect())
    }
}
