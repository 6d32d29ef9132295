use crate::domain::{
    CreateSensorReadingRepoInput, DomainError, DomainResult, ListSensorReadingsRepoInput,
    Measurements, SensorReading, SensorReadingRepository,
};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

/// Sensor reading row in table column order. The table stores
/// `air_quality_index` before `humidity`, unlike the measurement struct.
#[derive(Debug, Clone)]
pub struct SensorReadingRow {
    pub id: i64,
    pub device_id: i64,
    pub temperature: f64,
    pub air_quality_index: f64,
    pub humidity: f64,
    pub carbon_dioxide: f64,
    pub created_at: DateTime<Utc>,
}

impl From<&tokio_postgres::Row> for SensorReadingRow {
    fn from(row: &tokio_postgres::Row) -> Self {
        SensorReadingRow {
            id: row.get(0),
            device_id: row.get(1),
            temperature: row.get(2),
            air_quality_index: row.get(3),
            humidity: row.get(4),
            carbon_dioxide: row.get(5),
            created_at: row.get(6),
        }
    }
}

/// Convert database SensorReadingRow to domain SensorReading
impl From<SensorReadingRow> for SensorReading {
    fn from(row: SensorReadingRow) -> Self {
        SensorReading {
            reading_id: row.id,
            device_id: row.device_id,
            measurements: Measurements {
                temperature: row.temperature,
                humidity: row.humidity,
                carbon_dioxide: row.carbon_dioxide,
                air_quality_index: row.air_quality_index,
            },
            created_at: Some(row.created_at),
        }
    }
}

/// PostgreSQL implementation of SensorReadingRepository trait
#[derive(Clone)]
pub struct PostgresSensorReadingRepository {
    client: PostgresClient,
}

impl PostgresSensorReadingRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SensorReadingRepository for PostgresSensorReadingRepository {
    #[instrument(skip(self, input), fields(device_id = input.device_id))]
    async fn create_reading(
        &self,
        input: CreateSensorReadingRepoInput,
    ) -> DomainResult<SensorReading> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let now = Utc::now();
        let m = input.measurements;

        let row = conn
            .query_one(
                "INSERT INTO sensor_readings (device_id, temperature, air_quality_index, humidity, carbon_dioxide, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING id",
                &[
                    &input.device_id,
                    &m.temperature,
                    &m.air_quality_index,
                    &m.humidity,
                    &m.carbon_dioxide,
                    &now,
                ],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        let reading_id: i64 = row.get(0);
        debug!(reading_id, "stored sensor reading for device: {}", input.device_id);

        Ok(SensorReading {
            reading_id,
            device_id: input.device_id,
            measurements: m,
            created_at: Some(now),
        })
    }

    #[instrument(skip(self))]
    async fn list_readings(&self) -> DomainResult<Vec<SensorReading>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                "SELECT id, device_id, temperature, air_quality_index, humidity, carbon_dioxide, created_at
                 FROM sensor_readings
                 ORDER BY id",
                &[],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!("found {} sensor readings", rows.len());

        Ok(rows
            .iter()
            .map(|row| SensorReadingRow::from(row).into())
            .collect())
    }

    #[instrument(skip(self, input), fields(device_id = input.device_id))]
    async fn list_readings_by_device(
        &self,
        input: ListSensorReadingsRepoInput,
    ) -> DomainResult<Vec<SensorReading>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                "SELECT id, device_id, temperature, air_quality_index, humidity, carbon_dioxide, created_at
                 FROM sensor_readings
                 WHERE device_id = $1
                 ORDER BY id",
                &[&input.device_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!(
            "found {} sensor readings for device: {}",
            rows.len(),
            input.device_id
        );

        Ok(rows
            .iter()
            .map(|row| SensorReadingRow::from(row).into())
            .collect())
    }
}
