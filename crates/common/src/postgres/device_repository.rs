use crate::domain::{
    ApproveDeviceRequestRepoInput, CreateDeviceRepoInput, CreateDeviceRequestRepoInput,
    DeactivateDeviceRequestRepoInput, Device, DeviceRepository, DeviceRequest, DomainError,
    DomainResult, GetDeviceByAddressRepoInput, GetDeviceRepoInput, GetDeviceRequestRepoInput,
};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

const INSERT_DEVICE_SQL: &str = "INSERT INTO devices (mac_address, name, localization, created_at)
     VALUES ($1, $2, $3, $4)
     RETURNING id";

const DEACTIVATE_REQUEST_SQL: &str = "UPDATE requested_devices
     SET active = false
     WHERE mac_address = $1 AND active";

// PostgreSQL error code 23505 is unique_violation
fn is_unique_violation(error: &tokio_postgres::Error) -> bool {
    error
        .as_db_error()
        .map(|db_err| db_err.code().code() == "23505")
        .unwrap_or(false)
}

fn device_from_row(row: &tokio_postgres::Row) -> Device {
    let created_at: DateTime<Utc> = row.get(4);
    Device {
        device_id: row.get(0),
        hardware_address: row.get(1),
        name: row.get(2),
        location: row.get(3), // Map localization -> location
        created_at: Some(created_at),
    }
}

fn request_from_row(row: &tokio_postgres::Row) -> DeviceRequest {
    let created_at: DateTime<Utc> = row.get(2);
    DeviceRequest {
        request_id: row.get(0),
        hardware_address: row.get(1),
        created_at: Some(created_at),
        active: row.get(3),
    }
}

/// PostgreSQL implementation of DeviceRepository trait
#[derive(Clone)]
pub struct PostgresDeviceRepository {
    client: PostgresClient,
}

impl PostgresDeviceRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DeviceRepository for PostgresDeviceRepository {
    #[instrument(skip(self))]
    async fn list_devices(&self) -> DomainResult<Vec<Device>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                "SELECT id, mac_address, name, localization, created_at
                 FROM devices
                 ORDER BY id",
                &[],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!("found {} devices", rows.len());

        Ok(rows.iter().map(device_from_row).collect())
    }

    #[instrument(skip(self, input), fields(device_id = input.device_id))]
    async fn get_device(&self, input: GetDeviceRepoInput) -> DomainResult<Option<Device>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                "SELECT id, mac_address, name, localization, created_at
                 FROM devices
                 WHERE id = $1",
                &[&input.device_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(row.as_ref().map(device_from_row))
    }

    #[instrument(skip(self, input), fields(hardware_address = %input.hardware_address))]
    async fn get_device_by_address(
        &self,
        input: GetDeviceByAddressRepoInput,
    ) -> DomainResult<Option<Device>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                "SELECT id, mac_address, name, localization, created_at
                 FROM devices
                 WHERE mac_address = $1",
                &[&input.hardware_address],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(row.as_ref().map(device_from_row))
    }

    #[instrument(skip(self, input), fields(hardware_address = %input.hardware_address))]
    async fn create_device(&self, input: CreateDeviceRepoInput) -> DomainResult<Device> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let now = Utc::now();

        let row = conn
            .query_one(
                INSERT_DEVICE_SQL,
                &[&input.hardware_address, &input.name, &input.location, &now],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DomainError::DeviceAlreadyRegistered(input.hardware_address.clone())
                } else {
                    DomainError::RepositoryError(e.into())
                }
            })?;

        let device_id: i64 = row.get(0);
        debug!(device_id, "inserted device: {}", input.hardware_address);

        Ok(Device {
            device_id,
            hardware_address: input.hardware_address,
            name: input.name,
            location: input.location,
            created_at: Some(now),
        })
    }

    #[instrument(skip(self))]
    async fn list_active_requests(&self) -> DomainResult<Vec<DeviceRequest>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                "SELECT id, mac_address, created_at, active
                 FROM requested_devices
                 WHERE active
                 ORDER BY id",
                &[],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!("found {} active device requests", rows.len());

        Ok(rows.iter().map(request_from_row).collect())
    }

    #[instrument(skip(self, input), fields(hardware_address = %input.hardware_address, active_only = input.active_only))]
    async fn get_request_by_address(
        &self,
        input: GetDeviceRequestRepoInput,
    ) -> DomainResult<Option<DeviceRequest>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        // Without the active filter the most recent request wins
        let row = conn
            .query_opt(
                "SELECT id, mac_address, created_at, active
                 FROM requested_devices
                 WHERE mac_address = $1 AND (active OR NOT $2)
                 ORDER BY created_at DESC, id DESC
                 LIMIT 1",
                &[&input.hardware_address, &input.active_only],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(row.as_ref().map(request_from_row))
    }

    #[instrument(skip(self, input), fields(hardware_address = %input.hardware_address))]
    async fn create_request(
        &self,
        input: CreateDeviceRequestRepoInput,
    ) -> DomainResult<DeviceRequest> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let now = Utc::now();

        // A racing request for the same address trips the partial unique index
        let row = conn
            .query_one(
                "INSERT INTO requested_devices (mac_address, created_at, active)
                 VALUES ($1, $2, true)
                 RETURNING id",
                &[&input.hardware_address, &now],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DomainError::DeviceAlreadyRequested(input.hardware_address.clone())
                } else {
                    DomainError::RepositoryError(e.into())
                }
            })?;

        let request_id: i64 = row.get(0);
        debug!(request_id, "inserted device request: {}", input.hardware_address);

        Ok(DeviceRequest {
            request_id,
            hardware_address: input.hardware_address,
            created_at: Some(now),
            active: true,
        })
    }

    #[instrument(skip(self, input), fields(hardware_address = %input.hardware_address))]
    async fn deactivate_request(
        &self,
        input: DeactivateDeviceRequestRepoInput,
    ) -> DomainResult<u64> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows_affected = conn
            .execute(DEACTIVATE_REQUEST_SQL, &[&input.hardware_address])
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!(rows_affected, "deactivated device request: {}", input.hardware_address);

        Ok(rows_affected)
    }

    #[instrument(skip(self, input), fields(hardware_address = %input.hardware_address))]
    async fn approve_request(
        &self,
        input: ApproveDeviceRequestRepoInput,
    ) -> DomainResult<Device> {
        let mut conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        // Both writes commit together; returning early drops the transaction,
        // which rolls it back
        let transaction = conn
            .transaction()
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        // Consuming the request first takes its row lock, so a concurrent
        // approval blocks here and then sees zero active rows
        let consumed = transaction
            .execute(DEACTIVATE_REQUEST_SQL, &[&input.hardware_address])
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        if consumed == 0 {
            return Err(DomainError::DeviceNotRequested(input.hardware_address));
        }

        let now = Utc::now();

        let row = transaction
            .query_one(
                INSERT_DEVICE_SQL,
                &[&input.hardware_address, &input.name, &input.location, &now],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DomainError::DeviceAlreadyRegistered(input.hardware_address.clone())
                } else {
                    DomainError::RepositoryError(e.into())
                }
            })?;

        let device_id: i64 = row.get(0);

        transaction
            .commit()
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!(device_id, "approved device request: {}", input.hardware_address);

        Ok(Device {
            device_id,
            hardware_address: input.hardware_address,
            name: input.name,
            location: input.location,
            created_at: Some(now),
        })
    }
}
