use crate::domain::{
    ApproveDeviceRequestRepoInput, CreateDeviceRepoInput, CreateDeviceRequestRepoInput,
    DeactivateDeviceRequestRepoInput, Device, DeviceRepository, DeviceRequest, DomainError,
    DomainResult, GetDeviceByAddressRepoInput, GetDeviceRepoInput, GetDeviceRequestRepoInput,
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct DeviceTables {
    devices: Vec<Device>,
    requests: Vec<DeviceRequest>,
    last_device_id: i64,
    last_request_id: i64,
}

impl DeviceTables {
    fn device_by_address(&self, hardware_address: &str) -> Option<&Device> {
        self.devices
            .iter()
            .find(|d| d.hardware_address == hardware_address)
    }

    fn insert_device(&mut self, input: CreateDeviceRepoInput) -> DomainResult<Device> {
        if self.device_by_address(&input.hardware_address).is_some() {
            return Err(DomainError::DeviceAlreadyRegistered(input.hardware_address));
        }

        self.last_device_id += 1;
        let device = Device {
            device_id: self.last_device_id,
            hardware_address: input.hardware_address,
            name: input.name,
            location: input.location,
            created_at: Some(Utc::now()),
        };
        self.devices.push(device.clone());
        Ok(device)
    }

    fn deactivate(&mut self, hardware_address: &str) -> u64 {
        let mut rows_affected = 0;
        for request in self
            .requests
            .iter_mut()
            .filter(|r| r.active && r.hardware_address == hardware_address)
        {
            request.active = false;
            rows_affected += 1;
        }
        rows_affected
    }
}

/// In-memory implementation of DeviceRepository.
///
/// Both tables live behind one lock, so `approve_request` observes and
/// mutates them atomically.
#[derive(Clone, Default)]
pub struct InMemoryDeviceRepository {
    tables: Arc<RwLock<DeviceTables>>,
}

impl InMemoryDeviceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceRepository for InMemoryDeviceRepository {
    async fn list_devices(&self) -> DomainResult<Vec<Device>> {
        let tables = self.tables.read().await;
        Ok(tables.devices.clone())
    }

    async fn get_device(&self, input: GetDeviceRepoInput) -> DomainResult<Option<Device>> {
        let tables = self.tables.read().await;
        Ok(tables
            .devices
            .iter()
            .find(|d| d.device_id == input.device_id)
            .cloned())
    }

    async fn get_device_by_address(
        &self,
        input: GetDeviceByAddressRepoInput,
    ) -> DomainResult<Option<Device>> {
        let tables = self.tables.read().await;
        Ok(tables.device_by_address(&input.hardware_address).cloned())
    }

    async fn create_device(&self, input: CreateDeviceRepoInput) -> DomainResult<Device> {
        let mut tables = self.tables.write().await;
        tables.insert_device(input)
    }

    async fn list_active_requests(&self) -> DomainResult<Vec<DeviceRequest>> {
        let tables = self.tables.read().await;
        Ok(tables
            .requests
            .iter()
            .filter(|r| r.active)
            .cloned()
            .collect())
    }

    async fn get_request_by_address(
        &self,
        input: GetDeviceRequestRepoInput,
    ) -> DomainResult<Option<DeviceRequest>> {
        let tables = self.tables.read().await;
        // Requests are appended, so the last match is the most recent
        Ok(tables
            .requests
            .iter()
            .rev()
            .find(|r| {
                r.hardware_address == input.hardware_address && (r.active || !input.active_only)
            })
            .cloned())
    }

    async fn create_request(
        &self,
        input: CreateDeviceRequestRepoInput,
    ) -> DomainResult<DeviceRequest> {
        let mut tables = self.tables.write().await;

        if tables
            .requests
            .iter()
            .any(|r| r.active && r.hardware_address == input.hardware_address)
        {
            return Err(DomainError::DeviceAlreadyRequested(input.hardware_address));
        }

        tables.last_request_id += 1;
        let request = DeviceRequest {
            request_id: tables.last_request_id,
            hardware_address: input.hardware_address,
            created_at: Some(Utc::now()),
            active: true,
        };
        tables.requests.push(request.clone());
        Ok(request)
    }

    async fn deactivate_request(
        &self,
        input: DeactivateDeviceRequestRepoInput,
    ) -> DomainResult<u64> {
        let mut tables = self.tables.write().await;
        Ok(tables.deactivate(&input.hardware_address))
    }

    async fn approve_request(
        &self,
        input: ApproveDeviceRequestRepoInput,
    ) -> DomainResult<Device> {
        let mut tables = self.tables.write().await;

        if !tables
            .requests
            .iter()
            .any(|r| r.active && r.hardware_address == input.hardware_address)
        {
            return Err(DomainError::DeviceNotRequested(input.hardware_address));
        }

        // Insert first: if it fails the request must stay active
        let device = tables.insert_device(CreateDeviceRepoInput {
            hardware_address: input.hardware_address,
            name: input.name,
            location: input.location,
        })?;
        tables.deactivate(&device.hardware_address);

        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "AA:BB:CC:DD:EE:FF";

    fn approve_input() -> ApproveDeviceRequestRepoInput {
        ApproveDeviceRequestRepoInput {
            hardware_address: ADDRESS.to_string(),
            name: "Living Room".to_string(),
            location: "Floor1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_active_request_rejected() {
        let repo = InMemoryDeviceRepository::new();
        let input = CreateDeviceRequestRepoInput {
            hardware_address: ADDRESS.to_string(),
        };

        repo.create_request(input.clone()).await.unwrap();
        let result = repo.create_request(input).await;
        assert!(matches!(result, Err(DomainError::DeviceAlreadyRequested(_))));
    }

    #[tokio::test]
    async fn test_approve_consumes_request() {
        let repo = InMemoryDeviceRepository::new();
        repo.create_request(CreateDeviceRequestRepoInput {
            hardware_address: ADDRESS.to_string(),
        })
        .await
        .unwrap();

        let device = repo.approve_request(approve_input()).await.unwrap();
        assert_eq!(device.device_id, 1);
        assert!(repo.list_active_requests().await.unwrap().is_empty());

        let latest = repo
            .get_request_by_address(GetDeviceRequestRepoInput {
                hardware_address: ADDRESS.to_string(),
                active_only: false,
            })
            .await
            .unwrap()
            .unwrap();
        assert!(!latest.active);
    }

    #[tokio::test]
    async fn test_approve_without_request_writes_nothing() {
        let repo = InMemoryDeviceRepository::new();

        let result = repo.approve_request(approve_input()).await;
        assert!(matches!(result, Err(DomainError::DeviceNotRequested(_))));
        assert!(repo.list_devices().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_insert_keeps_request_active() {
        let repo = InMemoryDeviceRepository::new();
        repo.create_device(CreateDeviceRepoInput {
            hardware_address: ADDRESS.to_string(),
            name: "Existing".to_string(),
            location: String::new(),
        })
        .await
        .unwrap();
        repo.create_request(CreateDeviceRequestRepoInput {
            hardware_address: ADDRESS.to_string(),
        })
        .await
        .unwrap();

        let result = repo.approve_request(approve_input()).await;
        assert!(matches!(result, Err(DomainError::DeviceAlreadyRegistered(_))));
        assert_eq!(repo.list_active_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deactivate_missing_request_is_noop() {
        let repo = InMemoryDeviceRepository::new();
        let rows = repo
            .deactivate_request(DeactivateDeviceRequestRepoInput {
                hardware_address: ADDRESS.to_string(),
            })
            .await
            .unwrap();
        assert_eq!(rows, 0);
    }
}
