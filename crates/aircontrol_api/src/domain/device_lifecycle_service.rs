use common::domain::{
    ApproveDeviceRequestRepoInput, CreateDeviceRequestRepoInput, DeactivateDeviceRequestRepoInput,
    Device, DeviceRepository, DeviceRequest, DeviceState, DomainError, DomainResult,
    GetDeviceByAddressRepoInput, GetDeviceRepoInput, GetDeviceRequestRepoInput,
};
use common::garde::not_blank;
use garde::Validate;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// ============================================================================
// Service Request Types
// ============================================================================

/// Request to put a hardware address on the onboarding list
#[derive(Debug, Clone, Validate)]
pub struct RequestDeviceRequest {
    #[garde(custom(not_blank))]
    pub hardware_address: String,
}

/// Request to promote an active device request to a registered device
#[derive(Debug, Clone, Validate)]
pub struct ApproveDeviceRequest {
    #[garde(custom(not_blank))]
    pub hardware_address: String,
    #[garde(custom(not_blank))]
    pub name: String,
    #[garde(skip)]
    pub location: String,
}

/// Request to decline a pending device request
#[derive(Debug, Clone, Validate)]
pub struct DeclineDeviceRequest {
    #[garde(custom(not_blank))]
    pub hardware_address: String,
}

/// Lookup keyed by hardware address
#[derive(Debug, Clone, Validate)]
pub struct LookupDeviceRequest {
    #[garde(custom(not_blank))]
    pub hardware_address: String,
}

/// Domain service driving the request / approve / decline state machine
pub struct DeviceLifecycleService {
    device_repository: Arc<dyn DeviceRepository>,
}

impl DeviceLifecycleService {
    pub fn new(device_repository: Arc<dyn DeviceRepository>) -> Self {
        Self { device_repository }
    }

    async fn resolve_state(&self, hardware_address: &str) -> DomainResult<DeviceState> {
        let device = self
            .device_repository
            .get_device_by_address(GetDeviceByAddressRepoInput {
                hardware_address: hardware_address.to_string(),
            })
            .await?;

        if device.is_some() {
            return Ok(DeviceState::Registered);
        }

        let latest_request = self
            .device_repository
            .get_request_by_address(GetDeviceRequestRepoInput {
                hardware_address: hardware_address.to_string(),
                active_only: false,
            })
            .await?;

        Ok(DeviceState::resolve(None, latest_request.as_ref()))
    }

    /// Create an active request for an address that has never been seen.
    ///
    /// Registered, pending and declined addresses are all rejected with a
    /// distinct conflict. Declined addresses stay declined: there is no path
    /// back to `Requested` once an operator has turned a device away.
    #[instrument(skip(self, request), fields(hardware_address = %request.hardware_address))]
    pub async fn request_device(
        &self,
        request: RequestDeviceRequest,
    ) -> DomainResult<DeviceRequest> {
        common::garde::validate_struct(&request)?;

        let state = self.resolve_state(&request.hardware_address).await?;
        debug!(%state, "Resolved device state");

        match state {
            DeviceState::Registered => {
                warn!("Request rejected, device already registered");
                return Err(DomainError::DeviceAlreadyRegistered(request.hardware_address));
            }
            DeviceState::Requested => {
                warn!("Request rejected, device already requested");
                return Err(DomainError::DeviceAlreadyRequested(request.hardware_address));
            }
            DeviceState::Declined => {
                warn!("Request rejected, device was declined");
                return Err(DomainError::DeviceDeclined(request.hardware_address));
            }
            DeviceState::Unknown => {}
        }

        let device_request = self
            .device_repository
            .create_request(CreateDeviceRequestRepoInput {
                hardware_address: request.hardware_address,
            })
            .await?;

        info!(request_id = device_request.request_id, "Device requested");
        Ok(device_request)
    }

    /// Consume the active request and register the device
    #[instrument(skip(self, request), fields(hardware_address = %request.hardware_address, name = %request.name))]
    pub async fn approve_device(&self, request: ApproveDeviceRequest) -> DomainResult<Device> {
        common::garde::validate_struct(&request)?;

        let result = self
            .device_repository
            .approve_request(ApproveDeviceRequestRepoInput {
                hardware_address: request.hardware_address,
                name: request.name,
                location: request.location,
            })
            .await;

        match result {
            Ok(device) => {
                info!(device_id = device.device_id, "Device approved");
                Ok(device)
            }
            Err(e) => {
                warn!(error = %e, "Approve rejected");
                Err(e)
            }
        }
    }

    /// Decline a pending request. Declining an address with no active request succeeds.
    #[instrument(skip(self, request), fields(hardware_address = %request.hardware_address))]
    pub async fn decline_device(&self, request: DeclineDeviceRequest) -> DomainResult<()> {
        common::garde::validate_struct(&request)?;

        let rows_affected = self
            .device_repository
            .deactivate_request(DeactivateDeviceRequestRepoInput {
                hardware_address: request.hardware_address,
            })
            .await?;

        if rows_affected == 0 {
            debug!("No active request to decline");
        } else {
            info!("Device request declined");
        }

        Ok(())
    }

    #[instrument(skip(self, request), fields(hardware_address = %request.hardware_address))]
    pub async fn get_device_by_address(
        &self,
        request: LookupDeviceRequest,
    ) -> DomainResult<Option<Device>> {
        common::garde::validate_struct(&request)?;

        self.device_repository
            .get_device_by_address(GetDeviceByAddressRepoInput {
                hardware_address: request.hardware_address,
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_device(&self, device_id: i64) -> DomainResult<Option<Device>> {
        self.device_repository
            .get_device(GetDeviceRepoInput { device_id })
            .await
    }

    #[instrument(skip(self))]
    pub async fn list_devices(&self) -> DomainResult<Vec<Device>> {
        let devices = self.device_repository.list_devices().await?;
        debug!(count = devices.len(), "Listed devices");
        Ok(devices)
    }

    /// List pending requests
    #[instrument(skip(self))]
    pub async fn list_requests(&self) -> DomainResult<Vec<DeviceRequest>> {
        let requests = self.device_repository.list_active_requests().await?;
        debug!(count = requests.len(), "Listed active requests");
        Ok(requests)
    }

    /// Most recent request for an address, whether or not it is still active
    #[instrument(skip(self, request), fields(hardware_address = %request.hardware_address))]
    pub async fn get_request_by_address(
        &self,
        request: LookupDeviceRequest,
    ) -> DomainResult<Option<DeviceRequest>> {
        common::garde::validate_struct(&request)?;

        self.device_repository
            .get_request_by_address(GetDeviceRequestRepoInput {
                hardware_address: request.hardware_address,
                active_only: false,
            })
            .await
    }

    #[instrument(skip(self, request), fields(hardware_address = %request.hardware_address))]
    pub async fn device_state(&self, request: LookupDeviceRequest) -> DomainResult<DeviceState> {
        common::garde::validate_struct(&request)?;
        self.resolve_state(&request.hardware_address).await
    }
}
