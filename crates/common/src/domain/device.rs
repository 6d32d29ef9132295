use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

/// A registered piece of hardware, created when an operator approves its request
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub device_id: i64,
    pub hardware_address: String,
    pub name: String,
    pub location: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// A claim that a hardware address wants to join the system.
/// `active` is true while the claim is pending; declining or approving clears it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRequest {
    pub request_id: i64,
    pub hardware_address: String,
    pub created_at: Option<DateTime<Utc>>,
    pub active: bool,
}

/// Onboarding state of a hardware address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// No request and no device
    Unknown,
    /// An active request exists and no device has been created yet
    Requested,
    /// The latest request was deactivated without creating a device
    Declined,
    /// A device exists for the address
    Registered,
}

impl DeviceState {
    /// Derive the state from what storage holds for a single address.
    /// A device always wins; otherwise the most recent request decides.
    pub fn resolve(device: Option<&Device>, latest_request: Option<&DeviceRequest>) -> Self {
        match (device, latest_request) {
            (Some(_), _) => DeviceState::Registered,
            (None, Some(request)) if request.active => DeviceState::Requested,
            (None, Some(_)) => DeviceState::Declined,
            (None, None) => DeviceState::Unknown,
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeviceState::Unknown => "unknown",
            DeviceState::Requested => "requested",
            DeviceState::Declined => "declined",
            DeviceState::Registered => "registered",
        };
        f.write_str(label)
    }
}

/// Repository input for inserting a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDeviceRepoInput {
    pub hardware_address: String,
    pub name: String,
    pub location: String,
}

/// Repository input for fetching a device by its identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetDeviceRepoInput {
    pub device_id: i64,
}

/// Repository input for fetching a device by hardware address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetDeviceByAddressRepoInput {
    pub hardware_address: String,
}

/// Repository input for inserting an active device request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDeviceRequestRepoInput {
    pub hardware_address: String,
}

/// Repository input for looking up a request by hardware address.
/// With `active_only` unset the most recent request is returned whatever its flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetDeviceRequestRepoInput {
    pub hardware_address: String,
    pub active_only: bool,
}

/// Repository input for clearing the active flag of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeactivateDeviceRequestRepoInput {
    pub hardware_address: String,
}

/// Repository input for promoting an active request to a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApproveDeviceRequestRepoInput {
    pub hardware_address: String,
    pub name: String,
    pub location: String,
}

/// Repository trait for device and device request storage.
/// Infrastructure (e.g., `common::postgres`) implements this trait.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// List all devices in storage order
    async fn list_devices(&self) -> DomainResult<Vec<Device>>;

    /// Get a device by identifier
    async fn get_device(&self, input: GetDeviceRepoInput) -> DomainResult<Option<Device>>;

    /// Get a device by hardware address
    async fn get_device_by_address(
        &self,
        input: GetDeviceByAddressRepoInput,
    ) -> DomainResult<Option<Device>>;

    /// Insert a device. Fails with `DeviceAlreadyRegistered` when the address is taken.
    async fn create_device(&self, input: CreateDeviceRepoInput) -> DomainResult<Device>;

    /// List requests that are still pending
    async fn list_active_requests(&self) -> DomainResult<Vec<DeviceRequest>>;

    /// Get a request by hardware address
    async fn get_request_by_address(
        &self,
        input: GetDeviceRequestRepoInput,
    ) -> DomainResult<Option<DeviceRequest>>;

    /// Insert an active request. Fails with `DeviceAlreadyRequested` when one is already active.
    async fn create_request(
        &self,
        input: CreateDeviceRequestRepoInput,
    ) -> DomainResult<DeviceRequest>;

    /// Clear the active flag for an address, returning the number of rows changed.
    /// Zero rows is a successful no-op.
    async fn deactivate_request(&self, input: DeactivateDeviceRequestRepoInput)
        -> DomainResult<u64>;

    /// Consume the active request and create the device as one atomic unit.
    /// Fails with `DeviceNotRequested` when no active request remains and
    /// `DeviceAlreadyRegistered` when the address already has a device;
    /// neither write is kept on failure.
    async fn approve_request(&self, input: ApproveDeviceRequestRepoInput)
        -> DomainResult<Device>;
}
