use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("unknown device: {0}")]
    DeviceNotFound(String),

    #[error("device already registered: {0}")]
    DeviceAlreadyRegistered(String),

    #[error("device already requested: {0}")]
    DeviceAlreadyRequested(String),

    #[error("device was declined: {0}")]
    DeviceDeclined(String),

    #[error("device was never requested: {0}")]
    DeviceNotRequested(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}

/// Coarse classification of a [`DomainError`], used by transport layers to
/// pick a response code and by callers deciding whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    PreconditionFailed,
    BadRequest,
    Storage,
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::DeviceNotFound(_) => ErrorKind::NotFound,
            DomainError::DeviceAlreadyRegistered(_)
            | DomainError::DeviceAlreadyRequested(_)
            | DomainError::DeviceDeclined(_) => ErrorKind::Conflict,
            DomainError::DeviceNotRequested(_) => ErrorKind::PreconditionFailed,
            DomainError::ValidationError(_) => ErrorKind::BadRequest,
            DomainError::RepositoryError(_) => ErrorKind::Storage,
        }
    }
}
