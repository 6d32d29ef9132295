mod device_lifecycle_service;
mod ingestion_service;
mod sensor_reading_service;

pub use device_lifecycle_service::*;
pub use ingestion_service::*;
pub use sensor_reading_service::*;
