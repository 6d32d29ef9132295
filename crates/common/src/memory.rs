//! In-memory repositories implementing the same contracts as the PostgreSQL ones.

mod device_repository;
mod sensor_reading_repository;

pub use device_repository::*;
pub use sensor_reading_repository::*;
