mod client;
mod config;
mod device_repository;
mod migrations;
mod sensor_reading_repository;

pub use client::*;
pub use config::*;
pub use device_repository::*;
pub use migrations::*;
pub use sensor_reading_repository::*;
