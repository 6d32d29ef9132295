mod device_handler;
mod error;
mod router;
mod sensor_reading_handler;
mod server;

pub use device_handler::*;
pub use error::*;
pub use router::*;
pub use sensor_reading_handler::*;
pub use server::*;
