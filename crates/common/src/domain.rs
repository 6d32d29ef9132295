mod device;
mod result;
mod sensor_reading;

pub use device::*;
pub use result::*;
pub use sensor_reading::*;
