pub mod aircontrol_api;
pub mod domain;
pub mod http;

pub use aircontrol_api::*;
pub use domain::*;
pub use http::*;
