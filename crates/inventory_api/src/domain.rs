mod device_service;
mod device_sheet_service;
mod device_type_service;

pub use device_service::*;
pub use device_sheet_service::*;
pub use device_type_service::*;
