mod actor;
mod device_handler;
mod device_type_handler;
mod router;

pub use actor::*;
pub use device_handler::*;
pub use device_type_handler::*;
pub use router::*;
