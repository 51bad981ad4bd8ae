mod comment;
mod device;
mod device_type;
mod event;
mod request;
mod result;

pub use comment::*;
pub use device::*;
pub use device_type::*;
pub use event::*;
pub use request::*;
pub use result::*;
