mod actor;
mod authorization_service;
mod context;

pub use actor::*;
pub use authorization_service::*;
pub use context::*;

#[cfg(any(test, feature = "testing"))]
pub use authorization_service::MockAuthorizationProvider;
