pub mod auth;
pub mod domain;
pub mod garde;
pub mod memory;
pub mod postgres;
pub mod rest;
pub mod telemetry;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
