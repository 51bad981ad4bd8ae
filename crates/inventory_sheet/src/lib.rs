//! Spreadsheet codec for the device inventory.
//!
//! Export renders devices into an xlsx workbook. Import reads the first
//! worksheet of an uploaded workbook into unvalidated [`DeviceFields`] rows.
//! Neither side touches storage.
//!
//! [`DeviceFields`]: common::domain::DeviceFields

mod error;
mod export;
mod import;

pub use error::*;
pub use export::*;
pub use import::*;
