pub mod domain;
pub mod inventory_api;
pub mod rest;

pub use domain::*;
pub use inventory_api::*;
pub use rest::*;
