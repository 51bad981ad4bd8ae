mod client;
mod comment_repository;
mod config;
mod device_repository;
mod device_type_repository;
mod event_repository;

pub use client::*;
pub use comment_repository::*;
pub use config::*;
pub use device_repository::*;
pub use device_type_repository::*;
pub use event_repository::*;
