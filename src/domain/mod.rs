pub mod device_service;
pub mod types;
