pub mod config;
pub mod consultation;
pub mod error;
pub mod knowledge;
pub mod telemetry;
