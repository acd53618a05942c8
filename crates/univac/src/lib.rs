pub mod config;
pub mod error;
pub mod snapshot;
pub mod telemetry;
pub mod vaccination;
