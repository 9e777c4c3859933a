pub mod analytics;
pub mod config;
pub mod domain;
pub mod error;
pub mod ml;
pub mod simulation;
pub mod telemetry;
