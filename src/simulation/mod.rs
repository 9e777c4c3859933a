//! # Telemetry Simulation Module
//!
//! Stands in for the campus metering network until a live feed is attached.
//!
//! ## Components
//!
//! - **TelemetrySimulator**: Per-zone hourly demand with peak windows, weekend
//!   modifiers, proportional noise and injected anomalies
//! - **TelemetrySource**: Seam through which the analytics engine pulls recent
//!   telemetry for each request
//!
//! ## Usage
//!
//! ```rust
//! use campus_utility_analytics::simulation::{TelemetrySimulator, TelemetrySource};
//!
//! let mut sim = TelemetrySimulator::with_seed(42);
//!
//! // 90 days of labelled history for fitting
//! let corpus = sim.generate_historical(90);
//!
//! // Last 24 hours, unlabelled, with a handful of injected spikes
//! let recent = sim.recent(24);
//! assert_eq!(recent.len(), 24 * 7);
//! # let _ = corpus;
//! ```

pub mod campus;

pub use campus::TelemetrySimulator;

use crate::domain::TelemetryRecord;

/// Provider of recent hourly telemetry for every zone
pub trait TelemetrySource {
    /// Readings covering the last `hours` hours, one per zone-hour
    fn recent(&mut self, hours: u32) -> Vec<TelemetryRecord>;
}
