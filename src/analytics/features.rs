//! Feature engineering for the analytics models
//!
//! Calendar fields are encoded cyclically so that hour 23 sits next to hour 0
//! and Sunday next to Monday.

use std::f64::consts::PI;

use crate::domain::TelemetryRecord;

/// Feature names of [`anomaly_features`], in column order
pub const ANOMALY_FEATURES: [&str; 4] = ["hour_sin", "hour_cos", "is_weekend", "energy"];

/// Feature names of [`forecast_features`], in column order
pub const FORECAST_FEATURES: [&str; 5] = ["hour_sin", "hour_cos", "dow_sin", "dow_cos", "is_weekend"];

/// `(sin, cos)` of `value` on a circle of circumference `period`
pub fn cyclical(value: f64, period: f64) -> (f64, f64) {
    let angle = 2.0 * PI * value / period;
    (angle.sin(), angle.cos())
}

/// Anomaly detector input: hour of day, weekend flag and the reading itself
pub fn anomaly_features(record: &TelemetryRecord) -> Vec<f64> {
    let (hour_sin, hour_cos) = cyclical(record.hour as f64, 24.0);
    vec![hour_sin, hour_cos, record.weekend_indicator(), record.energy_kwh]
}

/// Forecaster input for a calendar slot
pub fn forecast_features(hour: u32, day_of_week: u32) -> Vec<f64> {
    let (hour_sin, hour_cos) = cyclical(hour as f64, 24.0);
    let (dow_sin, dow_cos) = cyclical(day_of_week as f64, 7.0);
    let weekend = if day_of_week >= 5 { 1.0 } else { 0.0 };
    vec![hour_sin, hour_cos, dow_sin, dow_cos, weekend]
}
