//! Savings potential per zone
//!
//! Compares each zone's forecast over the savings horizon with its historical
//! hourly baseline. Consumption projected above baseline is priced as
//! potential savings and converted to avoided CO₂.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::confidence::cosmetic_confidence;
use super::forecast::ConsumptionForecaster;
use crate::config::SavingsConfig;
use crate::domain::{ResourceType, Zone};
use crate::ml::stats::{mean, round_to};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSavings {
    pub zone: Zone,
    /// Forecast consumption over the horizon (kWh)
    pub current_projected: f64,
    /// Baseline consumption over the horizon (kWh)
    pub optimal_target: f64,
    /// Cost of the excess over baseline
    pub savings_potential: f64,
    /// kg CO₂
    pub co2_reduction: f64,
    /// Presentation value, see [`cosmetic_confidence`]
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsReport {
    pub zones: Vec<ZoneSavings>,
    pub total_savings: f64,
    #[serde(rename = "totalCO2Reduction")]
    pub total_co2_reduction: f64,
    pub analysis_timestamp: DateTime<FixedOffset>,
}

pub fn estimate(
    forecaster: &ConsumptionForecaster,
    cost_per_kwh: f64,
    config: &SavingsConfig,
) -> SavingsReport {
    estimate_from(Local::now().naive_local(), forecaster, cost_per_kwh, config)
}

pub fn estimate_from(
    start: NaiveDateTime,
    forecaster: &ConsumptionForecaster,
    cost_per_kwh: f64,
    config: &SavingsConfig,
) -> SavingsReport {
    let horizon = config.horizon_hours as f64;

    let zones: Vec<ZoneSavings> = forecaster
        .zones()
        .map(|zone| {
            let report = forecaster.predict_from(start, zone.name(), config.horizon_hours, ResourceType::Energy);
            let predicted: Vec<f64> = report.predictions.iter().map(|p| p.predicted).collect();
            let baseline: Vec<f64> = report.predictions.iter().map(|p| p.baseline).collect();
            let predicted_avg = mean(&predicted).unwrap_or(0.0);
            let baseline_avg = mean(&baseline).unwrap_or(0.0);

            let excess_kwh = ((predicted_avg - baseline_avg) * horizon).max(0.0);
            debug!(zone = %zone, predicted_avg, baseline_avg, excess_kwh, "zone savings estimated");

            ZoneSavings {
                zone,
                current_projected: round_to(predicted_avg * horizon, 1),
                optimal_target: round_to(baseline_avg * horizon, 1),
                savings_potential: round_to(excess_kwh * cost_per_kwh, 0),
                co2_reduction: round_to(excess_kwh * config.co2_kg_per_kwh, 1),
                confidence: round_to(cosmetic_confidence(0.70, 0.95), 2),
            }
        })
        .collect();

    let total_savings = round_to(zones.iter().map(|z| z.savings_potential).sum(), 0);
    let total_co2_reduction = round_to(zones.iter().map(|z| z.co2_reduction).sum(), 1);

    SavingsReport {
        zones,
        total_savings,
        total_co2_reduction,
        analysis_timestamp: Local::now().fixed_offset(),
    }
}
