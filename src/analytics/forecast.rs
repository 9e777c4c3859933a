//! Short-horizon consumption forecasting
//!
//! One polynomial ridge pipeline per zone over cyclical calendar features.
//! Campus forecasts sum the per-zone predictions; zones without a fitted
//! model fall back to a constant.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{Datelike, Duration, Local, NaiveDateTime, Timelike};
use itertools::Itertools;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::Display;
use tracing::{debug, info, warn};

use super::confidence::cosmetic_confidence;
use super::features::{forecast_features, FORECAST_FEATURES};
use crate::config::ForecastConfig;
use crate::domain::{validate_corpus, ResourceType, TelemetryRecord, Zone, WATER_PER_KWH};
use crate::error::Result;
use crate::ml::stats::{mean, round_to};
use crate::ml::training::calculate_metrics;
use crate::ml::{ModelMetadata, ModelType, RidgePipeline, ValidationMetrics};

/// Floor for a single zone's hourly prediction (kWh)
const PREDICTION_FLOOR_KWH: f64 = 0.5;
/// Trend percentages beyond this magnitude are not "stable"
const TREND_THRESHOLD_PCT: f64 = 2.0;
/// In-sample fit quality below which a zone model is reported as weak
const WEAK_FIT_MAX_MAPE: f64 = 50.0;
const WEAK_FIT_MIN_R2: f64 = 0.3;

/// What a forecast request is about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForecastTarget {
    /// Sum over every fitted zone
    Campus,
    Zone(Zone),
    /// Not a known zone; served from the fallback constant
    Unknown(String),
}

impl ForecastTarget {
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("campus") {
            ForecastTarget::Campus
        } else {
            Zone::from_str(raw)
                .map(ForecastTarget::Zone)
                .unwrap_or_else(|_| ForecastTarget::Unknown(raw.to_string()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl Trend {
    pub fn from_percent(pct: f64) -> Self {
        if pct > TREND_THRESHOLD_PCT {
            Trend::Increasing
        } else if pct < -TREND_THRESHOLD_PCT {
            Trend::Decreasing
        } else {
            Trend::Stable
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    pub hour: u32,
    pub timestamp: String,
    pub predicted: f64,
    pub baseline: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastReport {
    pub zone: String,
    pub resource_type: ResourceType,
    pub hours_ahead: u32,
    pub predictions: Vec<ForecastPoint>,
    pub trend: Trend,
    pub trend_percent: f64,
    /// Presentation value, see [`cosmetic_confidence`]
    pub confidence: f64,
    pub model_type: String,
}

/// Fitted state for one zone
#[derive(Debug)]
pub struct ZoneForecastModel {
    pipeline: RidgePipeline,
    hourly_baseline: BTreeMap<u32, f64>,
    metrics: ValidationMetrics,
}

impl ZoneForecastModel {
    fn fit(records: &[&TelemetryRecord], config: &ForecastConfig) -> Result<Self> {
        let x: Vec<Vec<f64>> = records
            .iter()
            .map(|r| forecast_features(r.hour, r.day_of_week))
            .collect();
        let y: Vec<f64> = records.iter().map(|r| r.energy_kwh).collect();

        let pipeline = RidgePipeline::fit(&x, &y, config.poly_degree, config.ridge_alpha)?;
        let metrics = calculate_metrics(&pipeline.predict(&x)?, &y)?;

        let hourly_baseline = records
            .iter()
            .map(|r| (r.hour, r.energy_kwh))
            .into_group_map()
            .into_iter()
            .filter_map(|(hour, values)| mean(&values).map(|m| (hour, m)))
            .collect();

        Ok(Self {
            pipeline,
            hourly_baseline,
            metrics,
        })
    }

    pub fn metrics(&self) -> &ValidationMetrics {
        &self.metrics
    }

    pub fn baseline_at(&self, hour: u32) -> Option<f64> {
        self.hourly_baseline.get(&hour).copied()
    }

    fn predict_at(&self, hour: u32, day_of_week: u32) -> Result<f64> {
        self.pipeline
            .predict_one(&forecast_features(hour, day_of_week))
            .map(|p| p.max(PREDICTION_FLOOR_KWH))
    }
}

/// Per-zone polynomial ridge forecaster
#[derive(Debug)]
pub struct ConsumptionForecaster {
    models: BTreeMap<Zone, ZoneForecastModel>,
    config: ForecastConfig,
    metadata: ModelMetadata,
}

impl ConsumptionForecaster {
    pub fn fit(corpus: &[TelemetryRecord], config: &ForecastConfig) -> Result<Self> {
        validate_corpus(corpus)?;

        let min_rows = RidgePipeline::min_rows(FORECAST_FEATURES.len(), config.poly_degree);
        let mut models = BTreeMap::new();
        let mut skipped = 0usize;

        for (zone, records) in corpus.iter().into_group_map_by(|r| r.zone) {
            if records.len() < min_rows {
                debug!(zone = %zone, rows = records.len(), min_rows, "zone history too short to fit");
                skipped += 1;
                continue;
            }

            let model = ZoneForecastModel::fit(&records, config)?;
            if !model.metrics.meets_quality_threshold(WEAK_FIT_MAX_MAPE, WEAK_FIT_MIN_R2) {
                warn!(
                    zone = %zone,
                    mape = model.metrics.mape,
                    r2 = model.metrics.r2,
                    "weak zone forecaster fit"
                );
            }
            debug!(
                zone = %zone,
                rows = records.len(),
                mae = model.metrics.mae,
                r2 = model.metrics.r2,
                "zone forecaster fitted"
            );
            models.insert(zone, model);
        }

        if skipped > 0 {
            warn!(
                skipped,
                fitted = models.len(),
                min_rows,
                fallback = config.fallback_kwh,
                "too little history for some zone forecasters, those zones will use fallback"
            );
        }

        info!(samples = corpus.len(), zones = models.len(), "forecaster trained");

        Ok(Self {
            models,
            config: config.clone(),
            metadata: ModelMetadata::new(ModelType::RidgeRegression, corpus.len(), &FORECAST_FEATURES),
        })
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn zones(&self) -> impl Iterator<Item = Zone> + '_ {
        self.models.keys().copied()
    }

    pub fn zone_model(&self, zone: Zone) -> Option<&ZoneForecastModel> {
        self.models.get(&zone)
    }

    pub fn model_type(&self) -> String {
        format!("Ridge Regression (Poly-{})", self.config.poly_degree)
    }

    /// Forecast the next `hours` hours starting now
    pub fn predict(&self, zone: &str, hours: u32, resource: ResourceType) -> ForecastReport {
        self.predict_from(Local::now().naive_local(), zone, hours, resource)
    }

    pub fn predict_from(
        &self,
        start: NaiveDateTime,
        zone: &str,
        hours: u32,
        resource: ResourceType,
    ) -> ForecastReport {
        let members: Vec<Option<&ZoneForecastModel>> = match ForecastTarget::parse(zone) {
            ForecastTarget::Campus if self.models.is_empty() => Zone::iter().map(|_| None).collect(),
            ForecastTarget::Campus => self.models.values().map(Some).collect(),
            ForecastTarget::Zone(z) => vec![self.models.get(&z)],
            ForecastTarget::Unknown(_) => vec![None],
        };
        if members.iter().any(Option::is_none) {
            warn!(zone, fallback = self.config.fallback_kwh, "no fitted model for zone, using fallback");
        }

        let jitter = Normal::new(0.0, self.config.jitter_std).ok();
        let mut rng = rand::thread_rng();
        let resource_scale = match resource {
            ResourceType::Energy => 1.0,
            ResourceType::Water => WATER_PER_KWH,
        };
        let width = self.config.interval_width;

        let predictions: Vec<ForecastPoint> = (0..hours as i64)
            .map(|h| {
                let timestamp = start + Duration::hours(h);
                let hour = timestamp.hour();
                let day_of_week = timestamp.weekday().num_days_from_monday();

                let (mut predicted, mut baseline) = (0.0, 0.0);
                for member in &members {
                    let (p, b) = self.zone_step(*member, hour, day_of_week);
                    predicted += p;
                    baseline += b;
                }

                if let Some(normal) = &jitter {
                    predicted *= 1.0 + normal.sample(&mut rng);
                }
                predicted *= resource_scale;
                baseline *= resource_scale;

                ForecastPoint {
                    hour,
                    timestamp: timestamp.format("%Y-%m-%d %H:%M").to_string(),
                    predicted: round_to(predicted, 2),
                    baseline: round_to(baseline, 2),
                    lower_bound: round_to(predicted * (1.0 - width), 2),
                    upper_bound: round_to(predicted * (1.0 + width), 2),
                }
            })
            .collect();

        let trend_pct = trend_percent(&predictions);

        ForecastReport {
            zone: zone.to_string(),
            resource_type: resource,
            hours_ahead: hours,
            predictions,
            trend: Trend::from_percent(trend_pct),
            trend_percent: round_to(trend_pct, 1),
            confidence: round_to(cosmetic_confidence(0.72, 0.90), 2),
            model_type: self.model_type(),
        }
    }

    /// `(predicted, baseline)` in kWh for one zone-hour
    fn zone_step(&self, model: Option<&ZoneForecastModel>, hour: u32, day_of_week: u32) -> (f64, f64) {
        let fallback = self.config.fallback_kwh;
        match model {
            Some(model) => {
                let predicted = model.predict_at(hour, day_of_week).unwrap_or_else(|e| {
                    warn!(error = %e, "zone prediction failed, using fallback");
                    fallback
                });
                (predicted, model.baseline_at(hour).unwrap_or(predicted))
            }
            None => (fallback, fallback),
        }
    }
}

/// Percent change of the second half's mean prediction over the first half's
fn trend_percent(points: &[ForecastPoint]) -> f64 {
    let (first, second) = points.split_at(points.len() / 2);
    let first_mean = mean(&first.iter().map(|p| p.predicted).collect::<Vec<_>>());
    let second_mean = mean(&second.iter().map(|p| p.predicted).collect::<Vec<_>>());

    match (first_mean, second_mean) {
        (Some(a), Some(b)) => (b - a) / a.max(1.0) * 100.0,
        _ => 0.0,
    }
}
