//! Anomaly detection over hourly zone telemetry
//!
//! An isolation forest decides *whether* a reading is unusual; the per-zone
//! hourly means learned at fit time decide *how* unusual it is relative to
//! what that zone normally draws at that hour.

use std::collections::BTreeMap;

use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tracing::{debug, info, warn};

use super::features::{anomaly_features, ANOMALY_FEATURES};
use crate::config::AnomalyConfig;
use crate::domain::{validate_corpus, TelemetryRecord, Zone};
use crate::error::{AnalyticsError, Result};
use crate::ml::stats::{mean, round_to, sample_std};
use crate::ml::{
    IsolationForest, IsolationForestParameters, ModelMetadata, ModelType, StandardScaler,
};

/// Floor applied to the expected value before computing relative deviation
const EXPECTED_FLOOR_KWH: f64 = 0.1;

/// Which zones a detection request covers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ZoneFilter {
    #[default]
    All,
    /// Case-insensitive substring of the zone display name
    Matching(String),
}

impl ZoneFilter {
    pub fn accepts(&self, zone: Zone) -> bool {
        match self {
            ZoneFilter::All => true,
            ZoneFilter::Matching(needle) => zone.matches(needle),
        }
    }
}

impl From<&str> for ZoneFilter {
    fn from(value: &str) -> Self {
        if value.eq_ignore_ascii_case("all") {
            ZoneFilter::All
        } else {
            ZoneFilter::Matching(value.to_string())
        }
    }
}

/// Severity ordered most urgent first
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    /// Classify a percentage deviation from the expected value
    pub fn from_deviation(deviation_pct: f64) -> Self {
        let magnitude = deviation_pct.abs();
        if magnitude > 100.0 {
            Severity::High
        } else if magnitude > 50.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AnomalyKind {
    Spike,
    Drop,
}

/// One flagged reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    pub zone: Zone,
    pub hour: u32,
    pub timestamp: String,
    pub actual: f64,
    pub expected: f64,
    /// Percent above (positive) or below the expected value
    pub deviation: f64,
    pub severity: Severity,
    /// Heuristic `min(1, |decision| * 2)`, not a calibrated probability
    pub confidence: f64,
    /// Forest decision value; negative for outliers
    pub anomaly_score: f64,
    /// Cost of the energy above expectation
    pub estimated_waste: f64,
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalySummary {
    pub high_count: usize,
    pub medium_count: usize,
    pub low_count: usize,
    pub total_estimated_waste: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyReport {
    pub total_data_points: usize,
    pub anomaly_count: usize,
    /// Percent of inspected readings flagged
    pub anomaly_rate: f64,
    /// Most urgent anomalies, truncated
    pub anomalies: Vec<Anomaly>,
    /// Aggregated over every flagged reading, not only `anomalies`
    pub summary: AnomalySummary,
}

/// Consumption statistics of one zone in the training corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneStatistics {
    pub mean: f64,
    pub std: f64,
    pub hourly_means: BTreeMap<u32, f64>,
}

impl ZoneStatistics {
    fn from_records(records: &[&TelemetryRecord]) -> Option<Self> {
        let hourly_means = records
            .iter()
            .map(|r| (r.hour, r.energy_kwh))
            .into_group_map()
            .into_iter()
            .filter_map(|(hour, values)| mean(&values).map(|m| (hour, m)))
            .collect();

        let energy: Vec<f64> = records.iter().map(|r| r.energy_kwh).collect();
        Some(Self {
            mean: mean(&energy)?,
            std: sample_std(&energy),
            hourly_means,
        })
    }

    /// Hourly mean, falling back to the zone mean
    pub fn expected_at(&self, hour: u32) -> f64 {
        self.hourly_means.get(&hour).copied().unwrap_or(self.mean)
    }
}

/// Agreement between outlier flags and simulator ground truth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionMetrics {
    pub evaluated: usize,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Share of evaluated readings flagged, in [0, 1]
    pub flagged_rate: f64,
}

/// Fitted isolation-forest anomaly detector
#[derive(Debug)]
pub struct AnomalyDetector {
    scaler: StandardScaler,
    forest: IsolationForest,
    zone_stats: BTreeMap<Zone, ZoneStatistics>,
    cost_per_kwh: f64,
    top_n: usize,
    metadata: ModelMetadata,
}

impl AnomalyDetector {
    pub fn fit(corpus: &[TelemetryRecord], config: &AnomalyConfig) -> Result<Self> {
        validate_corpus(corpus)?;

        let features: Vec<Vec<f64>> = corpus.iter().map(anomaly_features).collect();
        let scaler = StandardScaler::fit(&features)?;
        let scaled = scaler.transform(&features)?;

        let params = IsolationForestParameters {
            n_estimators: config.n_estimators,
            max_samples: config.max_samples,
            contamination: config.contamination,
            seed: config.seed,
        };
        let forest = IsolationForest::fit(&scaled, &params)?;

        let zone_stats: BTreeMap<Zone, ZoneStatistics> = corpus
            .iter()
            .into_group_map_by(|r| r.zone)
            .into_iter()
            .filter_map(|(zone, records)| ZoneStatistics::from_records(&records).map(|s| (zone, s)))
            .collect();

        info!(
            samples = corpus.len(),
            zones = zone_stats.len(),
            trees = forest.n_trees(),
            offset = forest.offset(),
            "anomaly detector trained"
        );

        Ok(Self {
            scaler,
            forest,
            zone_stats,
            cost_per_kwh: config.cost_per_kwh,
            top_n: config.top_n,
            metadata: ModelMetadata::new(ModelType::IsolationForest, corpus.len(), &ANOMALY_FEATURES),
        })
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn zone_statistics(&self) -> &BTreeMap<Zone, ZoneStatistics> {
        &self.zone_stats
    }

    fn decision(&self, record: &TelemetryRecord) -> Result<f64> {
        let scaled = self.scaler.transform_row(&anomaly_features(record))?;
        self.forest.decision_function(&scaled)
    }

    /// Expected consumption: zone-hour mean, then zone mean, then the reading itself
    pub fn expected_for(&self, record: &TelemetryRecord) -> f64 {
        self.zone_stats
            .get(&record.zone)
            .map(|stats| stats.expected_at(record.hour))
            .unwrap_or(record.energy_kwh)
    }

    fn annotate(&self, record: &TelemetryRecord, decision: f64) -> Anomaly {
        let actual = record.energy_kwh;
        let expected = self.expected_for(record);
        let deviation = (actual - expected) / expected.max(EXPECTED_FLOOR_KWH) * 100.0;
        let waste = (actual - expected).max(0.0) * self.cost_per_kwh;

        Anomaly {
            zone: record.zone,
            hour: record.hour,
            timestamp: record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            actual: round_to(actual, 2),
            expected: round_to(expected, 2),
            deviation: round_to(deviation, 1),
            severity: Severity::from_deviation(deviation),
            confidence: round_to((decision.abs() * 2.0).min(1.0), 2),
            anomaly_score: round_to(decision, 4),
            estimated_waste: round_to(waste, 0),
            kind: if deviation > 0.0 {
                AnomalyKind::Spike
            } else {
                AnomalyKind::Drop
            },
        }
    }

    /// Flag outliers among `records` that pass `filter`.
    ///
    /// Never fails; readings that cannot be scored are logged and skipped.
    pub fn detect(&self, records: &[TelemetryRecord], filter: &ZoneFilter) -> AnomalyReport {
        let selected: Vec<&TelemetryRecord> =
            records.iter().filter(|r| filter.accepts(r.zone)).collect();

        let mut anomalies: Vec<Anomaly> = Vec::new();
        for record in &selected {
            match self.decision(record) {
                Ok(decision) if decision < 0.0 => anomalies.push(self.annotate(record, decision)),
                Ok(_) => {}
                Err(e) => warn!(zone = %record.zone, error = %e, "skipping unscorable reading"),
            }
        }

        anomalies.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then_with(|| OrderedFloat(b.deviation.abs()).cmp(&OrderedFloat(a.deviation.abs())))
        });

        let counts = anomalies.iter().counts_by(|a| a.severity);
        let summary = AnomalySummary {
            high_count: counts.get(&Severity::High).copied().unwrap_or(0),
            medium_count: counts.get(&Severity::Medium).copied().unwrap_or(0),
            low_count: counts.get(&Severity::Low).copied().unwrap_or(0),
            total_estimated_waste: round_to(anomalies.iter().map(|a| a.estimated_waste).sum(), 0),
        };

        let total = selected.len();
        let anomaly_count = anomalies.len();
        debug!(total, anomaly_count, filter = ?filter, "anomaly detection complete");

        anomalies.truncate(self.top_n);

        AnomalyReport {
            total_data_points: total,
            anomaly_count,
            anomaly_rate: round_to(anomaly_count as f64 / total.max(1) as f64 * 100.0, 1),
            anomalies,
            summary,
        }
    }

    /// Score outlier flags against `is_anomaly` labels. Unlabelled records are ignored.
    pub fn evaluate(&self, records: &[TelemetryRecord]) -> Result<DetectionMetrics> {
        let (mut tp, mut fp, mut fn_, mut tn) = (0usize, 0usize, 0usize, 0usize);

        for record in records {
            let Some(label) = record.is_anomaly else {
                continue;
            };
            let flagged = self.decision(record)? < 0.0;
            match (flagged, label) {
                (true, true) => tp += 1,
                (true, false) => fp += 1,
                (false, true) => fn_ += 1,
                (false, false) => tn += 1,
            }
        }

        let evaluated = tp + fp + fn_ + tn;
        if evaluated == 0 {
            return Err(AnalyticsError::MissingLabels);
        }

        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Ok(DetectionMetrics {
            evaluated,
            true_positives: tp,
            false_positives: fp,
            false_negatives: fn_,
            precision,
            recall,
            f1,
            flagged_rate: ratio(tp + fp, evaluated),
        })
    }
}
