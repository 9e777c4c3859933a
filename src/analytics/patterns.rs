//! Consumption-pattern classification
//!
//! Each zone is summarised by eight behavioural statistics, the summaries are
//! clustered with k-means, and the unordered cluster ids are ranked by mean
//! consumption into a fixed ordinal taxonomy:
//!
//! | rank | class     |
//! |------|-----------|
//! | 0    | efficient |
//! | 1    | normal    |
//! | 2    | wasteful  |
//! | 3    | erratic   |

use std::collections::BTreeMap;

use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};
use tracing::{debug, info};

use super::confidence::cosmetic_confidence;
use crate::config::PatternConfig;
use crate::domain::{validate_corpus, TelemetryRecord, Zone};
use crate::error::{AnalyticsError, Result};
use crate::ml::smartcore::KMeansModel;
use crate::ml::stats::{mean, percentile, round_to, sample_std};
use crate::ml::{ModelMetadata, ModelType, StandardScaler};

/// Denominator floor for every ratio feature
const RATIO_FLOOR: f64 = 0.1;
/// Hours averaged for the peak and trough levels
const EXTREME_HOURS: usize = 6;

pub const PATTERN_FEATURES: [&str; 8] = [
    "avg_consumption",
    "std_consumption",
    "cv",
    "peak_trough_ratio",
    "off_peak_ratio",
    "weekend_reduction",
    "max_spike",
    "q95",
];

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PatternClass {
    Efficient,
    Normal,
    Wasteful,
    Erratic,
}

impl PatternClass {
    /// Class for an ordinal rank; ranks outside 0..=3 read as normal
    pub fn from_rank(rank: usize) -> Self {
        match rank {
            0 => PatternClass::Efficient,
            1 => PatternClass::Normal,
            2 => PatternClass::Wasteful,
            3 => PatternClass::Erratic,
            _ => PatternClass::Normal,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            PatternClass::Efficient => "#10B981",
            PatternClass::Normal => "#6366F1",
            PatternClass::Wasteful => "#F59E0B",
            PatternClass::Erratic => "#EF4444",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            PatternClass::Efficient => "🌱",
            PatternClass::Normal => "📊",
            PatternClass::Wasteful => "⚠️",
            PatternClass::Erratic => "🔴",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PatternClass::Efficient => "Consistently below baseline with clean on/off cycles",
            PatternClass::Normal => "Consumption follows expected patterns with minor variations",
            PatternClass::Wasteful => "High off-peak usage suggests equipment left running",
            PatternClass::Erratic => "Unpredictable consumption — investigate equipment health",
        }
    }
}

/// Behavioural summary of one zone's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneFeatures {
    pub avg_consumption: f64,
    /// Sample standard deviation
    pub std_consumption: f64,
    /// Coefficient of variation
    pub cv: f64,
    /// Mean of the six highest hourly means over the six lowest
    pub peak_trough_ratio: f64,
    pub off_peak_ratio: f64,
    /// `1 - weekend / weekday`; 0 when either side is missing
    pub weekend_reduction: f64,
    pub max_spike: f64,
    pub q95: f64,
}

impl ZoneFeatures {
    pub fn from_records(records: &[&TelemetryRecord]) -> Option<Self> {
        let energy: Vec<f64> = records.iter().map(|r| r.energy_kwh).collect();
        let avg = mean(&energy)?;
        let std = sample_std(&energy);

        let hourly: Vec<f64> = records
            .iter()
            .map(|r| (r.hour, r.energy_kwh))
            .into_group_map()
            .into_values()
            .filter_map(|values| mean(&values))
            .sorted_by_key(|&v| OrderedFloat(v))
            .collect();
        let trough = mean(&hourly[..hourly.len().min(EXTREME_HOURS)])?;
        let peak = mean(&hourly[hourly.len().saturating_sub(EXTREME_HOURS)..])?;

        let (weekend, weekday): (Vec<f64>, Vec<f64>) = records
            .iter()
            .partition_map(|r| {
                if r.is_weekend {
                    itertools::Either::Left(r.energy_kwh)
                } else {
                    itertools::Either::Right(r.energy_kwh)
                }
            });
        let weekend_reduction = match (mean(&weekend), mean(&weekday)) {
            (Some(we), Some(wd)) => 1.0 - we / wd.max(RATIO_FLOOR),
            _ => 0.0,
        };

        let max = energy.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            avg_consumption: avg,
            std_consumption: std,
            cv: std / avg.max(RATIO_FLOOR),
            peak_trough_ratio: peak / trough.max(RATIO_FLOOR),
            off_peak_ratio: trough / peak.max(RATIO_FLOOR),
            weekend_reduction,
            max_spike: max / avg.max(RATIO_FLOOR),
            q95: percentile(&energy, 95.0)?,
        })
    }

    /// Column order of [`PATTERN_FEATURES`]
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.avg_consumption,
            self.std_consumption,
            self.cv,
            self.peak_trough_ratio,
            self.off_peak_ratio,
            self.weekend_reduction,
            self.max_spike,
            self.q95,
        ]
    }
}

/// Maps arbitrary k-means cluster ids onto ordinal pattern classes.
///
/// Clusters are ranked by the mean `avg_consumption` of their members,
/// lowest first. Only the first four ranks are assigned; any other cluster
/// id reads as [`PatternClass::Normal`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrdinalRemap {
    classes: BTreeMap<u32, PatternClass>,
}

impl OrdinalRemap {
    pub fn from_clusters(labels: &[u32], avg_consumption: &[f64]) -> Self {
        let classes = labels
            .iter()
            .zip(avg_consumption)
            .map(|(&label, &avg)| (label, avg))
            .into_group_map()
            .into_iter()
            .filter_map(|(label, avgs)| mean(&avgs).map(|m| (label, m)))
            .sorted_by_key(|&(label, m)| (OrderedFloat(m), label))
            .take(4)
            .enumerate()
            .map(|(rank, (label, _))| (label, PatternClass::from_rank(rank)))
            .collect();
        Self { classes }
    }

    pub fn class_of(&self, cluster: u32) -> PatternClass {
        self.classes.get(&cluster).copied().unwrap_or(PatternClass::Normal)
    }
}

#[derive(Debug, Clone)]
struct ZoneAssessment {
    features: ZoneFeatures,
    cluster: u32,
    class: PatternClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonePattern {
    pub zone: Zone,
    pub classification: PatternClass,
    pub color: String,
    pub icon: String,
    pub description: String,
    pub avg_consumption: f64,
    pub peak_trough_ratio: f64,
    /// Trough level as a percentage of peak level
    pub off_peak_ratio: f64,
    /// Coefficient of variation in percent
    pub variability_score: f64,
    /// Weekend drop relative to weekdays, in percent
    pub weekend_reduction: f64,
    /// Presentation value, see [`cosmetic_confidence`]
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternReport {
    pub patterns: Vec<ZonePattern>,
    /// Zones per class; every class is present, zeros included
    pub cluster_summary: BTreeMap<PatternClass, usize>,
}

/// K-means classifier over per-zone behaviour
#[derive(Debug)]
pub struct PatternClassifier {
    scaler: StandardScaler,
    kmeans: KMeansModel,
    remap: OrdinalRemap,
    zones: BTreeMap<Zone, ZoneAssessment>,
    metadata: ModelMetadata,
}

impl PatternClassifier {
    pub fn fit(corpus: &[TelemetryRecord], config: &PatternConfig) -> Result<Self> {
        validate_corpus(corpus)?;

        let features: BTreeMap<Zone, ZoneFeatures> = corpus
            .iter()
            .into_group_map_by(|r| r.zone)
            .into_iter()
            .filter_map(|(zone, records)| ZoneFeatures::from_records(&records).map(|f| (zone, f)))
            .collect();
        if features.is_empty() {
            return Err(AnalyticsError::EmptyCorpus);
        }

        let rows: Vec<Vec<f64>> = features.values().map(ZoneFeatures::to_vec).collect();
        let scaler = StandardScaler::fit(&rows)?;
        let scaled = scaler.transform(&rows)?;

        let k = config.n_clusters.min(rows.len());
        let (kmeans, labels) = KMeansModel::fit(&scaled, k, config.max_iter)?;

        let averages: Vec<f64> = features.values().map(|f| f.avg_consumption).collect();
        let remap = OrdinalRemap::from_clusters(&labels, &averages);

        let zones: BTreeMap<Zone, ZoneAssessment> = features
            .into_iter()
            .zip(labels)
            .map(|((zone, features), cluster)| {
                let class = remap.class_of(cluster);
                debug!(zone = %zone, cluster, class = %class, "zone classified");
                (
                    zone,
                    ZoneAssessment {
                        features,
                        cluster,
                        class,
                    },
                )
            })
            .collect();

        info!(zones = zones.len(), clusters = k, "pattern classifier trained");

        Ok(Self {
            scaler,
            kmeans,
            remap,
            metadata: ModelMetadata::new(ModelType::KMeans, zones.len(), &PATTERN_FEATURES),
            zones,
        })
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn class_of(&self, zone: Zone) -> Option<PatternClass> {
        self.zones.get(&zone).map(|a| a.class)
    }

    pub fn features_of(&self, zone: Zone) -> Option<&ZoneFeatures> {
        self.zones.get(&zone).map(|a| &a.features)
    }

    pub fn cluster_of(&self, zone: Zone) -> Option<u32> {
        self.zones.get(&zone).map(|a| a.cluster)
    }

    /// Classify a zone summary that was not part of the fit
    pub fn classify(&self, features: &ZoneFeatures) -> Result<PatternClass> {
        let scaled = self.scaler.transform_row(&features.to_vec())?;
        let cluster = self
            .kmeans
            .predict(&[scaled])?
            .first()
            .copied()
            .ok_or_else(|| AnalyticsError::Model("empty cluster assignment".to_string()))?;
        Ok(self.remap.class_of(cluster))
    }

    pub fn classify_all(&self) -> PatternReport {
        let patterns: Vec<ZonePattern> = self
            .zones
            .iter()
            .map(|(&zone, assessment)| {
                let f = &assessment.features;
                let class = assessment.class;
                ZonePattern {
                    zone,
                    classification: class,
                    color: class.color().to_string(),
                    icon: class.icon().to_string(),
                    description: class.description().to_string(),
                    avg_consumption: round_to(f.avg_consumption, 2),
                    peak_trough_ratio: round_to(f.peak_trough_ratio, 2),
                    off_peak_ratio: round_to(f.off_peak_ratio * 100.0, 1),
                    variability_score: round_to(f.cv * 100.0, 1),
                    weekend_reduction: round_to(f.weekend_reduction * 100.0, 1),
                    confidence: round_to(cosmetic_confidence(0.70, 0.95), 2),
                }
            })
            .collect();

        let cluster_summary = PatternClass::iter()
            .map(|class| {
                let count = patterns.iter().filter(|p| p.classification == class).count();
                (class, count)
            })
            .collect();

        PatternReport {
            patterns,
            cluster_summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::TelemetrySimulator;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use rstest::rstest;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 9, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn flat_zone(days: i64, level: f64) -> Vec<TelemetryRecord> {
        (0..days * 24)
            .map(|h| TelemetryRecord::new(start() + Duration::hours(h), Zone::Gym, level, level * 0.02))
            .collect()
    }

    #[rstest]
    #[case(0, PatternClass::Efficient)]
    #[case(1, PatternClass::Normal)]
    #[case(2, PatternClass::Wasteful)]
    #[case(3, PatternClass::Erratic)]
    #[case(7, PatternClass::Normal)]
    fn test_from_rank(#[case] rank: usize, #[case] expected: PatternClass) {
        assert_eq!(PatternClass::from_rank(rank), expected);
    }

    #[test]
    fn test_remap_ranks_by_mean_consumption() {
        // cluster 9 is lowest, 2 highest
        let labels = [2, 9, 5, 9, 1, 2];
        let avgs = [40.0, 3.0, 12.0, 5.0, 20.0, 50.0];
        let remap = OrdinalRemap::from_clusters(&labels, &avgs);

        assert_eq!(remap.class_of(9), PatternClass::Efficient);
        assert_eq!(remap.class_of(5), PatternClass::Normal);
        assert_eq!(remap.class_of(1), PatternClass::Wasteful);
        assert_eq!(remap.class_of(2), PatternClass::Erratic);
        assert_eq!(remap.class_of(42), PatternClass::Normal);
    }

    #[test]
    fn test_flat_zone_features() {
        let records = flat_zone(14, 4.0);
        let refs: Vec<&TelemetryRecord> = records.iter().collect();
        let features = ZoneFeatures::from_records(&refs).unwrap();

        assert_eq!(features.avg_consumption, 4.0);
        assert_eq!(features.cv, 0.0);
        assert_eq!(features.peak_trough_ratio, 1.0);
        assert_eq!(features.off_peak_ratio, 1.0);
        assert_eq!(features.weekend_reduction, 0.0);
        assert_eq!(features.max_spike, 1.0);
        assert_eq!(features.q95, 4.0);
    }

    #[test]
    fn test_weekend_reduction_zero_without_weekend_rows() {
        // Monday through Friday only
        let records = flat_zone(5, 6.0);
        let refs: Vec<&TelemetryRecord> = records.iter().collect();
        let features = ZoneFeatures::from_records(&refs).unwrap();
        assert_eq!(features.weekend_reduction, 0.0);
    }

    #[test]
    fn test_near_zero_consumption_uses_floor() {
        let records = flat_zone(7, 0.01);
        let refs: Vec<&TelemetryRecord> = records.iter().collect();
        let features = ZoneFeatures::from_records(&refs).unwrap();
        assert!((features.peak_trough_ratio - 0.1).abs() < 1e-9);
        assert!(features.cv.is_finite());
    }

    #[test]
    fn test_classify_all_covers_every_zone() {
        let corpus = TelemetrySimulator::with_seed(12).generate_historical_from(start(), 14);
        let classifier = PatternClassifier::fit(&corpus, &PatternConfig::default()).unwrap();
        let report = classifier.classify_all();

        assert_eq!(report.patterns.len(), 7);
        assert_eq!(report.cluster_summary.len(), 4);
        assert_eq!(report.cluster_summary.values().sum::<usize>(), 7);
        for pattern in &report.patterns {
            assert!((0.70..=0.95).contains(&pattern.confidence));
            assert_eq!(pattern.color, pattern.classification.color());
            assert_eq!(classifier.class_of(pattern.zone), Some(pattern.classification));
        }
    }

    #[test]
    fn test_fitted_zones_classify_back_to_their_class() {
        let corpus = TelemetrySimulator::with_seed(12).generate_historical_from(start(), 14);
        let classifier = PatternClassifier::fit(&corpus, &PatternConfig::default()).unwrap();

        for zone in Zone::iter() {
            let class = classifier.class_of(zone).unwrap();
            let cluster = classifier.cluster_of(zone).unwrap();
            assert_eq!(classifier.remap.class_of(cluster), class);

            let features = classifier.features_of(zone).unwrap();
            assert_eq!(classifier.classify(features).unwrap(), class, "{}", zone);
        }
    }

    #[test]
    fn test_single_zone_is_efficient() {
        let corpus = flat_zone(7, 5.0);
        let classifier = PatternClassifier::fit(&corpus, &PatternConfig::default()).unwrap();
        let report = classifier.classify_all();

        assert_eq!(report.patterns.len(), 1);
        assert_eq!(report.patterns[0].classification, PatternClass::Efficient);
        assert_eq!(report.cluster_summary[&PatternClass::Erratic], 0);
    }

    #[test]
    fn test_summary_serializes_with_lowercase_keys() {
        let corpus = flat_zone(7, 5.0);
        let classifier = PatternClassifier::fit(&corpus, &PatternConfig::default()).unwrap();
        let json = serde_json::to_value(classifier.classify_all()).unwrap();

        let summary = json["clusterSummary"].as_object().unwrap();
        for key in ["efficient", "normal", "wasteful", "erratic"] {
            assert!(summary.contains_key(key), "missing {}", key);
        }
        assert_eq!(json["patterns"][0]["zone"], "Gym");
        assert!(json["patterns"][0]["offPeakRatio"].is_number());
    }
}
