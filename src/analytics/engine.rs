use serde::Serialize;
use tracing::info;

use super::anomaly::{AnomalyDetector, AnomalyReport, ZoneFilter};
use super::forecast::{ConsumptionForecaster, ForecastReport};
use super::patterns::{PatternClassifier, PatternReport};
use super::recommend::{synthesize, Recommendation};
use super::savings::{self, SavingsReport};
use crate::config::Config;
use crate::domain::{ResourceType, TelemetryRecord};
use crate::error::Result;
use crate::ml::ModelMetadata;
use crate::simulation::TelemetrySource;

/// Hours of recent telemetry inspected when building recommendations
const RECOMMENDATION_WINDOW_HOURS: u32 = 48;
/// Campus forecast horizon feeding the trend recommendation
const RECOMMENDATION_FORECAST_HOURS: u32 = 24;

/// Owns the fitted detector, forecaster and classifier.
///
/// Built once by [`AnalyticsEngine::fit_all`]; every query afterwards takes
/// `&self`, so one engine can be shared across threads.
#[derive(Debug)]
pub struct AnalyticsEngine {
    config: Config,
    detector: AnomalyDetector,
    forecaster: ConsumptionForecaster,
    classifier: PatternClassifier,
}

/// Everything the engine can say about the campus at one moment
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub anomalies: AnomalyReport,
    pub forecast: ForecastReport,
    pub patterns: PatternReport,
    pub recommendations: Vec<Recommendation>,
    pub savings: SavingsReport,
    pub models: Vec<ModelMetadata>,
}

impl AnalyticsEngine {
    pub fn fit_all(corpus: &[TelemetryRecord], config: &Config) -> Result<Self> {
        let detector = AnomalyDetector::fit(corpus, &config.anomaly)?;
        let forecaster = ConsumptionForecaster::fit(corpus, &config.forecast)?;
        let classifier = PatternClassifier::fit(corpus, &config.patterns)?;

        info!(samples = corpus.len(), "analytics engine ready");

        Ok(Self {
            config: config.clone(),
            detector,
            forecaster,
            classifier,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn detector(&self) -> &AnomalyDetector {
        &self.detector
    }

    pub fn forecaster(&self) -> &ConsumptionForecaster {
        &self.forecaster
    }

    pub fn classifier(&self) -> &PatternClassifier {
        &self.classifier
    }

    pub fn models(&self) -> Vec<ModelMetadata> {
        vec![
            self.detector.metadata().clone(),
            self.forecaster.metadata().clone(),
            self.classifier.metadata().clone(),
        ]
    }

    pub fn detect_anomalies(&self, records: &[TelemetryRecord], filter: &ZoneFilter) -> AnomalyReport {
        self.detector.detect(records, filter)
    }

    pub fn forecast(&self, zone: &str, hours: u32, resource: ResourceType) -> ForecastReport {
        self.forecaster.predict(zone, hours, resource)
    }

    pub fn classify_patterns(&self) -> PatternReport {
        self.classifier.classify_all()
    }

    pub fn recommend(
        &self,
        anomalies: &AnomalyReport,
        patterns: &PatternReport,
        forecast: &ForecastReport,
    ) -> Vec<Recommendation> {
        synthesize(anomalies, patterns, forecast)
    }

    pub fn savings_potential(&self) -> SavingsReport {
        savings::estimate(&self.forecaster, self.config.anomaly.cost_per_kwh, &self.config.savings)
    }

    /// Detect over the last 48 hours from `source`, classify, forecast the
    /// campus 24 hours ahead and synthesize recommendations
    pub fn recommendations_from<S>(&self, source: &mut S, filter: &ZoneFilter) -> Vec<Recommendation>
    where
        S: TelemetrySource + ?Sized,
    {
        let recent = source.recent(RECOMMENDATION_WINDOW_HOURS);
        let anomalies = self.detect_anomalies(&recent, filter);
        let patterns = self.classify_patterns();
        let forecast = self.forecast("campus", RECOMMENDATION_FORECAST_HOURS, ResourceType::Energy);
        self.recommend(&anomalies, &patterns, &forecast)
    }

    /// Full report over `hours` of recent telemetry from `source`
    pub fn snapshot<S>(&self, source: &mut S, hours: u32) -> AnalyticsSnapshot
    where
        S: TelemetrySource + ?Sized,
    {
        let recent = source.recent(hours);
        let anomalies = self.detect_anomalies(&recent, &ZoneFilter::All);
        let patterns = self.classify_patterns();
        let forecast = self.forecast("campus", self.config.forecast.default_hours, ResourceType::Energy);
        let recommendations = self.recommend(&anomalies, &patterns, &forecast);

        AnalyticsSnapshot {
            anomalies,
            forecast,
            patterns,
            recommendations,
            savings: self.savings_potential(),
            models: self.models(),
        }
    }
}
