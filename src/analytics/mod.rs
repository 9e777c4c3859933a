//! # Campus Analytics
//!
//! Fitted analytic components and the façade that owns them.
//!
//! ## Components
//!
//! - **AnomalyDetector**: isolation forest over hour/weekend/consumption with
//!   per-zone hourly expectations for severity and waste
//! - **ConsumptionForecaster**: per-zone polynomial ridge pipelines with trend
//!   classification
//! - **PatternClassifier**: k-means over per-zone behaviour, ranked into
//!   efficient / normal / wasteful / erratic
//! - **synthesize**: rule-based recommendations from the three reports
//! - **savings**: projected-vs-baseline savings potential per zone
//! - **AnalyticsEngine**: fits everything once, then answers queries through `&self`
//!
//! All report types serialize with camelCase field names.

pub mod anomaly;
pub mod confidence;
pub mod engine;
pub mod features;
pub mod forecast;
pub mod patterns;
pub mod recommend;
pub mod savings;

pub use anomaly::{
    Anomaly, AnomalyDetector, AnomalyKind, AnomalyReport, AnomalySummary, DetectionMetrics,
    Severity, ZoneFilter, ZoneStatistics,
};
pub use confidence::cosmetic_confidence;
pub use engine::{AnalyticsEngine, AnalyticsSnapshot};
pub use forecast::{ConsumptionForecaster, ForecastPoint, ForecastReport, ForecastTarget, Trend};
pub use patterns::{
    OrdinalRemap, PatternClass, PatternClassifier, PatternReport, ZoneFeatures, ZonePattern,
};
pub use recommend::{synthesize, Priority, Recommendation, RecommendationKind};
pub use savings::{SavingsReport, ZoneSavings};
