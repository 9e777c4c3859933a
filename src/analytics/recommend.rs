//! Operator recommendations
//!
//! Pure rules over the three analytic reports. Output order is rule order:
//! anomalies, wasteful zones, rising trend, then the standing HVAC item.

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use super::anomaly::{AnomalyReport, Severity};
use super::forecast::{ForecastReport, Trend};
use super::patterns::{PatternClass, PatternReport};

/// High-severity anomalies turned into recommendations
const MAX_ANOMALY_ITEMS: usize = 3;
/// Saving credited per percentage point of off-peak ratio
const OFF_PEAK_SAVING_PER_PCT: f64 = 5.0;
const RISING_TREND_SAVING: f64 = 500.0;
const HVAC_SAVING: f64 = 340.0;
const HVAC_CONFIDENCE: f64 = 0.81;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RecommendationKind {
    Anomaly,
    Pattern,
    Forecast,
    Optimization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub action: String,
    pub confidence: f64,
    pub estimated_saving: f64,
}

pub fn synthesize(
    anomalies: &AnomalyReport,
    patterns: &PatternReport,
    forecast: &ForecastReport,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    recommendations.extend(
        anomalies
            .anomalies
            .iter()
            .filter(|a| a.severity == Severity::High)
            .take(MAX_ANOMALY_ITEMS)
            .map(|a| Recommendation {
                kind: RecommendationKind::Anomaly,
                priority: Priority::High,
                title: format!("Unusual spike in {}", a.zone),
                description: format!(
                    "Detected {:.0}% above normal at {}:00. Estimated waste: ₹{:.0}",
                    a.deviation, a.hour, a.estimated_waste
                ),
                action: format!("Investigate {} equipment immediately", a.zone),
                confidence: a.confidence,
                estimated_saving: a.estimated_waste,
            }),
    );

    recommendations.extend(
        patterns
            .patterns
            .iter()
            .filter(|p| p.classification == PatternClass::Wasteful)
            .map(|p| Recommendation {
                kind: RecommendationKind::Pattern,
                priority: Priority::Medium,
                title: format!("{} shows wasteful consumption pattern", p.zone),
                description: format!(
                    "Off-peak usage is {:.0}% of peak, suggesting equipment left running",
                    p.off_peak_ratio
                ),
                action: "Implement automated shutdown schedules".to_string(),
                confidence: p.confidence,
                estimated_saving: (p.off_peak_ratio * OFF_PEAK_SAVING_PER_PCT).round(),
            }),
    );

    if forecast.trend == Trend::Increasing {
        recommendations.push(Recommendation {
            kind: RecommendationKind::Forecast,
            priority: Priority::Medium,
            title: "Rising consumption trend detected".to_string(),
            description: format!(
                "Campus energy use projected to increase {:.1}% over the next {} hours",
                forecast.trend_percent, forecast.hours_ahead
            ),
            action: "Pre-emptively send conservation reminders".to_string(),
            confidence: forecast.confidence,
            estimated_saving: RISING_TREND_SAVING,
        });
    }

    recommendations.push(Recommendation {
        kind: RecommendationKind::Optimization,
        priority: Priority::Low,
        title: "HVAC scheduling optimization available".to_string(),
        description: "ML analysis suggests shifting cooling cycles by 30 minutes could save 12% energy during peak hours".to_string(),
        action: "Apply recommended HVAC schedule".to_string(),
        confidence: HVAC_CONFIDENCE,
        estimated_saving: HVAC_SAVING,
    });

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::anomaly::{Anomaly, AnomalyKind};
    use crate::analytics::patterns::ZonePattern;
    use crate::domain::{ResourceType, Zone};
    use std::collections::BTreeMap;

    fn anomaly(zone: Zone, severity: Severity, deviation: f64) -> Anomaly {
        Anomaly {
            zone,
            hour: 14,
            timestamp: "2024-06-10 14:00:00".to_string(),
            actual: 40.0,
            expected: 12.0,
            deviation,
            severity,
            confidence: 0.34,
            anomaly_score: -0.17,
            estimated_waste: 224.0,
            kind: AnomalyKind::Spike,
        }
    }

    fn anomaly_report(anomalies: Vec<Anomaly>) -> AnomalyReport {
        AnomalyReport {
            total_data_points: 168,
            anomaly_count: anomalies.len(),
            anomaly_rate: 0.0,
            anomalies,
            summary: Default::default(),
        }
    }

    fn pattern(zone: Zone, class: PatternClass, off_peak: f64) -> ZonePattern {
        ZonePattern {
            zone,
            classification: class,
            color: class.color().to_string(),
            icon: class.icon().to_string(),
            description: class.description().to_string(),
            avg_consumption: 8.0,
            peak_trough_ratio: 2.5,
            off_peak_ratio: off_peak,
            variability_score: 40.0,
            weekend_reduction: 10.0,
            confidence: 0.8,
        }
    }

    fn pattern_report(patterns: Vec<ZonePattern>) -> PatternReport {
        PatternReport {
            patterns,
            cluster_summary: BTreeMap::new(),
        }
    }

    fn forecast(trend: Trend, trend_percent: f64) -> ForecastReport {
        ForecastReport {
            zone: "campus".to_string(),
            resource_type: ResourceType::Energy,
            hours_ahead: 24,
            predictions: Vec::new(),
            trend,
            trend_percent,
            confidence: 0.75,
            model_type: "Ridge Regression (Poly-3)".to_string(),
        }
    }

    #[test]
    fn test_quiet_inputs_yield_only_hvac() {
        let recs = synthesize(
            &anomaly_report(vec![anomaly(Zone::Gym, Severity::Medium, 70.0)]),
            &pattern_report(vec![pattern(Zone::Gym, PatternClass::Normal, 30.0)]),
            &forecast(Trend::Stable, 0.4),
        );

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].kind, RecommendationKind::Optimization);
        assert_eq!(recs[0].priority, Priority::Low);
        assert_eq!(recs[0].confidence, 0.81);
        assert_eq!(recs[0].estimated_saving, 340.0);
    }

    #[test]
    fn test_high_anomalies_capped_at_three() {
        let anomalies = (0..5)
            .map(|i| anomaly(Zone::MainBuilding, Severity::High, 200.0 - i as f64))
            .collect();
        let recs = synthesize(
            &anomaly_report(anomalies),
            &pattern_report(vec![]),
            &forecast(Trend::Stable, 0.0),
        );

        assert_eq!(recs.len(), 4);
        assert!(recs[..3].iter().all(|r| r.priority == Priority::High));
        assert_eq!(recs[0].title, "Unusual spike in Main Building");
        assert_eq!(
            recs[0].description,
            "Detected 200% above normal at 14:00. Estimated waste: ₹224"
        );
        assert_eq!(recs[0].action, "Investigate Main Building equipment immediately");
        assert_eq!(recs[0].estimated_saving, 224.0);
    }

    #[test]
    fn test_rule_order() {
        let recs = synthesize(
            &anomaly_report(vec![anomaly(Zone::Gym, Severity::High, 150.0)]),
            &pattern_report(vec![
                pattern(Zone::HostelAFloor1, PatternClass::Wasteful, 42.6),
                pattern(Zone::Gym, PatternClass::Efficient, 20.0),
            ]),
            &forecast(Trend::Increasing, 6.25),
        );

        let kinds: Vec<_> = recs.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RecommendationKind::Anomaly,
                RecommendationKind::Pattern,
                RecommendationKind::Forecast,
                RecommendationKind::Optimization,
            ]
        );

        let wasteful = &recs[1];
        assert_eq!(wasteful.title, "Hostel A - Floor 1 shows wasteful consumption pattern");
        assert_eq!(
            wasteful.description,
            "Off-peak usage is 43% of peak, suggesting equipment left running"
        );
        assert_eq!(wasteful.estimated_saving, 213.0);

        let rising = &recs[2];
        assert!(rising.description.contains("increase 6.2%") || rising.description.contains("increase 6.3%"));
        assert!(rising.description.ends_with("over the next 24 hours"));
        assert_eq!(rising.estimated_saving, 500.0);
    }

    #[test]
    fn test_serializes_type_field() {
        let recs = synthesize(
            &anomaly_report(vec![]),
            &pattern_report(vec![]),
            &forecast(Trend::Decreasing, -5.0),
        );
        let json = serde_json::to_value(&recs[0]).unwrap();
        assert_eq!(json["type"], "optimization");
        assert_eq!(json["priority"], "low");
        assert_eq!(json["estimatedSaving"], 340.0);
    }
}
