use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use super::Zone;
use crate::error::{AnalyticsError, Result};

/// Lowest energy reading the simulator emits (kWh)
pub const ENERGY_FLOOR_KWH: f64 = 0.1;

/// Water usage per kWh of energy, used wherever water is derived from energy
pub const WATER_PER_KWH: f64 = 0.02;

/// Resource a forecast is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ResourceType {
    Energy,
    Water,
}

/// One hourly reading for one zone.
///
/// `hour`, `day_of_week` (0 = Monday), `month` and `is_weekend` are calendar
/// fields derived from `timestamp`; use [`TelemetryRecord::new`] to keep them
/// consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub timestamp: NaiveDateTime,
    pub zone: Zone,
    pub hour: u32,
    pub day_of_week: u32,
    pub energy_kwh: f64,
    pub water_kl: f64,
    pub is_weekend: bool,
    pub month: u32,
    /// Ground truth from the simulator. Validation only, never a model input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_anomaly: Option<bool>,
}

impl TelemetryRecord {
    pub fn new(timestamp: NaiveDateTime, zone: Zone, energy_kwh: f64, water_kl: f64) -> Self {
        let day_of_week = timestamp.weekday().num_days_from_monday();
        Self {
            timestamp,
            zone,
            hour: timestamp.hour(),
            day_of_week,
            energy_kwh,
            water_kl,
            is_weekend: day_of_week >= 5,
            month: timestamp.month(),
            is_anomaly: None,
        }
    }

    pub fn with_label(mut self, is_anomaly: bool) -> Self {
        self.is_anomaly = Some(is_anomaly);
        self
    }

    /// Weekend indicator as a model feature
    pub fn weekend_indicator(&self) -> f64 {
        if self.day_of_week >= 5 {
            1.0
        } else {
            0.0
        }
    }

    /// Check field ranges and derived-field consistency
    pub fn check(&self) -> std::result::Result<(), String> {
        if self.hour > 23 {
            return Err(format!("hour {} out of range", self.hour));
        }
        if self.day_of_week > 6 {
            return Err(format!("day_of_week {} out of range", self.day_of_week));
        }
        if !(1..=12).contains(&self.month) {
            return Err(format!("month {} out of range", self.month));
        }
        if !self.energy_kwh.is_finite() || self.energy_kwh < 0.0 {
            return Err(format!("energy_kwh {} is not a non-negative number", self.energy_kwh));
        }
        if !self.water_kl.is_finite() || self.water_kl < 0.0 {
            return Err(format!("water_kl {} is not a non-negative number", self.water_kl));
        }
        if self.is_weekend != (self.day_of_week >= 5) {
            return Err("is_weekend disagrees with day_of_week".to_string());
        }
        Ok(())
    }
}

/// Reject an empty corpus or the first malformed record in it
pub fn validate_corpus(records: &[TelemetryRecord]) -> Result<()> {
    if records.is_empty() {
        return Err(AnalyticsError::EmptyCorpus);
    }

    for (index, record) in records.iter().enumerate() {
        record
            .check()
            .map_err(|reason| AnalyticsError::MalformedRecord { index, reason })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn saturday_noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_new_derives_calendar_fields() {
        let record = TelemetryRecord::new(saturday_noon(), Zone::Gym, 4.2, 0.09);
        assert_eq!(record.hour, 12);
        assert_eq!(record.day_of_week, 5);
        assert_eq!(record.month, 6);
        assert!(record.is_weekend);
        assert_eq!(record.weekend_indicator(), 1.0);
        assert!(record.is_anomaly.is_none());
        assert!(record.check().is_ok());
    }

    #[test]
    fn test_validate_corpus_rejects_empty() {
        assert!(matches!(validate_corpus(&[]), Err(AnalyticsError::EmptyCorpus)));
    }

    #[test]
    fn test_validate_corpus_reports_index() {
        let good = TelemetryRecord::new(saturday_noon(), Zone::Gym, 4.2, 0.09);
        let mut bad = good.clone();
        bad.hour = 24;

        match validate_corpus(&[good, bad]) {
            Err(AnalyticsError::MalformedRecord { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_check_rejects_negative_energy() {
        let mut record = TelemetryRecord::new(saturday_noon(), Zone::Gym, 4.2, 0.09);
        record.energy_kwh = -1.0;
        assert!(record.check().is_err());
        record.energy_kwh = f64::NAN;
        assert!(record.check().is_err());
    }

    #[test]
    fn test_resource_type_parsing() {
        assert_eq!(ResourceType::from_str("water").unwrap(), ResourceType::Water);
        assert_eq!(ResourceType::from_str("Energy").unwrap(), ResourceType::Energy);
        assert_eq!(ResourceType::Water.to_string(), "water");
    }
}
