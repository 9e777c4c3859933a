use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AnalyticsError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub simulator: SimulatorConfig,
    #[validate(nested)]
    pub anomaly: AnomalyConfig,
    #[validate(nested)]
    pub forecast: ForecastConfig,
    #[validate(nested)]
    pub patterns: PatternConfig,
    #[validate(nested)]
    pub savings: SavingsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SimulatorConfig {
    /// Days of history generated for fitting
    #[validate(range(min = 1, max = 3650))]
    pub historical_days: u32,
    /// Hours of recent telemetry generated per inference call
    #[validate(range(min = 1, max = 8760))]
    pub realtime_hours: u32,
    /// Random seed for reproducibility (None = OS entropy)
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            historical_days: 90,
            realtime_hours: 72,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnomalyConfig {
    /// Expected share of outliers in the training corpus
    #[validate(range(exclusive_min = 0.0, max = 0.5))]
    pub contamination: f64,
    #[validate(range(min = 1))]
    pub n_estimators: usize,
    /// Sub-sample drawn per isolation tree
    #[validate(range(min = 2))]
    pub max_samples: usize,
    /// Tariff used to price wasted energy
    #[validate(range(min = 0.0))]
    pub cost_per_kwh: f64,
    /// Anomalies returned in a report (summaries always cover all of them)
    #[validate(range(min = 1))]
    pub top_n: usize,
    pub seed: Option<u64>,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            contamination: 0.05,
            n_estimators: 200,
            max_samples: 256,
            cost_per_kwh: 8.0,
            top_n: 20,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ForecastConfig {
    #[validate(range(min = 1, max = 720))]
    pub default_hours: u32,
    #[validate(range(min = 1, max = 5))]
    pub poly_degree: usize,
    #[validate(range(exclusive_min = 0.0))]
    pub ridge_alpha: f64,
    /// Std of the multiplicative jitter applied to aggregate predictions
    #[validate(range(min = 0.0, max = 0.5))]
    pub jitter_std: f64,
    /// Half width of the prediction band as a fraction of the prediction
    #[validate(range(min = 0.0, max = 1.0))]
    pub interval_width: f64,
    /// Prediction used for zones without a fitted model
    #[validate(range(min = 0.0))]
    pub fallback_kwh: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            default_hours: 48,
            poly_degree: 3,
            ridge_alpha: 1.0,
            jitter_std: 0.03,
            interval_width: 0.15,
            fallback_kwh: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PatternConfig {
    #[validate(range(min = 1, max = 4))]
    pub n_clusters: usize,
    #[validate(range(min = 1))]
    pub max_iter: usize,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            n_clusters: 4,
            max_iter: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SavingsConfig {
    /// Grid emission factor (kg CO2 per kWh)
    #[validate(range(min = 0.0))]
    pub co2_kg_per_kwh: f64,
    #[validate(range(min = 1, max = 720))]
    pub horizon_hours: u32,
}

impl Default for SavingsConfig {
    fn default() -> Self {
        Self {
            co2_kg_per_kwh: 0.82,
            horizon_hours: 24,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("CAMPUS__").split("__"));
        let cfg: Config = figment.extract()?;
        cfg.validate().map_err(AnalyticsError::from)?;
        Ok(cfg)
    }
}
