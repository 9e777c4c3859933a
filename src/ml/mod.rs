//! Machine Learning Module
//!
//! Estimators behind the campus analytics:
//! - Isolation forest for unsupervised outlier scoring
//! - Polynomial ridge regression pipelines for consumption forecasting
//! - K-means clustering for consumption-pattern classification
//!
//! # Architecture
//! - Preprocessing (`scaler`, `polynomial`) and the isolation forest are
//!   implemented in-crate
//! - Ridge regression and k-means are SmartCore models behind `smartcore`
//! - Every fitted model carries [`ModelMetadata`]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod isolation_forest;
pub mod pipeline;
pub mod polynomial;
pub mod scaler;
pub mod smartcore;
pub mod stats;
pub mod training;

pub use isolation_forest::{IsolationForest, IsolationForestParameters};
pub use pipeline::RidgePipeline;
pub use polynomial::PolynomialFeatures;
pub use scaler::StandardScaler;

/// ML Model Type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ModelType {
    IsolationForest,
    RidgeRegression,
    KMeans,
}

impl ModelType {
    fn slug(&self) -> &'static str {
        match self {
            ModelType::IsolationForest => "isolation_forest",
            ModelType::RidgeRegression => "ridge",
            ModelType::KMeans => "kmeans",
        }
    }
}

/// ML Model Metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_id: String,
    pub model_type: ModelType,
    pub version: String,
    pub trained_at: DateTime<Utc>,
    pub training_samples: usize,
    pub feature_names: Vec<String>,
}

impl ModelMetadata {
    pub fn new(model_type: ModelType, training_samples: usize, feature_names: &[&str]) -> Self {
        Self {
            model_id: format!("{}_{}", model_type.slug(), uuid::Uuid::new_v4()),
            model_type,
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: Utc::now(),
            training_samples,
            feature_names: feature_names.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Validation Metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub mae: f64,  // Mean Absolute Error
    pub rmse: f64, // Root Mean Square Error
    pub mape: f64, // Mean Absolute Percentage Error
    pub r2: f64,   // R-squared
}

impl ValidationMetrics {
    pub fn new(mae: f64, rmse: f64, mape: f64, r2: f64) -> Self {
        Self {
            mae,
            rmse,
            mape,
            r2,
        }
    }

    /// Check if metrics meet quality thresholds
    pub fn meets_quality_threshold(&self, max_mape: f64, min_r2: f64) -> bool {
        self.mape <= max_mape && self.r2 >= min_r2
    }
}
