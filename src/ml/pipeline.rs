use super::{polynomial::PolynomialFeatures, scaler::StandardScaler, smartcore::RidgeModel};
use crate::error::{AnalyticsError, Result};

/// Polynomial expansion -> standardization -> ridge regression
#[derive(Debug)]
pub struct RidgePipeline {
    poly: PolynomialFeatures,
    scaler: StandardScaler,
    ridge: RidgeModel,
}

impl RidgePipeline {
    pub fn fit(x: &[Vec<f64>], y: &[f64], degree: usize, alpha: f64) -> Result<Self> {
        let n_input = x
            .first()
            .map(Vec::len)
            .ok_or_else(|| AnalyticsError::Model("cannot train on empty dataset".to_string()))?;

        let poly = PolynomialFeatures::new(n_input, degree);
        let expanded = x
            .iter()
            .map(|row| poly.transform_row(row))
            .collect::<Result<Vec<_>>>()?;

        let scaler = StandardScaler::fit(&expanded)?;
        let scaled = scaler.transform(&expanded)?;
        let ridge = RidgeModel::fit(&scaled, y, alpha)?;

        Ok(Self { poly, scaler, ridge })
    }

    /// Minimum number of training rows for `n_input` features at `degree`
    pub fn min_rows(n_input: usize, degree: usize) -> usize {
        PolynomialFeatures::new(n_input, degree).n_output() + 1
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let scaled = x
            .iter()
            .map(|row| {
                let expanded = self.poly.transform_row(row)?;
                self.scaler.transform_row(&expanded)
            })
            .collect::<Result<Vec<_>>>()?;
        self.ridge.predict(&scaled)
    }

    pub fn predict_one(&self, row: &[f64]) -> Result<f64> {
        self.predict(&[row.to_vec()])?
            .first()
            .copied()
            .ok_or_else(|| AnalyticsError::Model("empty prediction".to_string()))
    }
}
