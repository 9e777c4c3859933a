use serde::{Deserialize, Serialize};

use super::stats;
use crate::error::{AnalyticsError, Result};

/// Column-wise z-score standardization fitted on a training matrix.
///
/// Uses the population standard deviation. Constant columns get a scale of
/// 1.0, so they are centred but not blown up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let n_features = rows
            .first()
            .map(Vec::len)
            .ok_or_else(|| AnalyticsError::Model("cannot fit scaler on empty matrix".to_string()))?;

        let mut columns = vec![Vec::with_capacity(rows.len()); n_features];
        for row in rows {
            if row.len() != n_features {
                return Err(AnalyticsError::DimensionMismatch {
                    expected: n_features,
                    actual: row.len(),
                });
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(*value);
            }
        }

        let means = columns
            .iter()
            .map(|c| stats::mean(c).unwrap_or(0.0))
            .collect();
        let scales = columns
            .iter()
            .map(|c| {
                let std = stats::population_std(c);
                if std < 1e-10 {
                    1.0
                } else {
                    std
                }
            })
            .collect();

        Ok(Self { means, scales })
    }

    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.means.len() {
            return Err(AnalyticsError::DimensionMismatch {
                expected: self.means.len(),
                actual: row.len(),
            });
        }

        Ok(row
            .iter()
            .zip(self.means.iter().zip(self.scales.iter()))
            .map(|(value, (mean, scale))| (value - mean) / scale)
            .collect())
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_transform_centres_and_scales() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 10.0], vec![5.0, 10.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();

        assert_eq!(scaler.means(), &[3.0, 10.0]);
        // constant column keeps unit scale
        assert_eq!(scaler.scales()[1], 1.0);

        let transformed = scaler.transform(&rows).unwrap();
        let expected_std = (8.0f64 / 3.0).sqrt();
        assert!((transformed[0][0] + 2.0 / expected_std).abs() < 1e-12);
        assert_eq!(transformed[1][0], 0.0);
        assert!(transformed.iter().all(|r| r[1] == 0.0));
    }

    #[test]
    fn test_dimension_mismatch() {
        let scaler = StandardScaler::fit(&[vec![1.0, 2.0], vec![2.0, 3.0]]).unwrap();
        assert!(matches!(
            scaler.transform_row(&[1.0]),
            Err(AnalyticsError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_empty_matrix_rejected() {
        assert!(StandardScaler::fit(&[]).is_err());
    }
}
