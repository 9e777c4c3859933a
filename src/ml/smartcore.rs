//! SmartCore model wrappers
//!
//! Thin adapters that move row-major `Vec<Vec<f64>>` data in and out of
//! SmartCore's `DenseMatrix` and map its `Failed` errors into
//! [`AnalyticsError`]. Ridge regression backs the per-zone forecasters and
//! k-means backs the pattern classifier.

use smartcore::cluster::kmeans::{KMeans, KMeansParameters};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::ridge_regression::{RidgeRegression, RidgeRegressionParameters};

use crate::error::{AnalyticsError, Result};

/// Flatten row-major data into a `DenseMatrix`
pub fn to_dense_matrix(x: &[Vec<f64>]) -> Result<DenseMatrix<f64>> {
    let n_samples = x.len();
    let n_features = x
        .first()
        .map(Vec::len)
        .ok_or_else(|| AnalyticsError::Model("cannot build matrix from empty data".to_string()))?;

    let mut flat_data = Vec::with_capacity(n_samples * n_features);
    for row in x {
        if row.len() != n_features {
            return Err(AnalyticsError::DimensionMismatch {
                expected: n_features,
                actual: row.len(),
            });
        }
        flat_data.extend_from_slice(row);
    }

    Ok(DenseMatrix::new(n_samples, n_features, flat_data, false))
}

/// L2-regularised linear regression with an explicit intercept.
///
/// Inputs are expected to be standardized already. The target is centred
/// before fitting and its mean kept as the intercept, so the penalty never
/// shrinks the intercept.
#[derive(Debug)]
pub struct RidgeModel {
    model: RidgeRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>,
    intercept: f64,
    n_features: usize,
}

impl RidgeModel {
    pub fn fit(x: &[Vec<f64>], y: &[f64], alpha: f64) -> Result<Self> {
        if x.is_empty() || y.is_empty() {
            return Err(AnalyticsError::Model("cannot train on empty dataset".to_string()));
        }
        if x.len() != y.len() {
            return Err(AnalyticsError::Model(format!(
                "feature and target count mismatch: {} rows, {} targets",
                x.len(),
                y.len()
            )));
        }

        let x_matrix = to_dense_matrix(x)?;
        let n_features = x[0].len();
        if x.len() <= n_features {
            return Err(AnalyticsError::Model(format!(
                "ridge regression needs more rows than columns: {} rows, {} columns",
                x.len(),
                n_features
            )));
        }

        let intercept = y.iter().sum::<f64>() / y.len() as f64;
        let centred: Vec<f64> = y.iter().map(|v| v - intercept).collect();

        let params = RidgeRegressionParameters::default()
            .with_alpha(alpha)
            .with_normalize(false);
        let model = RidgeRegression::fit(&x_matrix, &centred, params)
            .map_err(|e| AnalyticsError::Model(format!("ridge regression training failed: {:?}", e)))?;

        Ok(Self {
            model,
            intercept,
            n_features,
        })
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        if let Some(row) = x.iter().find(|row| row.len() != self.n_features) {
            return Err(AnalyticsError::DimensionMismatch {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        if x.is_empty() {
            return Ok(Vec::new());
        }

        let x_matrix = to_dense_matrix(x)?;
        let centred = self
            .model
            .predict(&x_matrix)
            .map_err(|e| AnalyticsError::Model(format!("ridge prediction failed: {:?}", e)))?;

        Ok(centred.into_iter().map(|v| v + self.intercept).collect())
    }
}

/// K-means clustering over standardized rows.
///
/// SmartCore rejects `k < 2`; a single cluster is handled here by assigning
/// every row to cluster 0.
#[derive(Debug)]
pub struct KMeansModel {
    model: Option<KMeans<f64, u32, DenseMatrix<f64>, Vec<u32>>>,
    k: usize,
}

impl KMeansModel {
    /// Fit and return the model together with the cluster id of every input row
    pub fn fit(x: &[Vec<f64>], k: usize, max_iter: usize) -> Result<(Self, Vec<u32>)> {
        if k == 0 || k > x.len() {
            return Err(AnalyticsError::Model(format!(
                "k-means needs 1..={} clusters, got {}",
                x.len(),
                k
            )));
        }

        let x_matrix = to_dense_matrix(x)?;
        if k == 1 {
            return Ok((Self { model: None, k }, vec![0; x.len()]));
        }

        let params = KMeansParameters::default().with_k(k).with_max_iter(max_iter);
        let model: KMeans<f64, u32, DenseMatrix<f64>, Vec<u32>> = KMeans::fit(&x_matrix, params)
            .map_err(|e| AnalyticsError::Model(format!("k-means training failed: {:?}", e)))?;

        let labels = model
            .predict(&x_matrix)
            .map_err(|e| AnalyticsError::Model(format!("k-means assignment failed: {:?}", e)))?;

        Ok((
            Self {
                model: Some(model),
                k,
            },
            labels,
        ))
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<u32>> {
        let x_matrix = to_dense_matrix(x)?;
        match &self.model {
            Some(model) => model
                .predict(&x_matrix)
                .map_err(|e| AnalyticsError::Model(format!("k-means assignment failed: {:?}", e))),
            None => Ok(vec![0; x.len()]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_matrix_rejects_ragged_rows() {
        let ragged = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(
            to_dense_matrix(&ragged),
            Err(AnalyticsError::DimensionMismatch { expected: 2, actual: 1 })
        ));
        assert!(to_dense_matrix(&[]).is_err());
    }

    #[test]
    fn test_ridge_recovers_linear_relation() {
        // y = 2x1 - 3x2 + 10 on centred inputs
        let x: Vec<Vec<f64>> = (0..40)
            .map(|i| {
                let a = (i as f64 - 20.0) / 10.0;
                let b = ((i * 7) % 13) as f64 / 6.0 - 1.0;
                vec![a, b]
            })
            .collect();
        let y: Vec<f64> = x.iter().map(|r| 2.0 * r[0] - 3.0 * r[1] + 10.0).collect();

        let model = RidgeModel::fit(&x, &y, 1e-6).unwrap();
        let predictions = model.predict(&x).unwrap();

        for (p, t) in predictions.iter().zip(y.iter()) {
            assert!((p - t).abs() < 0.2, "prediction {} vs target {}", p, t);
        }
        let target_mean = y.iter().sum::<f64>() / y.len() as f64;
        assert!((model.intercept() - target_mean).abs() < 1e-12);
    }

    #[test]
    fn test_ridge_needs_more_rows_than_columns() {
        let x = vec![vec![1.0, 2.0, 3.0], vec![2.0, 3.0, 4.0]];
        let y = vec![1.0, 2.0];
        assert!(RidgeModel::fit(&x, &y, 1.0).is_err());
    }

    #[test]
    fn test_kmeans_separates_obvious_groups() {
        let x = vec![
            vec![0.0, 0.0],
            vec![0.1, 0.1],
            vec![0.0, 0.2],
            vec![10.0, 10.0],
            vec![10.1, 9.9],
            vec![9.9, 10.2],
        ];

        let (model, labels) = KMeansModel::fit(&x, 2, 100).unwrap();
        assert_eq!(model.k(), 2);
        assert_eq!(labels.len(), 6);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[0], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[3], labels[5]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn test_kmeans_single_cluster() {
        let x = vec![vec![0.0, 1.0], vec![5.0, 2.0], vec![9.0, 3.0]];
        let (model, labels) = KMeansModel::fit(&x, 1, 10).unwrap();
        assert_eq!(labels, vec![0, 0, 0]);
        assert_eq!(model.predict(&[vec![100.0, 100.0]]).unwrap(), vec![0]);
    }

    #[test]
    fn test_kmeans_rejects_too_many_clusters() {
        let x = vec![vec![0.0], vec![1.0]];
        assert!(KMeansModel::fit(&x, 3, 10).is_err());
    }
}
