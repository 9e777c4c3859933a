//! Goodness-of-fit metrics for trained regressors

use super::ValidationMetrics;
use crate::error::{AnalyticsError, Result};

/// Compare predictions against targets
pub fn calculate_metrics(predictions: &[f64], targets: &[f64]) -> Result<ValidationMetrics> {
    if predictions.len() != targets.len() {
        return Err(AnalyticsError::DimensionMismatch {
            expected: targets.len(),
            actual: predictions.len(),
        });
    }

    if predictions.is_empty() {
        return Err(AnalyticsError::Model("no predictions to evaluate".to_string()));
    }

    let n = predictions.len() as f64;

    let mae: f64 = predictions
        .iter()
        .zip(targets.iter())
        .map(|(p, t)| (p - t).abs())
        .sum::<f64>()
        / n;

    let mse: f64 = predictions
        .iter()
        .zip(targets.iter())
        .map(|(p, t)| (p - t).powi(2))
        .sum::<f64>()
        / n;
    let rmse = mse.sqrt();

    // Telemetry is floored at 0.1 kWh, but guard anyway
    let percentage_errors: Vec<f64> = predictions
        .iter()
        .zip(targets.iter())
        .filter(|(_, t)| t.abs() > 1e-10)
        .map(|(p, t)| ((p - t) / t).abs() * 100.0)
        .collect();
    let mape = if percentage_errors.is_empty() {
        0.0
    } else {
        percentage_errors.iter().sum::<f64>() / percentage_errors.len() as f64
    };

    let mean_target: f64 = targets.iter().sum::<f64>() / n;
    let ss_tot: f64 = targets.iter().map(|t| (t - mean_target).powi(2)).sum();
    let ss_res: f64 = predictions
        .iter()
        .zip(targets.iter())
        .map(|(p, t)| (t - p).powi(2))
        .sum();

    let r2 = if ss_tot.abs() < 1e-10 {
        0.0
    } else {
        1.0 - (ss_res / ss_tot)
    };

    Ok(ValidationMetrics::new(mae, rmse, mape, r2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_metrics() {
        let predictions = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let targets = vec![1.1, 2.1, 2.9, 4.2, 4.8];

        let metrics = calculate_metrics(&predictions, &targets).unwrap();

        assert!(metrics.mae < 0.3);
        assert!(metrics.rmse < 0.4);
        assert!(metrics.r2 > 0.9);
    }

    #[test]
    fn test_perfect_fit() {
        let values = vec![2.0, 4.0, 6.0];
        let metrics = calculate_metrics(&values, &values).unwrap();
        assert_eq!(metrics.mae, 0.0);
        assert_eq!(metrics.mape, 0.0);
        assert_eq!(metrics.r2, 1.0);
    }

    #[test]
    fn test_mismatch_and_empty() {
        assert!(calculate_metrics(&[1.0], &[1.0, 2.0]).is_err());
        assert!(calculate_metrics(&[], &[]).is_err());
    }
}
