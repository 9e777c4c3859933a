use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};

/// Polynomial feature expansion without the bias column.
///
/// Emits every monomial of degree 1..=`degree` over the input features, in
/// graded order (all degree-1 terms, then degree-2, ...). Five inputs at
/// degree 3 expand to 55 terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolynomialFeatures {
    n_input: usize,
    degree: usize,
    /// Input column indices multiplied together for each output term
    terms: Vec<Vec<usize>>,
}

impl PolynomialFeatures {
    pub fn new(n_input: usize, degree: usize) -> Self {
        let terms = (1..=degree)
            .flat_map(|d| (0..n_input).combinations_with_replacement(d))
            .collect();

        Self {
            n_input,
            degree,
            terms,
        }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn n_output(&self) -> usize {
        self.terms.len()
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.n_input {
            return Err(AnalyticsError::DimensionMismatch {
                expected: self.n_input,
                actual: row.len(),
            });
        }

        Ok(self
            .terms
            .iter()
            .map(|term| term.iter().map(|&i| row[i]).product())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_width() {
        assert_eq!(PolynomialFeatures::new(5, 3).n_output(), 55);
        assert_eq!(PolynomialFeatures::new(2, 2).n_output(), 5);
        assert_eq!(PolynomialFeatures::new(3, 1).n_output(), 3);
        assert_eq!(PolynomialFeatures::new(5, 3).degree(), 3);
    }

    #[test]
    fn test_degree_two_terms() {
        let poly = PolynomialFeatures::new(2, 2);
        let expanded = poly.transform_row(&[2.0, 3.0]).unwrap();
        // a, b, a^2, ab, b^2
        assert_eq!(expanded, vec![2.0, 3.0, 4.0, 6.0, 9.0]);
    }

    #[test]
    fn test_cubic_contains_cube() {
        let poly = PolynomialFeatures::new(1, 3);
        assert_eq!(poly.transform_row(&[2.0]).unwrap(), vec![2.0, 4.0, 8.0]);
    }

    #[test]
    fn test_wrong_width_rejected() {
        let poly = PolynomialFeatures::new(5, 3);
        assert!(poly.transform_row(&[1.0, 2.0]).is_err());
    }
}
