//! Bias and limits of agreement.
//!
//! The bias is the mean of every observed difference, each row weighted
//! equally. The limits are `bias ± z · SD`, with `z = 1.96` targeting a 95%
//! interval under approximate normality of the differences.

use serde::{Deserialize, Serialize};

use u_numflow::special::inverse_normal_cdf;
use u_numflow::stats;

use crate::dataset::Dataset;
use crate::error::{AgreementError, Result};

/// Multiplier for 95% limits of agreement.
pub const LOA_MULTIPLIER: f64 = 1.96;

/// Mean bias and the limits of agreement around it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitsOfAgreement {
    /// Mean difference between the two methods.
    pub bias: f64,
    /// bias − multiplier · SD.
    pub lower: f64,
    /// bias + multiplier · SD.
    pub upper: f64,
    /// The z multiplier used.
    pub multiplier: f64,
}

impl LimitsOfAgreement {
    /// Width of the interval, `upper − lower`.
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Two-sided normal multiplier for the given coverage probability.
///
/// Returns `None` unless `0 < coverage < 1`.
///
/// # Examples
///
/// ```
/// use u_agreement::limits::multiplier_for_coverage;
///
/// let z = multiplier_for_coverage(0.95).unwrap();
/// assert!((z - 1.96).abs() < 1e-3);
/// assert!(multiplier_for_coverage(1.0).is_none());
/// ```
pub fn multiplier_for_coverage(coverage: f64) -> Option<f64> {
    if !(coverage > 0.0 && coverage < 1.0) {
        return None;
    }
    Some(inverse_normal_cdf((1.0 + coverage) / 2.0))
}

/// Computes the bias and `bias ± multiplier · sd`.
///
/// # Errors
///
/// [`AgreementError::InvalidInput`] if `sd` is negative or not finite, or if
/// `multiplier` is not positive and finite.
///
/// # Examples
///
/// ```
/// use u_agreement::{limits::{limits_of_agreement, LOA_MULTIPLIER}, Dataset};
///
/// let data = Dataset::from_pairs([("A", 1.0), ("A", 1.0), ("B", 3.0), ("B", 3.0)]).unwrap();
/// let loa = limits_of_agreement(&data, 1.0, LOA_MULTIPLIER).unwrap();
/// assert_eq!(loa.bias, 2.0);
/// assert!((loa.lower - 0.04).abs() < 1e-12);
/// assert!((loa.upper - 3.96).abs() < 1e-12);
/// ```
pub fn limits_of_agreement(data: &Dataset, sd: f64, multiplier: f64) -> Result<LimitsOfAgreement> {
    if !sd.is_finite() || sd < 0.0 {
        return Err(AgreementError::InvalidInput(format!(
            "SD must be finite and non-negative, got {sd}"
        )));
    }
    if !multiplier.is_finite() || multiplier <= 0.0 {
        return Err(AgreementError::InvalidInput(format!(
            "multiplier must be positive and finite, got {multiplier}"
        )));
    }

    let bias = stats::mean(&data.values())
        .ok_or_else(|| AgreementError::InvalidInput("dataset is empty".into()))?;
    let half_width = multiplier * sd;

    Ok(LimitsOfAgreement {
        bias,
        lower: bias - half_width,
        upper: bias + half_width,
        multiplier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bias_weights_rows_not_subjects() {
        // Subject means are 0 and 10; row mean is (0 * 3 + 10) / 4 = 2.5.
        let data = Dataset::from_pairs([("A", 0.0), ("A", 0.0), ("A", 0.0), ("B", 10.0)]).unwrap();
        let loa = limits_of_agreement(&data, 0.0, LOA_MULTIPLIER).unwrap();
        assert_eq!(loa.bias, 2.5);
        assert_eq!(loa.lower, 2.5);
        assert_eq!(loa.upper, 2.5);
    }

    #[test]
    fn symmetric_about_bias() {
        let data = Dataset::from_pairs([("A", -1.0), ("B", 0.5), ("B", 2.0)]).unwrap();
        let loa = limits_of_agreement(&data, 0.8, LOA_MULTIPLIER).unwrap();
        assert!(((loa.upper - loa.bias) - (loa.bias - loa.lower)).abs() < 1e-12);
        assert!((loa.width() - 2.0 * 1.96 * 0.8).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_finite_sd() {
        let data = Dataset::from_pairs([("A", 1.0)]).unwrap();
        assert!(limits_of_agreement(&data, f64::NAN, LOA_MULTIPLIER).is_err());
        assert!(limits_of_agreement(&data, f64::INFINITY, LOA_MULTIPLIER).is_err());
        assert!(limits_of_agreement(&data, -1.0, LOA_MULTIPLIER).is_err());
    }

    #[test]
    fn rejects_bad_multiplier() {
        let data = Dataset::from_pairs([("A", 1.0)]).unwrap();
        assert!(limits_of_agreement(&data, 1.0, 0.0).is_err());
        assert!(limits_of_agreement(&data, 1.0, f64::NAN).is_err());
    }

    #[test]
    fn coverage_multipliers() {
        let z90 = multiplier_for_coverage(0.90).unwrap();
        let z99 = multiplier_for_coverage(0.99).unwrap();
        assert!((z90 - 1.645).abs() < 1e-3, "z90 = {z90}");
        assert!((z99 - 2.576).abs() < 1e-3, "z99 = {z99}");
        assert!(multiplier_for_coverage(0.0).is_none());
        assert!(multiplier_for_coverage(f64::NAN).is_none());
    }
}
