//! Repeated-measures variance of the method differences.
//!
//! Converts the ANOVA mean squares into the total variance of a single
//! difference, combining between-subject heterogeneity with within-subject
//! variation. Unequal observation counts are handled through the
//! harmonic-style adjustment
//!
//! ```text
//! m₀ = ((Σ nᵢ)² − Σ nᵢ²) / ((k − 1) · Σ nᵢ)
//! ```
//!
//! which equals n when every subject has n observations.
//!
//! # References
//!
//! Bland & Altman (2007), "Agreement between methods of measurement with
//! multiple observations per individual", *Journal of Biopharmaceutical
//! Statistics* 17(4), pp. 571-582.

use serde::{Deserialize, Serialize};

use crate::anova::AnovaMeanSquares;
use crate::counting::SubjectObservationCounts;
use crate::error::{AgreementError, Result};

/// How a negative between-subject variance component is treated.
///
/// When MS_within exceeds MS_between the heterogeneity term
/// `(MS_between − MS_within) / m₀` is negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NegativeVariancePolicy {
    /// Replace the negative component by zero and log a warning.
    #[default]
    ClampToZero,
    /// Fail with [`AgreementError::NegativeVariance`].
    Fail,
    /// Keep the negative component as long as the total variance stays
    /// non-negative. The SD is then √(MS_within + (MS_between − MS_within) / m₀),
    /// smaller than the clamped √MS_within.
    Retain,
}

/// Variance components behind the repeated-measures SD.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RbaVariance {
    /// MS_between − MS_within.
    pub diff_between: f64,
    /// MS_within.
    pub diff_within: f64,
    /// m₀, the effective number of observations per subject.
    pub harmonic_adjustment: f64,
    /// Between-subject variance component after the policy was applied.
    pub variance_heterogeneity: f64,
    /// variance_heterogeneity + diff_within.
    pub total_variance: f64,
    /// √total_variance.
    pub sd: f64,
    /// Whether a negative heterogeneity component was clamped to zero.
    /// Always `false` under [`NegativeVariancePolicy::Retain`].
    pub clamped: bool,
}

/// Effective observations per subject for an unbalanced design.
///
/// The numerator and denominator are formed in integer arithmetic so that a
/// balanced design yields exactly n.
///
/// # Errors
///
/// [`AgreementError::DivisionByZero`] if there are fewer than 2 subjects, no
/// observations, or the numerator vanishes (every subject but one empty).
///
/// # Examples
///
/// ```
/// use u_agreement::variance::harmonic_adjustment;
///
/// assert_eq!(harmonic_adjustment(&[4, 4, 4]).unwrap(), 4.0);
/// // (10² − (4 + 9 + 25)) / (2 · 10) = 3.1
/// assert!((harmonic_adjustment(&[2, 3, 5]).unwrap() - 3.1).abs() < 1e-12);
/// ```
pub fn harmonic_adjustment(counts: &[usize]) -> Result<f64> {
    let k = counts.len();
    if k < 2 {
        return Err(AgreementError::DivisionByZero(format!(
            "variance adjustment needs at least 2 subjects, got {k}"
        )));
    }

    let total: u128 = counts.iter().map(|&n| n as u128).sum();
    if total == 0 {
        return Err(AgreementError::DivisionByZero(
            "no observations across subjects".into(),
        ));
    }

    let sum_sq: u128 = counts.iter().map(|&n| (n as u128) * (n as u128)).sum();
    let numerator = total * total - sum_sq;
    if numerator == 0 {
        return Err(AgreementError::DivisionByZero(
            "all observations belong to a single subject".into(),
        ));
    }
    let denominator = (k as u128 - 1) * total;

    Ok(numerator as f64 / denominator as f64)
}

/// Computes the repeated-measures SD from counts and mean squares.
///
/// # Errors
///
/// - [`AgreementError::InvalidInput`] if a mean square is negative or not
///   finite.
/// - [`AgreementError::DivisionByZero`] from [`harmonic_adjustment`].
/// - [`AgreementError::NegativeVariance`] if the heterogeneity component is
///   negative under [`NegativeVariancePolicy::Fail`], or if the total
///   variance is negative under [`NegativeVariancePolicy::Retain`]. The total
///   can only drop below zero when m₀ < 1, which needs subjects with a count
///   of zero.
///
/// # Examples
///
/// ```
/// use u_agreement::anova::AnovaMeanSquares;
/// use u_agreement::counting::SubjectObservationCounts;
/// use u_agreement::variance::{rba_variance, NegativeVariancePolicy};
///
/// let counts = SubjectObservationCounts::from_entries([("A", 3), ("B", 3)]).unwrap();
/// let ms = AnovaMeanSquares { ms_between: 6.0, ms_within: 0.0 };
/// let v = rba_variance(&counts, ms, NegativeVariancePolicy::Fail).unwrap();
/// assert!((v.sd - 2.0_f64.sqrt()).abs() < 1e-12);
/// ```
pub fn rba_variance(
    counts: &SubjectObservationCounts,
    ms: AnovaMeanSquares,
    policy: NegativeVariancePolicy,
) -> Result<RbaVariance> {
    for (name, value) in [("MS_between", ms.ms_between), ("MS_within", ms.ms_within)] {
        if !value.is_finite() || value < 0.0 {
            return Err(AgreementError::InvalidInput(format!(
                "{name} must be finite and non-negative, got {value}"
            )));
        }
    }

    let adjustment = harmonic_adjustment(&counts.counts())?;

    let diff_between = ms.ms_between - ms.ms_within;
    let diff_within = ms.ms_within;
    let raw_heterogeneity = diff_between / adjustment;

    let (variance_heterogeneity, clamped) = if raw_heterogeneity < 0.0 {
        match policy {
            NegativeVariancePolicy::ClampToZero => {
                log::warn!(
                    "negative between-subject variance {raw_heterogeneity} \
                     (MS_between={} < MS_within={}); clamping to zero",
                    ms.ms_between,
                    ms.ms_within
                );
                (0.0, true)
            }
            NegativeVariancePolicy::Fail => {
                return Err(AgreementError::NegativeVariance(format!(
                    "between-subject variance {raw_heterogeneity} is negative \
                     (MS_between={} < MS_within={})",
                    ms.ms_between, ms.ms_within
                )));
            }
            NegativeVariancePolicy::Retain => (raw_heterogeneity, false),
        }
    } else {
        (raw_heterogeneity, false)
    };

    let total_variance = variance_heterogeneity + diff_within;
    if total_variance < 0.0 {
        return Err(AgreementError::NegativeVariance(format!(
            "total variance {total_variance} is negative"
        )));
    }

    let sd = total_variance.sqrt();
    log::debug!(
        "rba variance: m0={adjustment} heterogeneity={variance_heterogeneity} \
         within={diff_within} total={total_variance} sd={sd}"
    );

    Ok(RbaVariance {
        diff_between,
        diff_within,
        harmonic_adjustment: adjustment,
        variance_heterogeneity,
        total_variance,
        sd,
        clamped,
    })
}
