//! One-way ANOVA of the measured difference on subject.
//!
//! The design is fixed (a single categorical factor), so the decomposition is
//! computed in closed form rather than through a general linear model.
//!
//! # Algorithm
//!
//! ```text
//! SS_between = Σᵢ nᵢ (x̄ᵢ − x̄)²          df_between = k − 1
//! SS_within  = Σᵢ Σⱼ (xᵢⱼ − x̄ᵢ)²        df_within  = N − k
//! MS = SS / df,  F = MS_between / MS_within
//! ```
//!
//! # References
//!
//! Fisher (1925). "Statistical Methods for Research Workers".

use serde::{Deserialize, Serialize};

use u_numflow::special;
use u_numflow::stats;

use crate::counting::group_by_subject;
use crate::dataset::Dataset;
use crate::error::{AgreementError, Result};

/// Between- and within-subject mean squares.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnovaMeanSquares {
    /// Mean square between subjects, SS_between / (k − 1).
    pub ms_between: f64,
    /// Mean square within subjects (residual), SS_within / (N − k).
    pub ms_within: f64,
}

/// Full one-way ANOVA table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnovaDecomposition {
    /// Sum of squares between groups.
    pub ss_between: f64,
    /// Sum of squares within groups.
    pub ss_within: f64,
    /// Degrees of freedom between groups, k − 1.
    pub df_between: usize,
    /// Degrees of freedom within groups, N − k.
    pub df_within: usize,
    /// Mean square between.
    pub ms_between: f64,
    /// Mean square within.
    pub ms_within: f64,
    /// F-statistic.
    pub f_statistic: f64,
    /// p-value, P(F > f_statistic).
    pub p_value: f64,
    /// Group means in group order.
    pub group_means: Vec<f64>,
    /// Grand mean over all observations.
    pub grand_mean: f64,
}

impl AnovaDecomposition {
    /// The mean-square pair used by the variance estimator.
    pub fn mean_squares(&self) -> AnovaMeanSquares {
        AnovaMeanSquares {
            ms_between: self.ms_between,
            ms_within: self.ms_within,
        }
    }
}

/// Σ (xᵢ − center)², accumulated with Kahan summation.
fn sum_sq_dev(data: &[f64], center: f64) -> f64 {
    let squares: Vec<f64> = data.iter().map(|&x| (x - center).powi(2)).collect();
    stats::kahan_sum(&squares)
}

/// One-way ANOVA over pre-grouped values.
///
/// # Errors
///
/// - [`AgreementError::DegenerateDesign`] if there are fewer than 2 groups,
///   any group is empty, or N equals k (no within-group degrees of freedom).
/// - [`AgreementError::InvalidInput`] if any value is NaN or infinite.
///
/// # Examples
///
/// ```
/// use u_agreement::anova::one_way_anova;
///
/// let group1 = [5.0, 6.0, 7.0, 5.5, 6.5];
/// let group2 = [8.0, 9.0, 8.5, 9.5, 8.0];
/// let group3 = [4.0, 3.0, 3.5, 4.5, 4.0];
/// let r = one_way_anova(&[&group1, &group2, &group3]).unwrap();
/// assert_eq!(r.df_between, 2);
/// assert_eq!(r.df_within, 12);
/// assert!(r.p_value < 0.01);
/// ```
pub fn one_way_anova(groups: &[&[f64]]) -> Result<AnovaDecomposition> {
    let k = groups.len();
    if k < 2 {
        return Err(AgreementError::DegenerateDesign(format!(
            "ANOVA needs at least 2 subjects, got {k}"
        )));
    }

    for (i, g) in groups.iter().enumerate() {
        if g.is_empty() {
            return Err(AgreementError::DegenerateDesign(format!(
                "subject {i} has no observations"
            )));
        }
        if g.iter().any(|v| !v.is_finite()) {
            return Err(AgreementError::InvalidInput(format!(
                "subject {i} has a non-finite value"
            )));
        }
    }

    let total_n: usize = groups.iter().map(|g| g.len()).sum();
    if total_n == k {
        return Err(AgreementError::DegenerateDesign(format!(
            "no within-subject degrees of freedom: {total_n} observations for {k} subjects"
        )));
    }

    let all: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
    let grand_mean = stats::kahan_sum(&all) / total_n as f64;

    let group_means: Vec<f64> = groups
        .iter()
        .map(|g| stats::kahan_sum(g) / g.len() as f64)
        .collect();

    let between_terms: Vec<f64> = groups
        .iter()
        .zip(group_means.iter())
        .map(|(g, &gm)| g.len() as f64 * (gm - grand_mean).powi(2))
        .collect();
    let ss_between = stats::kahan_sum(&between_terms);

    let within_terms: Vec<f64> = groups
        .iter()
        .zip(group_means.iter())
        .map(|(g, &gm)| sum_sq_dev(g, gm))
        .collect();
    let ss_within = stats::kahan_sum(&within_terms);

    let df_between = k - 1;
    let df_within = total_n - k;

    let ms_between = ss_between / df_between as f64;
    let ms_within = ss_within / df_within as f64;

    let (f_statistic, p_value) = if ms_within > 1e-300 {
        let f = ms_between / ms_within;
        let p = 1.0 - special::f_distribution_cdf(f, df_between as f64, df_within as f64);
        (f, p.clamp(0.0, 1.0))
    } else if ms_between > 1e-300 {
        (f64::INFINITY, 0.0)
    } else {
        // every value identical
        (0.0, 1.0)
    };

    Ok(AnovaDecomposition {
        ss_between,
        ss_within,
        df_between,
        df_within,
        ms_between,
        ms_within,
        f_statistic,
        p_value,
        group_means,
        grand_mean,
    })
}

/// Fits the one-way ANOVA `value ~ subject` on a dataset.
///
/// Groups are formed by exact subject identifier, in first-occurrence order.
///
/// # Errors
///
/// See [`one_way_anova`].
///
/// # Examples
///
/// ```
/// use u_agreement::{anova::decompose, Dataset};
///
/// let data = Dataset::from_pairs([
///     ("A", 1.0), ("A", 1.0), ("A", 1.0),
///     ("B", 3.0), ("B", 3.0), ("B", 3.0),
/// ]).unwrap();
/// let ms = decompose(&data).unwrap().mean_squares();
/// assert_eq!(ms.ms_within, 0.0);
/// assert!((ms.ms_between - 6.0).abs() < 1e-12);
/// ```
pub fn decompose(data: &Dataset) -> Result<AnovaDecomposition> {
    let groups = group_by_subject(data);
    let slices: Vec<&[f64]> = groups.iter().map(|g| g.values.as_slice()).collect();
    let table = one_way_anova(&slices)?;
    log::debug!(
        "anova: k={} N={} ss_between={} ss_within={} ms_between={} ms_within={}",
        groups.len(),
        data.len(),
        table.ss_between,
        table.ss_within,
        table.ms_between,
        table.ms_within
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn different_means() {
        let g1 = [1.0, 2.0, 3.0, 2.0, 1.5];
        let g2 = [5.0, 6.0, 7.0, 6.0, 5.5];
        let g3 = [10.0, 11.0, 12.0, 11.0, 10.5];
        let r = one_way_anova(&[&g1, &g2, &g3]).expect("should compute");
        assert!(r.p_value < 0.001, "p = {}", r.p_value);
        assert_eq!(r.df_between, 2);
        assert_eq!(r.df_within, 12);
    }

    #[test]
    fn same_means() {
        let g1 = [5.0, 5.1, 4.9, 5.0, 5.1];
        let g2 = [5.0, 5.2, 4.8, 5.1, 4.9];
        let g3 = [5.1, 4.9, 5.0, 5.0, 5.1];
        let r = one_way_anova(&[&g1, &g2, &g3]).expect("should compute");
        assert!(r.p_value > 0.3, "p = {}", r.p_value);
    }

    /// Hand-computed unbalanced table.
    ///
    /// Groups {1, 3}, {4, 6, 8}, {10}: means 2, 6, 10; grand mean 32/6.
    /// SS_within = 2 + 8 + 0 = 10, df_within = 3, MS_within = 10/3.
    /// SS_between = 2(2 − 16/3)² + 3(6 − 16/3)² + (10 − 16/3)² = (200 + 12 + 196)/9 = 136/3.
    #[test]
    fn unbalanced_hand_computed() {
        let g1 = [1.0, 3.0];
        let g2 = [4.0, 6.0, 8.0];
        let g3 = [10.0];
        let r = one_way_anova(&[&g1, &g2, &g3]).expect("should compute");
        let gm: f64 = 16.0 / 3.0;
        let ss_between = 2.0 * (2.0 - gm).powi(2) + 3.0 * (6.0 - gm).powi(2) + (10.0 - gm).powi(2);
        assert!((r.grand_mean - gm).abs() < 1e-12);
        assert!((r.ss_within - 10.0).abs() < 1e-12);
        assert!((r.ms_within - 10.0 / 3.0).abs() < 1e-12);
        assert!((r.ss_between - ss_between).abs() < 1e-10);
        assert!((r.ms_between - ss_between / 2.0).abs() < 1e-10);
        assert_eq!(r.group_means, vec![2.0, 6.0, 10.0]);
    }

    /// Same table: F = (68/3) / (10/3) = 6.8 on (2, 3) df. With two numerator
    /// df the upper tail is closed-form, P(F > f) = (1 + 2f/d₂)^(−d₂/2).
    #[test]
    fn p_value_matches_closed_form_tail() {
        let g1 = [1.0, 3.0];
        let g2 = [4.0, 6.0, 8.0];
        let g3 = [10.0];
        let r = one_way_anova(&[&g1, &g2, &g3]).expect("should compute");
        assert!((r.f_statistic - 6.8).abs() < 1e-10, "F = {}", r.f_statistic);
        let expected = (1.0_f64 + 2.0 * 6.8 / 3.0).powf(-1.5);
        assert!((r.p_value - expected).abs() < 1e-6, "p = {}", r.p_value);
    }

    #[test]
    fn ss_decomposition() {
        let g1 = [1.0, 2.0, 3.0, 2.0, 1.5];
        let g2 = [5.0, 6.0, 7.0, 6.0, 5.5, 4.0];
        let r = one_way_anova(&[&g1, &g2]).expect("should compute");
        let all_data: Vec<f64> = g1.iter().chain(g2.iter()).copied().collect();
        let ss_total: f64 = all_data.iter().map(|&x| (x - r.grand_mean).powi(2)).sum();
        assert!(
            (ss_total - (r.ss_between + r.ss_within)).abs() < 1e-10,
            "SS decomposition: {ss_total} vs {} + {}",
            r.ss_between,
            r.ss_within
        );
    }

    #[test]
    fn sum_sq_dev_basic() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((sum_sq_dev(&v, 5.0) - 32.0).abs() < 1e-12);
        assert_eq!(sum_sq_dev(&[], 1.0), 0.0);
    }

    #[test]
    fn zero_within_variance() {
        let g1 = [1.0, 1.0, 1.0];
        let g2 = [3.0, 3.0, 3.0];
        let r = one_way_anova(&[&g1, &g2]).expect("should compute");
        assert_eq!(r.ms_within, 0.0);
        assert!((r.ms_between - 6.0).abs() < 1e-12);
        assert!(r.f_statistic.is_infinite());
        assert_eq!(r.p_value, 0.0);
    }

    #[test]
    fn all_identical_values() {
        let g1 = [2.0, 2.0];
        let g2 = [2.0, 2.0];
        let r = one_way_anova(&[&g1, &g2]).expect("should compute");
        assert_eq!(r.f_statistic, 0.0);
        assert_eq!(r.p_value, 1.0);
    }

    #[test]
    fn single_group_is_degenerate() {
        let g1 = [1.0, 2.0, 3.0];
        assert!(matches!(
            one_way_anova(&[&g1]),
            Err(AgreementError::DegenerateDesign(_))
        ));
    }

    #[test]
    fn empty_group_is_degenerate() {
        let g1 = [1.0, 2.0];
        let g2: [f64; 0] = [];
        assert!(matches!(
            one_way_anova(&[&g1, &g2]),
            Err(AgreementError::DegenerateDesign(_))
        ));
    }

    #[test]
    fn one_observation_per_subject_is_degenerate() {
        let data = Dataset::from_pairs([("A", 1.0), ("B", 2.0), ("C", 3.0)]).unwrap();
        assert!(matches!(
            decompose(&data),
            Err(AgreementError::DegenerateDesign(_))
        ));
    }

    #[test]
    fn non_finite_is_invalid_input() {
        let g1 = [1.0, f64::NAN];
        let g2 = [2.0, 3.0];
        assert!(matches!(
            one_way_anova(&[&g1, &g2]),
            Err(AgreementError::InvalidInput(_))
        ));
    }

    #[test]
    fn decompose_groups_by_exact_subject() {
        let data = Dataset::from_pairs([
            ("P1", 1.0),
            ("P10", 5.0),
            ("P1", 3.0),
            ("P10", 7.0),
        ])
        .unwrap();
        let r = decompose(&data).unwrap();
        assert_eq!(r.group_means, vec![2.0, 6.0]);
        assert_eq!(r.df_within, 2);
    }
}
