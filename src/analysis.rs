//! Repeated-measures Bland-Altman pipeline.
//!
//! Runs the stages in order: observation counts, one-way ANOVA, the
//! repeated-measures variance, bias and limits of agreement, and the
//! empirical coverage check. Every stage is a pure function of its inputs;
//! nothing is cached between runs.
//!
//! # Examples
//!
//! ```
//! use u_agreement::{Dataset, RepeatedMeasuresBlandAltman};
//!
//! let data = Dataset::from_pairs([
//!     ("S1", 1.0), ("S1", 1.0), ("S1", 1.0),
//!     ("S2", 3.0), ("S2", 3.0), ("S2", 3.0),
//! ]).unwrap();
//! let result = RepeatedMeasuresBlandAltman::new().compute(&data).unwrap();
//! assert_eq!(result.obsv, vec![3, 3]);
//! assert!((result.bias - 2.0).abs() < 1e-12);
//! assert!((result.sd - 2.0_f64.sqrt()).abs() < 1e-12);
//! assert_eq!(result.common_sense_fraction, 1.0);
//! ```
//!
//! # References
//!
//! - Bland & Altman (1999), "Measuring agreement in method comparison
//!   studies", *Statistical Methods in Medical Research* 8(2), pp. 135-160.
//! - Wade et al. (2023), "Examination of 2D frontal and sagittal markerless
//!   motion capture", *PLOS ONE* 18, e0293917.

use serde::{Deserialize, Serialize};

use crate::anova::{self, AnovaMeanSquares};
use crate::counting::count_observations;
use crate::dataset::{resolve_dataset, Dataset, DatasetProvider};
use crate::error::Result;
use crate::limits::{limits_of_agreement, multiplier_for_coverage, LOA_MULTIPLIER};
use crate::validation::{coverage, Coverage};
use crate::variance::{rba_variance, NegativeVariancePolicy, RbaVariance};

/// Configuration of a repeated-measures Bland-Altman analysis.
///
/// The default uses the 1.96 multiplier and clamps a negative between-subject
/// variance component to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RepeatedMeasuresBlandAltman {
    multiplier: f64,
    negative_variance: NegativeVariancePolicy,
}

impl Default for RepeatedMeasuresBlandAltman {
    fn default() -> Self {
        Self {
            multiplier: LOA_MULTIPLIER,
            negative_variance: NegativeVariancePolicy::default(),
        }
    }
}

/// Outcome of one analysis.
///
/// Serializes with the field names `obsv`, `bias`, `SD`, `LOA_lower`,
/// `LOA_upper` and `commonSenseFraction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RbaResult {
    /// Subject identifiers in first-occurrence order.
    pub subjects: Vec<String>,
    /// Observations per subject, aligned with `subjects`.
    pub obsv: Vec<usize>,
    /// Mean difference over all rows.
    pub bias: f64,
    /// Repeated-measures standard deviation.
    #[serde(rename = "SD")]
    pub sd: f64,
    /// bias − multiplier · SD.
    #[serde(rename = "LOA_lower")]
    pub loa_lower: f64,
    /// bias + multiplier · SD.
    #[serde(rename = "LOA_upper")]
    pub loa_upper: f64,
    /// Fraction of rows strictly inside the limits.
    #[serde(rename = "commonSenseFraction")]
    pub common_sense_fraction: f64,
    /// Multiplier applied to the SD.
    pub multiplier: f64,
    /// ANOVA mean squares.
    pub mean_squares: AnovaMeanSquares,
    /// Variance components behind `sd`.
    pub variance: RbaVariance,
    /// Counts inside and outside the limits.
    pub coverage: Coverage,
}

impl RepeatedMeasuresBlandAltman {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the SD multiplier directly.
    ///
    /// Non-positive or non-finite values are rejected when the analysis runs.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the multiplier from a two-sided coverage probability.
    ///
    /// Returns `None` unless `0 < coverage < 1`.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_agreement::RepeatedMeasuresBlandAltman;
    ///
    /// let rba = RepeatedMeasuresBlandAltman::new().with_coverage(0.99).unwrap();
    /// assert!((rba.multiplier() - 2.576).abs() < 1e-3);
    /// assert!(RepeatedMeasuresBlandAltman::new().with_coverage(1.5).is_none());
    /// ```
    pub fn with_coverage(self, coverage: f64) -> Option<Self> {
        multiplier_for_coverage(coverage).map(|z| self.with_multiplier(z))
    }

    /// Sets how a negative between-subject variance component is handled.
    pub fn with_negative_variance_policy(mut self, policy: NegativeVariancePolicy) -> Self {
        self.negative_variance = policy;
        self
    }

    /// The SD multiplier.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// The negative-variance policy.
    pub fn negative_variance_policy(&self) -> NegativeVariancePolicy {
        self.negative_variance
    }

    /// Runs the analysis on `data`.
    ///
    /// # Errors
    ///
    /// Propagates the first failing stage:
    /// - [`AgreementError::InvalidInput`](crate::AgreementError::InvalidInput)
    ///   for an empty dataset or an invalid multiplier.
    /// - [`AgreementError::DegenerateDesign`](crate::AgreementError::DegenerateDesign)
    ///   for fewer than 2 subjects or no within-subject replication.
    /// - [`AgreementError::DivisionByZero`](crate::AgreementError::DivisionByZero)
    ///   for degenerate counts.
    /// - [`AgreementError::NegativeVariance`](crate::AgreementError::NegativeVariance)
    ///   under [`NegativeVariancePolicy::Fail`].
    pub fn compute(&self, data: &Dataset) -> Result<RbaResult> {
        let counts = count_observations(data)?;
        log::debug!(
            "counted {} observations across {} subjects",
            counts.total(),
            counts.num_subjects()
        );

        let mean_squares = anova::decompose(data)?.mean_squares();
        let variance = rba_variance(&counts, mean_squares, self.negative_variance)?;
        let limits = limits_of_agreement(data, variance.sd, self.multiplier)?;
        let observed = coverage(data, &limits);

        log::debug!(
            "bias={} sd={} loa=[{}, {}] width={} coverage={}",
            limits.bias,
            variance.sd,
            limits.lower,
            limits.upper,
            limits.width(),
            observed.fraction
        );

        Ok(RbaResult {
            subjects: counts.subjects().map(str::to_owned).collect(),
            obsv: counts.counts(),
            bias: limits.bias,
            sd: variance.sd,
            loa_lower: limits.lower,
            loa_upper: limits.upper,
            common_sense_fraction: observed.fraction,
            multiplier: limits.multiplier,
            mean_squares,
            variance,
            coverage: observed,
        })
    }

    /// Runs the analysis on `data`, or on the provider's dataset when `data`
    /// is `None`.
    pub fn compute_or_default(
        &self,
        data: Option<Dataset>,
        provider: &dyn DatasetProvider,
    ) -> Result<RbaResult> {
        let data = resolve_dataset(data, provider)?;
        self.compute(&data)
    }
}

/// Runs the analysis with the default configuration.
///
/// # Errors
///
/// See [`RepeatedMeasuresBlandAltman::compute`].
pub fn analyze(data: &Dataset) -> Result<RbaResult> {
    RepeatedMeasuresBlandAltman::default().compute(data)
}

/// Runs the default analysis on `data`, falling back to the provider's
/// dataset when `data` is `None`.
///
/// # Examples
///
/// ```
/// use u_agreement::{analyze_or_default, Dataset};
///
/// let example = || Dataset::from_pairs([("A", 0.0), ("A", 1.0), ("B", 2.0), ("B", 4.0)]);
/// let result = analyze_or_default(None, &example).unwrap();
/// assert_eq!(result.obsv, vec![2, 2]);
/// ```
pub fn analyze_or_default(
    data: Option<Dataset>,
    provider: &dyn DatasetProvider,
) -> Result<RbaResult> {
    RepeatedMeasuresBlandAltman::default().compute_or_default(data, provider)
}
