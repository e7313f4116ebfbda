//! # u-agreement
//!
//! Repeated-measures Bland-Altman (RBA) agreement analysis for
//! method-comparison studies where each subject contributes a variable
//! number of observations.
//!
//! The crate operates on long-format data (one row per measured difference,
//! tagged with its subject) and reports the mean bias, a standard deviation
//! that accounts for within-subject correlation and unequal observation
//! counts, the limits of agreement, and the empirical coverage of those
//! limits.
//!
//! ## Modules
//!
//! - [`dataset`] — Observations, datasets, long-format CSV loading
//! - [`counting`] — Observation counts per subject (exact identifier match)
//! - [`anova`] — One-way ANOVA of value on subject
//! - [`variance`] — Repeated-measures SD with the unbalanced-design adjustment
//! - [`limits`] — Bias and limits of agreement
//! - [`validation`] — Coverage of the limits ("common sense" check)
//! - [`analysis`] — The full pipeline and its configuration
//!
//! ## Example
//!
//! ```
//! use u_agreement::{analyze, Dataset};
//!
//! let data = Dataset::from_pairs([
//!     ("P1", 0.4), ("P1", 0.7), ("P1", 0.2),
//!     ("P2", -0.3), ("P2", 0.1),
//!     ("P10", 0.9), ("P10", 1.2), ("P10", 0.8), ("P10", 1.0),
//! ]).unwrap();
//!
//! let result = analyze(&data).unwrap();
//! assert_eq!(result.obsv, vec![3, 2, 4]);
//! assert!(result.loa_lower < result.bias && result.bias < result.loa_upper);
//! ```
//!
//! ## Design Philosophy
//!
//! - **Pure pipeline**: Every stage is a function of its inputs; no state
//!   survives a run
//! - **Explicit failure**: Degenerate designs return a typed
//!   [`AgreementError`] instead of NaN
//! - **Numerical stability**: Leverages `u-numflow` for stable statistics
//! - **Research-backed**: Bland & Altman (1999, 2007)

pub mod analysis;
pub mod anova;
pub mod counting;
pub mod dataset;
pub mod error;
pub mod limits;
pub mod validation;
pub mod variance;

pub use analysis::{analyze, analyze_or_default, RbaResult, RepeatedMeasuresBlandAltman};
pub use anova::AnovaMeanSquares;
pub use counting::{count_observations, SubjectObservationCounts};
pub use dataset::{Dataset, DatasetProvider, Observation};
pub use error::{AgreementError, Result};
pub use limits::{LimitsOfAgreement, LOA_MULTIPLIER};
pub use variance::NegativeVariancePolicy;
