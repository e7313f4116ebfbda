//! Empirical coverage of the limits of agreement.
//!
//! A sanity diagnostic rather than a statistical test: for well-specified
//! data roughly 95% of the raw differences fall inside the 1.96·SD limits.
//! A large deviation hints at a modeling or data problem but is not an error.

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::limits::LimitsOfAgreement;

/// Observed coverage of the limits of agreement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    /// Fraction of observations strictly inside `(lower, upper)`, in [0, 1].
    pub fraction: f64,
    /// Observations strictly inside the limits.
    pub inside: usize,
    /// Observations at or below the lower limit.
    pub below: usize,
    /// Observations at or above the upper limit.
    pub above: usize,
}

/// Counts raw observations against the limits.
///
/// Values equal to a limit are not inside.
///
/// # Examples
///
/// ```
/// use u_agreement::{limits::LimitsOfAgreement, validation::coverage, Dataset};
///
/// let data = Dataset::from_pairs([("A", -1.0), ("A", 0.0), ("B", 0.5), ("B", 1.0)]).unwrap();
/// let loa = LimitsOfAgreement { bias: 0.0, lower: -1.0, upper: 1.0, multiplier: 1.96 };
/// let c = coverage(&data, &loa);
/// assert_eq!(c.inside, 2);
/// assert_eq!(c.fraction, 0.5);
/// ```
pub fn coverage(data: &Dataset, limits: &LimitsOfAgreement) -> Coverage {
    let mut inside = 0;
    let mut below = 0;
    let mut above = 0;
    for obs in data.observations() {
        if obs.value <= limits.lower {
            below += 1;
        } else if obs.value >= limits.upper {
            above += 1;
        } else {
            inside += 1;
        }
    }

    let total = data.len();
    let fraction = if total == 0 {
        0.0
    } else {
        inside as f64 / total as f64
    };

    Coverage {
        fraction,
        inside,
        below,
        above,
    }
}

/// Fraction of raw observations strictly between the limits.
pub fn common_sense_fraction(data: &Dataset, limits: &LimitsOfAgreement) -> f64 {
    coverage(data, limits).fraction
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn counts_partition_rows(
            values in proptest::collection::vec(-10.0_f64..10.0, 1..=60),
            lower in -5.0_f64..0.0,
            width in 0.0_f64..10.0,
        ) {
            let data = Dataset::from_pairs(
                values.iter().enumerate().map(|(i, &v)| (format!("S{}", i % 4), v)),
            ).expect("finite non-empty");
            let c = coverage(&data, &LimitsOfAgreement {
                bias: lower + width / 2.0,
                lower,
                upper: lower + width,
                multiplier: 1.96,
            });
            prop_assert_eq!(c.inside + c.below + c.above, data.len());
            prop_assert!((0.0..=1.0).contains(&c.fraction));
        }
    }
}
