//! Observation counts per subject.
//!
//! Subjects are grouped by exact identifier equality, so an identifier that is
//! a prefix of another (`"P1"` and `"P10"`) is always its own group. Group
//! order is the order in which each subject first appears in the dataset.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::{AgreementError, Result};

/// Values of one subject, borrowed from a [`Dataset`].
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectGroup<'a> {
    /// Subject identifier.
    pub subject_id: &'a str,
    /// The subject's values in row order.
    pub values: Vec<f64>,
}

/// Groups a dataset's values by subject in first-occurrence order.
pub fn group_by_subject(data: &Dataset) -> Vec<SubjectGroup<'_>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<SubjectGroup<'_>> = Vec::new();

    for obs in data.observations() {
        let slot = *index.entry(obs.subject_id.as_str()).or_insert_with(|| {
            groups.push(SubjectGroup {
                subject_id: obs.subject_id.as_str(),
                values: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].values.push(obs.value);
    }

    groups
}

/// Number of observations per subject, in first-occurrence order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectObservationCounts {
    entries: Vec<(String, usize)>,
}

impl SubjectObservationCounts {
    /// Builds counts from `(subject, count)` entries.
    ///
    /// # Errors
    ///
    /// [`AgreementError::InvalidInput`] if a subject appears twice.
    pub fn from_entries<S: Into<String>>(
        entries: impl IntoIterator<Item = (S, usize)>,
    ) -> Result<Self> {
        let entries: Vec<(String, usize)> =
            entries.into_iter().map(|(s, n)| (s.into(), n)).collect();
        let mut seen: HashSet<&str> = HashSet::with_capacity(entries.len());
        for (subject, _) in &entries {
            if !seen.insert(subject.as_str()) {
                return Err(AgreementError::InvalidInput(format!(
                    "duplicate subject '{subject}' in counts"
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Count for `subject_id`, matched exactly.
    pub fn get(&self, subject_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(s, _)| s == subject_id)
            .map(|&(_, n)| n)
    }

    /// Counts in first-occurrence order.
    pub fn counts(&self) -> Vec<usize> {
        self.entries.iter().map(|&(_, n)| n).collect()
    }

    /// Subject identifiers in first-occurrence order.
    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(s, _)| s.as_str())
    }

    /// `(subject, count)` pairs in first-occurrence order.
    pub fn entries(&self) -> &[(String, usize)] {
        &self.entries
    }

    /// Number of distinct subjects, k.
    pub fn num_subjects(&self) -> usize {
        self.entries.len()
    }

    /// Total number of observations, Σ nᵢ.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|&(_, n)| n).sum()
    }
}

/// Counts observations per subject.
///
/// # Errors
///
/// [`AgreementError::InvalidInput`] if the dataset has no rows.
///
/// # Examples
///
/// ```
/// use u_agreement::{count_observations, Dataset};
///
/// let data = Dataset::from_pairs([
///     ("S1", 0.1), ("S10", 0.2), ("S1", 0.3), ("S10", 0.4), ("S10", 0.5),
/// ]).unwrap();
/// let counts = count_observations(&data).unwrap();
/// assert_eq!(counts.get("S1"), Some(2));
/// assert_eq!(counts.get("S10"), Some(3));
/// assert_eq!(counts.counts(), vec![2, 3]);
/// ```
pub fn count_observations(data: &Dataset) -> Result<SubjectObservationCounts> {
    if data.is_empty() {
        return Err(AgreementError::InvalidInput("dataset is empty".into()));
    }
    let entries = group_by_subject(data)
        .into_iter()
        .map(|g| (g.subject_id.to_owned(), g.values.len()))
        .collect();
    Ok(SubjectObservationCounts { entries })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn counts_sum_to_rows(
            rows in proptest::collection::vec((0_u8..12, -1e3_f64..1e3), 1..=80)
        ) {
            let data = Dataset::from_pairs(
                rows.iter().map(|&(s, v)| (format!("P{s}"), v)),
            ).expect("finite non-empty");
            let counts = count_observations(&data).expect("non-empty");
            prop_assert_eq!(counts.total(), data.len());
            prop_assert!(counts.counts().iter().all(|&n| n >= 1));
        }
    }
}
