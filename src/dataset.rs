//! Long-format method-comparison data.
//!
//! A [`Dataset`] holds one row per observation: the subject the measurement
//! belongs to and the difference between the two methods. Subjects may
//! contribute any number of rows.
//!
//! # Examples
//!
//! ```
//! use u_agreement::Dataset;
//!
//! let csv = "participants,variables\nP1,0.4\nP1,0.6\nP2,-0.1\n";
//! let data = Dataset::from_long_csv(csv.as_bytes()).unwrap();
//! assert_eq!(data.len(), 3);
//! assert_eq!(data.observations()[2].subject_id, "P2");
//! ```

use std::io::BufRead;

use serde::{Deserialize, Serialize};

use crate::error::{AgreementError, Result};

/// Header name of the subject identifier column.
pub const SUBJECT_COLUMN: &str = "participants";

/// Header name of the measured difference column.
pub const VALUE_COLUMN: &str = "variables";

/// A single measured difference tagged with its subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Subject identifier. Not unique across rows.
    pub subject_id: String,
    /// Difference between the two measurement methods.
    pub value: f64,
}

impl Observation {
    /// Creates an observation.
    pub fn new(subject_id: impl Into<String>, value: f64) -> Self {
        Self {
            subject_id: subject_id.into(),
            value,
        }
    }
}

/// Ordered, non-empty collection of observations in long format.
///
/// Construction validates that the dataset is non-empty and every value is
/// finite, so downstream stages never see NaN or infinity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    observations: Vec<Observation>,
}

impl Dataset {
    /// Builds a dataset from observations in row order.
    ///
    /// # Errors
    ///
    /// [`AgreementError::InvalidInput`] if `observations` is empty or any
    /// value is NaN or infinite.
    pub fn new(observations: Vec<Observation>) -> Result<Self> {
        if observations.is_empty() {
            return Err(AgreementError::InvalidInput("dataset is empty".into()));
        }
        if let Some((row, obs)) = observations
            .iter()
            .enumerate()
            .find(|(_, o)| !o.value.is_finite())
        {
            return Err(AgreementError::InvalidInput(format!(
                "non-finite value {} for subject '{}' at row {}",
                obs.value, obs.subject_id, row
            )));
        }
        Ok(Self { observations })
    }

    /// Builds a dataset from `(subject, value)` pairs.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_agreement::Dataset;
    ///
    /// let data = Dataset::from_pairs([("A", 1.0), ("A", 2.0), ("B", 0.5)]).unwrap();
    /// assert_eq!(data.values(), vec![1.0, 2.0, 0.5]);
    /// ```
    pub fn from_pairs<S, I>(pairs: I) -> Result<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, f64)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(s, v)| Observation::new(s, v))
                .collect(),
        )
    }

    /// Builds a dataset from the two long-format columns.
    ///
    /// # Errors
    ///
    /// [`AgreementError::InvalidInput`] if the subject column is empty while
    /// values are present, the columns differ in length, or the dataset would
    /// be empty or contain non-finite values.
    pub fn from_columns<S: AsRef<str>>(subjects: &[S], values: &[f64]) -> Result<Self> {
        if subjects.is_empty() && !values.is_empty() {
            return Err(AgreementError::InvalidInput(format!(
                "missing '{SUBJECT_COLUMN}' column"
            )));
        }
        if subjects.len() != values.len() {
            return Err(AgreementError::InvalidInput(format!(
                "column length mismatch: {} subjects, {} values",
                subjects.len(),
                values.len()
            )));
        }
        Self::new(
            subjects
                .iter()
                .zip(values)
                .map(|(s, &v)| Observation::new(s.as_ref(), v))
                .collect(),
        )
    }

    /// Reads a long-format CSV with a header row.
    ///
    /// The `participants` and `variables` columns are located by name; any
    /// other column (such as an unnamed row index) is ignored. Fields are
    /// trimmed and blank lines skipped. Quoting is not supported.
    ///
    /// # Errors
    ///
    /// [`AgreementError::InvalidInput`] on read failure, a missing header or
    /// required column, a short row, or an unparsable or non-finite value.
    /// Row errors carry the 1-based line number.
    pub fn from_long_csv<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines().enumerate();

        let header = loop {
            match lines.next() {
                Some((_, line)) => {
                    let line = line.map_err(io_error)?;
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => {
                    return Err(AgreementError::InvalidInput("missing CSV header".into()));
                }
            }
        };

        let columns: Vec<&str> = header.split(',').map(str::trim).collect();
        let column_index = |name: &str| {
            columns
                .iter()
                .position(|&c| c == name)
                .ok_or_else(|| AgreementError::InvalidInput(format!("missing '{name}' column")))
        };
        let subject_idx = column_index(SUBJECT_COLUMN)?;
        let value_idx = column_index(VALUE_COLUMN)?;
        let width = subject_idx.max(value_idx) + 1;

        let mut observations = Vec::new();
        for (line_num, line) in lines {
            let line = line.map_err(io_error)?;
            if line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() < width {
                return Err(AgreementError::InvalidInput(format!(
                    "line {}: expected at least {} columns, got {}",
                    line_num + 1,
                    width,
                    fields.len()
                )));
            }

            let raw = fields[value_idx];
            let value: f64 = raw.parse().map_err(|_| {
                AgreementError::InvalidInput(format!("line {}: invalid value '{}'", line_num + 1, raw))
            })?;
            if !value.is_finite() {
                return Err(AgreementError::InvalidInput(format!(
                    "line {}: non-finite value '{}'",
                    line_num + 1,
                    raw
                )));
            }

            observations.push(Observation::new(fields[subject_idx], value));
        }

        Self::new(observations)
    }

    /// Observations in row order.
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// All values in row order.
    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.value).collect()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Always `false` for a constructed dataset; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

fn io_error(e: std::io::Error) -> AgreementError {
    AgreementError::InvalidInput(format!("failed to read CSV: {e}"))
}

/// Source of the dataset analysed when the caller supplies none.
///
/// Closures returning `Result<Dataset>` implement this trait, so a bundled
/// example can be injected without a dedicated type.
pub trait DatasetProvider {
    /// Produces the fallback dataset.
    fn provide(&self) -> Result<Dataset>;
}

impl<F> DatasetProvider for F
where
    F: Fn() -> Result<Dataset>,
{
    fn provide(&self) -> Result<Dataset> {
        self()
    }
}

/// Returns `data` if present, otherwise the provider's dataset.
pub fn resolve_dataset(data: Option<Dataset>, provider: &dyn DatasetProvider) -> Result<Dataset> {
    match data {
        Some(d) => Ok(d),
        None => provider.provide(),
    }
}
