//! Error taxonomy for agreement analysis.
//!
//! Every stage of the pipeline reports failures through [`AgreementError`].
//! Errors are raised where the invalid condition is detected and propagated
//! unchanged; no stage retries or recovers locally.

/// Errors produced while loading data or computing agreement statistics.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AgreementError {
    /// Malformed or empty dataset, missing required column, or invalid
    /// numeric argument.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Too few subjects or observations for the ANOVA to be defined.
    #[error("degenerate design: {0}")]
    DegenerateDesign(String),

    /// Degenerate observation counts (a single subject or no observations).
    #[error("division by zero: {0}")]
    DivisionByZero(String),

    /// The variance decomposition produced a negative variance component.
    #[error("negative variance: {0}")]
    NegativeVariance(String),
}

impl AgreementError {
    /// Returns `true` for errors caused by malformed input rather than by a
    /// numerically degenerate design.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_agreement::AgreementError;
    ///
    /// assert!(AgreementError::InvalidInput("empty".into()).is_input_error());
    /// assert!(!AgreementError::NegativeVariance("ms".into()).is_input_error());
    /// ```
    pub fn is_input_error(&self) -> bool {
        matches!(self, AgreementError::InvalidInput(_))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AgreementError>;
