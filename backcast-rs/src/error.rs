use chrono::NaiveDate;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimError {
    /// A caller contract violation: the named parameter is outside its
    /// documented domain. Not recoverable by clamping.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },

    #[error("no death dates were provided")]
    EmptyDeathDates,

    /// Resampling into the truncation window cannot converge because the
    /// distribution carries (almost) no mass inside it.
    #[error("truncated sampler for {distribution} found no mass in [{min}, {max}] days")]
    TruncationExhausted {
        distribution: String,
        min: u64,
        max: u64,
    },

    /// Additive merge requires every input to carry the same number of
    /// realizations.
    #[error("ensembles disagree on realization count: expected {expected}, found {found}")]
    RealizationMismatch { expected: usize, found: usize },

    /// Concatenative merge requires every input to share one date axis.
    #[error(
        "ensembles disagree on date axis: expected {expected_start}..={expected_end}, \
         found {found_start}..={found_end}"
    )]
    AxisMismatch {
        expected_start: NaiveDate,
        expected_end: NaiveDate,
        found_start: NaiveDate,
        found_end: NaiveDate,
    },
}

impl SimError {
    pub fn invalid_parameter(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}
