use rust_decimal::Decimal;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by the cost cascade, credit and incentive calculations.
///
/// Every variant is fatal to the calculation that produced it. Messages name
/// the offending field or configuration entry so callers can surface them
/// verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PricingError {
    /// A required input is absent (or blank).
    #[error("missing required field '{0}'")]
    MissingField(String),

    /// An input is present but not of the expected type, or outside its
    /// valid range.
    #[error("invalid value for '{field}': {reason}")]
    InvalidType { field: String, reason: String },

    /// The tax regime is not one of the supported variants.
    #[error(
        "unsupported tax regime '{0}' (expected lucro_real, lucro_presumido or simples_nacional)"
    )]
    UnsupportedRegime(String),

    /// The benefit type is not one of the supported variants.
    #[error("unsupported benefit type '{0}' (expected partial_deferral or total_deferral)")]
    UnsupportedBenefitType(String),

    /// A computed intermediate must be strictly positive.
    #[error("{name} must be positive, got {value}")]
    InvalidBase { name: &'static str, value: Decimal },

    /// No incentive program is registered under the given code.
    #[error("unknown incentive program '{0}'")]
    UnknownProgram(String),

    /// The program cannot stamp invoices because it has no NF configuration.
    #[error("incentive program '{0}' has no invoice (NF) configuration")]
    MissingNfConfig(String),

    /// The reform schedule has no entry for a year inside its range.
    #[error("reform schedule has no entry for year {0}")]
    MissingYearConfig(i32),

    /// The requested benefit phase does not exist for the program.
    #[error("phase index {index} out of range for program '{program}' ({phases} phases)")]
    PhaseOutOfRange {
        program: String,
        index: usize,
        phases: usize,
    },

    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl PricingError {
    pub(crate) fn invalid(
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidType {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
