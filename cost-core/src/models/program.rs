use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::PricingError;

/// How a state program treats the ICMS due at import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenefitType {
    /// Part of the ICMS is anticipated at a reduced effective rate; the rest
    /// is deferred.
    PartialDeferral,
    /// All ICMS is deferred to a later operation.
    TotalDeferral,
}

impl BenefitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PartialDeferral => "partial_deferral",
            Self::TotalDeferral => "total_deferral",
        }
    }
}

impl FromStr for BenefitType {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "partial_deferral" => Ok(Self::PartialDeferral),
            "total_deferral" => Ok(Self::TotalDeferral),
            _ => Err(PricingError::UnsupportedBenefitType(s.to_string())),
        }
    }
}

impl fmt::Display for BenefitType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a program's benefit schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitPhase {
    pub label: String,
    /// Effective ICMS rate collected up front, as a fraction (0.026 = 2.6%).
    pub anticipation_rate: Decimal,
}

/// Invoice (NF-e) stamping configuration for a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NfConfig {
    /// ICMS tax-situation code printed on the invoice.
    pub cst: String,
    /// Benefit code (cBenef) reported to the state.
    pub benefit_code: String,
}

/// A state fiscal-benefit program definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncentiveProgram {
    pub code: String,
    pub name: String,
    /// Two-letter state codes (UF) where the program applies.
    pub eligible_states: Vec<String>,
    pub benefit_type: BenefitType,
    /// Nominal ICMS rate used for bookkeeping (alíquota de escrituração),
    /// as a fraction.
    pub booking_rate: Decimal,
    /// Rate used to gross up the calculation base (alíquota de cálculo).
    /// Required for partial deferral.
    #[serde(default)]
    pub calculation_rate: Option<Decimal>,
    #[serde(default)]
    pub phases: Vec<BenefitPhase>,
    #[serde(default)]
    pub nf_config: Option<NfConfig>,
}

impl IncentiveProgram {
    /// Returns `true` when `state` is one of the program's eligible states.
    pub fn covers_state(
        &self,
        state: &str,
    ) -> bool {
        self.eligible_states
            .iter()
            .any(|s| s.eq_ignore_ascii_case(state))
    }

    /// Checks the program definition for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError`] if:
    /// - `code` is blank ([`PricingError::MissingField`])
    /// - `eligible_states` is empty
    /// - `booking_rate` is not in (0, 1)
    /// - a partial-deferral program lacks `calculation_rate` or phases
    /// - `calculation_rate` is not in [0, 1)
    /// - any anticipation rate is not in [0, 1]
    pub fn validate(&self) -> Result<(), PricingError> {
        if self.code.trim().is_empty() {
            return Err(PricingError::MissingField("code".to_string()));
        }
        if self.eligible_states.is_empty() {
            return Err(PricingError::MissingField("eligible_states".to_string()));
        }
        if self.booking_rate <= Decimal::ZERO || self.booking_rate >= Decimal::ONE {
            return Err(PricingError::invalid(
                "booking_rate",
                format!("must be between 0 and 1 (exclusive), got {}", self.booking_rate),
            ));
        }
        if let Some(rate) = self.calculation_rate {
            if rate < Decimal::ZERO || rate >= Decimal::ONE {
                return Err(PricingError::invalid(
                    "calculation_rate",
                    format!("must be in [0, 1), got {rate}"),
                ));
            }
        }
        if self.benefit_type == BenefitType::PartialDeferral {
            if self.calculation_rate.is_none() {
                return Err(PricingError::MissingField("calculation_rate".to_string()));
            }
            if self.phases.is_empty() {
                return Err(PricingError::MissingField("phases".to_string()));
            }
        }
        for (index, phase) in self.phases.iter().enumerate() {
            if phase.anticipation_rate < Decimal::ZERO || phase.anticipation_rate > Decimal::ONE {
                return Err(PricingError::invalid(
                    format!("phases[{index}].anticipation_rate"),
                    format!("must be in [0, 1], got {}", phase.anticipation_rate),
                ));
            }
        }
        Ok(())
    }
}

/// Per-program NCM restriction lists (negative lists).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NcmRestrictionSet {
    pub program_code: String,
    /// NCMs excluded by exact match.
    #[serde(default)]
    pub exact: Vec<String>,
    /// Wildcard patterns; `*` matches any run of characters.
    #[serde(default)]
    pub patterns: Vec<String>,
}
