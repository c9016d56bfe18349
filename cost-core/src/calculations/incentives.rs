//! State ICMS incentive programs: eligibility, invoice fields and the benefit
//! projection through the tax reform.
//!
//! # Invoice fields
//!
//! For a resale `subtotal` (value without ICMS), with booking rate `b`,
//! calculation rate `c` and phase anticipation rate `a`:
//!
//! | Field              | Partial deferral          | Total deferral     |
//! |--------------------|---------------------------|--------------------|
//! | booking base       | subtotal / (1 − b)        | subtotal / (1 − b) |
//! | calculation base   | subtotal / (1 − c)        | booking base       |
//! | ICMS of operation  | booking base × b          | booking base × b   |
//! | ICMS due           | calculation base × a      | 0                  |
//! | ICMS deferred      | operation − due           | operation          |
//! | deferral %         | deferred / operation × 100 | 100               |
//!
//! Monetary fields are rounded half-up to centavos; the deferred amount is
//! taken from the rounded operation and due amounts so the three always add
//! up on the printed invoice.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::PricingError;
use crate::calculations::common::round_half_up;
use crate::calculations::ncm::normalize_ncm;
use crate::calculations::reform::{DEFAULT_PROJECTION_END, ReformProjection};
use crate::calculations::validation::{positive, require_text};
use crate::config::{ProgramRegistry, ReformSchedule};
use crate::models::{BenefitType, IncentiveProgram};

/// Why a program was accepted or refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EligibilityReason {
    Eligible,
    StateMismatch { state: String },
    RestrictedNcm { count: usize },
}

impl fmt::Display for EligibilityReason {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Eligible => f.write_str("eligible"),
            Self::StateMismatch { state } => {
                write!(f, "program is not available in state {state}")
            }
            Self::RestrictedNcm { count } => {
                write!(f, "{count} NCM(s) excluded by the program's restriction list")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub program_code: String,
    pub state: String,
    pub eligible: bool,
    pub reason: EligibilityReason,
    /// Normalised NCMs hit by the exact list or a wildcard pattern.
    pub restricted_ncms: Vec<String>,
    /// Normalised NCMs the program accepts.
    pub accepted_ncms: Vec<String>,
    /// Other programs worth offering: those available in the state and, on a
    /// restriction failure, not restricting any of the refused NCMs.
    pub alternative_programs: Vec<String>,
}

/// Record of the benefit applied to an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedBenefit {
    pub program_code: String,
    pub program_name: String,
    pub benefit_type: BenefitType,
    /// Phase label, absent for total deferral.
    pub phase_label: Option<String>,
}

/// Fields stamped on an outbound invoice issued under a benefit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceFields {
    pub cst: String,
    /// ICMS booking base (subtotal grossed up by the booking rate).
    pub base_amount: Decimal,
    /// Base used for the anticipated (due) portion.
    pub calculation_base: Decimal,
    /// Booking rate, in percent (18 = 18%).
    pub nominal_icms_rate: Decimal,
    pub icms_operation_amount: Decimal,
    pub icms_due_amount: Decimal,
    pub icms_deferred_amount: Decimal,
    pub deferral_percent: Decimal,
    pub benefit_code: String,
    pub applied: AppliedBenefit,
}

/// Computes incentive outcomes against the configured program registry and
/// reform schedule.
#[derive(Debug, Clone, Copy)]
pub struct IncentiveEngine<'a> {
    programs: &'a ProgramRegistry,
    schedule: &'a ReformSchedule,
}

impl<'a> IncentiveEngine<'a> {
    pub fn new(
        programs: &'a ProgramRegistry,
        schedule: &'a ReformSchedule,
    ) -> Self {
        Self { programs, schedule }
    }

    /// Checks whether `program_code` can be used in `state` for `ncms`.
    ///
    /// A refusal is a normal result, not an error.
    ///
    /// # Errors
    ///
    /// - [`PricingError::UnknownProgram`] when the code is not configured
    /// - [`PricingError::MissingField`] for a blank state or NCM
    /// - [`PricingError::InvalidType`] for a malformed NCM
    pub fn validate_eligibility<S: AsRef<str>>(
        &self,
        state: &str,
        program_code: &str,
        ncms: &[S],
    ) -> Result<EligibilityResult, PricingError> {
        let registered = self
            .programs
            .get(program_code)
            .ok_or_else(|| PricingError::UnknownProgram(program_code.to_string()))?;
        let state = require_text("state", Some(state))?.to_ascii_uppercase();

        if !registered.program.covers_state(&state) {
            let alternative_programs = self.programs.codes_for_state(&state);
            debug!(
                program = program_code,
                state = %state,
                alternatives = ?alternative_programs,
                "program not available in state"
            );
            return Ok(EligibilityResult {
                program_code: program_code.to_string(),
                state: state.clone(),
                eligible: false,
                reason: EligibilityReason::StateMismatch { state },
                restricted_ncms: Vec::new(),
                accepted_ncms: Vec::new(),
                alternative_programs,
            });
        }

        let mut restricted_ncms = Vec::new();
        let mut accepted_ncms = Vec::new();
        for (index, raw) in ncms.iter().enumerate() {
            let ncm = normalize_ncm(&format!("ncms[{index}]"), raw.as_ref())?;
            let bucket = if registered.restrictions.is_restricted(&ncm) {
                &mut restricted_ncms
            } else {
                &mut accepted_ncms
            };
            if !bucket.contains(&ncm) {
                bucket.push(ncm);
            }
        }

        if restricted_ncms.is_empty() {
            return Ok(EligibilityResult {
                program_code: program_code.to_string(),
                state,
                eligible: true,
                reason: EligibilityReason::Eligible,
                restricted_ncms,
                accepted_ncms,
                alternative_programs: Vec::new(),
            });
        }

        let alternative_programs = self
            .programs
            .iter()
            .filter(|p| p.program.code != program_code && p.program.covers_state(&state))
            .filter(|p| !restricted_ncms.iter().any(|n| p.restrictions.is_restricted(n)))
            .map(|p| p.program.code.clone())
            .collect();
        warn!(
            program = program_code,
            state = %state,
            restricted = ?restricted_ncms,
            "NCMs excluded by program restriction list"
        );

        Ok(EligibilityResult {
            program_code: program_code.to_string(),
            state,
            eligible: false,
            reason: EligibilityReason::RestrictedNcm {
                count: restricted_ncms.len(),
            },
            restricted_ncms,
            accepted_ncms,
            alternative_programs,
        })
    }

    /// Looks up `program_code` and computes its invoice fields.
    ///
    /// # Errors
    ///
    /// [`PricingError::UnknownProgram`] plus every error of
    /// [`IncentiveEngine::invoice_fields`].
    pub fn calculate_invoice_fields(
        &self,
        subtotal: Decimal,
        program_code: &str,
        phase_index: usize,
    ) -> Result<InvoiceFields, PricingError> {
        let registered = self
            .programs
            .get(program_code)
            .ok_or_else(|| PricingError::UnknownProgram(program_code.to_string()))?;
        Self::invoice_fields(subtotal, &registered.program, phase_index)
    }

    /// Computes invoice fields for `program` without a registry lookup.
    ///
    /// `phase_index` is ignored for total deferral.
    ///
    /// # Errors
    ///
    /// - [`PricingError::MissingNfConfig`] when the program cannot stamp
    ///   invoices
    /// - [`PricingError::InvalidBase`] when `subtotal <= 0`, or when the due
    ///   amount exceeds the operation amount
    /// - [`PricingError::PhaseOutOfRange`] for a phase the program lacks
    /// - [`PricingError::MissingField`] for a partial deferral without a
    ///   calculation rate
    ///
    /// # Example
    ///
    /// ```
    /// use rust_decimal_macros::dec;
    /// use cost_core::calculations::IncentiveEngine;
    /// use cost_core::{BenefitType, IncentiveProgram, NfConfig};
    ///
    /// let program = IncentiveProgram {
    ///     code: "CORREDOR".to_string(),
    ///     name: "Corredor Importação".to_string(),
    ///     eligible_states: vec!["MG".to_string()],
    ///     benefit_type: BenefitType::TotalDeferral,
    ///     booking_rate: dec!(0.18),
    ///     calculation_rate: None,
    ///     phases: Vec::new(),
    ///     nf_config: Some(NfConfig {
    ///         cst: "051".to_string(),
    ///         benefit_code: "MG000001".to_string(),
    ///     }),
    /// };
    ///
    /// let fields = IncentiveEngine::invoice_fields(dec!(5000), &program, 0).unwrap();
    /// assert_eq!(fields.base_amount, dec!(6097.56));
    /// assert_eq!(fields.icms_operation_amount, dec!(1097.56));
    /// assert_eq!(fields.icms_due_amount, dec!(0));
    /// assert_eq!(fields.deferral_percent, dec!(100));
    /// ```
    pub fn invoice_fields(
        subtotal: Decimal,
        program: &IncentiveProgram,
        phase_index: usize,
    ) -> Result<InvoiceFields, PricingError> {
        let nf = program
            .nf_config
            .as_ref()
            .ok_or_else(|| PricingError::MissingNfConfig(program.code.clone()))?;
        positive("subtotal", subtotal)?;

        let booking_base = gross_up("booking_base", subtotal, program.booking_rate)?;
        let operation = round_half_up(
            booking_base
                .checked_mul(program.booking_rate)
                .ok_or_else(|| PricingError::invalid("icms_operation_amount", "amount overflow"))?,
        );

        let (calculation_base, due, phase_label) = match program.benefit_type {
            BenefitType::PartialDeferral => {
                let calculation_rate = program.calculation_rate.ok_or_else(|| {
                    PricingError::MissingField(format!("{}.calculation_rate", program.code))
                })?;
                let phase = program.phases.get(phase_index).ok_or_else(|| {
                    PricingError::PhaseOutOfRange {
                        program: program.code.clone(),
                        index: phase_index,
                        phases: program.phases.len(),
                    }
                })?;
                let calculation_base =
                    gross_up("calculation_base", subtotal, calculation_rate)?;
                let due = round_half_up(
                    calculation_base
                        .checked_mul(phase.anticipation_rate)
                        .ok_or_else(|| PricingError::invalid("icms_due_amount", "amount overflow"))?,
                );
                (calculation_base, due, Some(phase.label.clone()))
            }
            BenefitType::TotalDeferral => (booking_base, Decimal::ZERO, None),
        };

        let deferred = operation - due;
        if deferred < Decimal::ZERO {
            return Err(PricingError::InvalidBase {
                name: "icms_deferred_amount",
                value: deferred,
            });
        }
        let deferral_percent = match program.benefit_type {
            BenefitType::TotalDeferral => Decimal::ONE_HUNDRED,
            BenefitType::PartialDeferral => deferred
                .checked_div(operation)
                .map(|share| round_half_up(share * Decimal::ONE_HUNDRED))
                .unwrap_or(Decimal::ZERO),
        };

        debug!(
            program = %program.code,
            operation = %operation,
            due = %due,
            deferred = %deferred,
            deferral_percent = %deferral_percent,
            "invoice fields computed"
        );

        Ok(InvoiceFields {
            cst: nf.cst.clone(),
            base_amount: round_half_up(booking_base),
            calculation_base: round_half_up(calculation_base),
            nominal_icms_rate: program.booking_rate * Decimal::ONE_HUNDRED,
            icms_operation_amount: operation,
            icms_due_amount: due,
            icms_deferred_amount: deferred,
            deferral_percent,
            benefit_code: nf.benefit_code.clone(),
            applied: AppliedBenefit {
                program_code: program.code.clone(),
                program_name: program.name.clone(),
                benefit_type: program.benefit_type,
                phase_label,
            },
        })
    }

    /// Projects the benefit from `start_year` through
    /// [`DEFAULT_PROJECTION_END`].
    pub fn project_reform_schedule(
        &self,
        start_year: i32,
    ) -> ReformProjection<'a> {
        self.project_reform_schedule_until(start_year, DEFAULT_PROJECTION_END)
    }

    /// Projects the benefit over `start_year..=end_year`. Empty when
    /// `start_year > end_year`.
    pub fn project_reform_schedule_until(
        &self,
        start_year: i32,
        end_year: i32,
    ) -> ReformProjection<'a> {
        ReformProjection::new(self.schedule, start_year, end_year)
    }
}

/// `subtotal / (1 - rate)`: the base whose `rate` share plus `subtotal`
/// equals the base itself.
fn gross_up(
    field: &str,
    subtotal: Decimal,
    rate: Decimal,
) -> Result<Decimal, PricingError> {
    subtotal
        .checked_div(Decimal::ONE - rate)
        .ok_or_else(|| PricingError::invalid(field, "amount overflow"))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{BenefitPhase, NcmRestrictionSet, NfConfig, ReformEntry};

    fn ttd() -> IncentiveProgram {
        IncentiveProgram {
            code: "TTD_409".to_string(),
            name: "TTD 409".to_string(),
            eligible_states: vec!["SC".to_string()],
            benefit_type: BenefitType::PartialDeferral,
            booking_rate: dec!(0.04),
            calculation_rate: Some(dec!(0.04)),
            phases: vec![
                BenefitPhase {
                    label: "Fase 1".to_string(),
                    anticipation_rate: dec!(0.026),
                },
                BenefitPhase {
                    label: "Fase 2".to_string(),
                    anticipation_rate: dec!(0.01),
                },
            ],
            nf_config: Some(NfConfig {
                cst: "090".to_string(),
                benefit_code: "SC830015".to_string(),
            }),
        }
    }

    fn fundap() -> IncentiveProgram {
        IncentiveProgram {
            code: "FUNDAP".to_string(),
            name: "Fundap".to_string(),
            eligible_states: vec!["ES".to_string()],
            benefit_type: BenefitType::TotalDeferral,
            booking_rate: dec!(0.12),
            calculation_rate: None,
            phases: Vec::new(),
            nf_config: Some(NfConfig {
                cst: "051".to_string(),
                benefit_code: "ES000123".to_string(),
            }),
        }
    }

    fn pro_emprego() -> IncentiveProgram {
        IncentiveProgram {
            code: "PRO_EMPREGO".to_string(),
            name: "Pró-Emprego".to_string(),
            eligible_states: vec!["SC".to_string()],
            benefit_type: BenefitType::TotalDeferral,
            booking_rate: dec!(0.18),
            calculation_rate: None,
            phases: Vec::new(),
            nf_config: None,
        }
    }

    fn registry() -> ProgramRegistry {
        ProgramRegistry::new(
            vec![ttd(), fundap(), pro_emprego()],
            vec![NcmRestrictionSet {
                program_code: "TTD_409".to_string(),
                exact: vec!["22030000".to_string()],
                patterns: vec!["8703*".to_string()],
            }],
        )
        .expect("valid registry")
    }

    // =========================================================================
    // validate_eligibility
    // =========================================================================

    #[test]
    fn unknown_program_is_an_error() {
        let (programs, schedule) = (registry(), ReformSchedule::default());
        let engine = IncentiveEngine::new(&programs, &schedule);

        assert_eq!(
            engine.validate_eligibility("SC", "NOPE", &["84713012"]),
            Err(PricingError::UnknownProgram("NOPE".to_string()))
        );
    }

    #[test]
    fn state_mismatch_lists_programs_of_that_state() {
        let (programs, schedule) = (registry(), ReformSchedule::default());
        let engine = IncentiveEngine::new(&programs, &schedule);

        let result = engine
            .validate_eligibility("sc", "FUNDAP", &["84713012"])
            .unwrap();

        assert!(!result.eligible);
        assert_eq!(
            result.reason,
            EligibilityReason::StateMismatch {
                state: "SC".to_string()
            }
        );
        assert_eq!(
            result.alternative_programs,
            vec!["PRO_EMPREGO".to_string(), "TTD_409".to_string()]
        );
    }

    #[test]
    fn exact_restriction_refuses_program() {
        let (programs, schedule) = (registry(), ReformSchedule::default());
        let engine = IncentiveEngine::new(&programs, &schedule);

        let result = engine
            .validate_eligibility("SC", "TTD_409", &["2203.00.00", "84713012"])
            .unwrap();

        assert!(!result.eligible);
        assert_eq!(result.reason, EligibilityReason::RestrictedNcm { count: 1 });
        assert_eq!(result.restricted_ncms, vec!["22030000".to_string()]);
        assert_eq!(result.accepted_ncms, vec!["84713012".to_string()]);
        assert_eq!(result.alternative_programs, vec!["PRO_EMPREGO".to_string()]);
    }

    #[test]
    fn wildcard_restriction_refuses_program() {
        let (programs, schedule) = (registry(), ReformSchedule::default());
        let engine = IncentiveEngine::new(&programs, &schedule);

        let result = engine
            .validate_eligibility("SC", "TTD_409", &["87032310"])
            .unwrap();

        assert!(!result.eligible);
        assert_eq!(result.restricted_ncms, vec!["87032310".to_string()]);
        assert!(result.accepted_ncms.is_empty());
    }

    #[test]
    fn restricted_and_accepted_ncms_are_disjoint() {
        let (programs, schedule) = (registry(), ReformSchedule::default());
        let engine = IncentiveEngine::new(&programs, &schedule);

        let result = engine
            .validate_eligibility(
                "SC",
                "TTD_409",
                &["22030000", "87032310", "84713012", "84713012"],
            )
            .unwrap();

        assert_eq!(result.restricted_ncms.len(), 2);
        assert_eq!(result.accepted_ncms, vec!["84713012".to_string()]);
        assert!(
            result
                .restricted_ncms
                .iter()
                .all(|n| !result.accepted_ncms.contains(n))
        );
    }

    #[test]
    fn unrestricted_ncms_are_eligible() {
        let (programs, schedule) = (registry(), ReformSchedule::default());
        let engine = IncentiveEngine::new(&programs, &schedule);

        let result = engine
            .validate_eligibility("SC", "TTD_409", &["8471.30.12"])
            .unwrap();

        assert!(result.eligible);
        assert_eq!(result.reason, EligibilityReason::Eligible);
        assert_eq!(result.accepted_ncms, vec!["84713012".to_string()]);
    }

    #[test]
    fn malformed_ncm_is_rejected() {
        let (programs, schedule) = (registry(), ReformSchedule::default());
        let engine = IncentiveEngine::new(&programs, &schedule);

        assert!(matches!(
            engine.validate_eligibility("SC", "TTD_409", &["84A"]),
            Err(PricingError::InvalidType { ref field, .. }) if field == "ncms[0]"
        ));
    }

    // =========================================================================
    // invoice fields
    // =========================================================================

    #[test]
    fn total_deferral_defers_whole_operation() {
        let program = IncentiveProgram {
            booking_rate: dec!(0.18),
            ..fundap()
        };

        let fields = IncentiveEngine::invoice_fields(dec!(5000), &program, 0).unwrap();

        assert_eq!(fields.base_amount, dec!(6097.56));
        assert_eq!(fields.icms_operation_amount, dec!(1097.56));
        assert_eq!(fields.icms_due_amount, dec!(0));
        assert_eq!(fields.icms_deferred_amount, dec!(1097.56));
        assert_eq!(fields.deferral_percent, dec!(100));
        assert_eq!(fields.nominal_icms_rate, dec!(18));
        assert_eq!(fields.cst, "051");
        assert_eq!(fields.applied.phase_label, None);
    }

    #[test]
    fn total_deferral_invariant_holds_for_awkward_subtotals() {
        for subtotal in [dec!(0.01), dec!(1), dec!(333.33), dec!(98765.43)] {
            let fields = IncentiveEngine::invoice_fields(subtotal, &fundap(), 0).unwrap();

            assert_eq!(fields.icms_due_amount, dec!(0), "{subtotal}");
            assert_eq!(fields.deferral_percent, dec!(100), "{subtotal}");
            assert_eq!(
                fields.icms_operation_amount,
                fields.icms_due_amount + fields.icms_deferred_amount
            );
        }
    }

    #[test]
    fn partial_deferral_uses_selected_phase() {
        let fields = IncentiveEngine::invoice_fields(dec!(9600), &ttd(), 0).unwrap();

        // booking base = 9600 / 0.96 = 10000
        assert_eq!(fields.base_amount, dec!(10000));
        assert_eq!(fields.calculation_base, dec!(10000));
        assert_eq!(fields.icms_operation_amount, dec!(400));
        assert_eq!(fields.icms_due_amount, dec!(260));
        assert_eq!(fields.icms_deferred_amount, dec!(140));
        assert_eq!(fields.deferral_percent, dec!(35));
        assert_eq!(fields.applied.phase_label, Some("Fase 1".to_string()));
    }

    #[test]
    fn later_phase_defers_more() {
        let fields = IncentiveEngine::invoice_fields(dec!(9600), &ttd(), 1).unwrap();

        assert_eq!(fields.icms_due_amount, dec!(100));
        assert_eq!(fields.icms_deferred_amount, dec!(300));
        assert_eq!(fields.deferral_percent, dec!(75));
    }

    #[test]
    fn operation_equals_due_plus_deferred_after_rounding() {
        let fields = IncentiveEngine::invoice_fields(dec!(1234.57), &ttd(), 0).unwrap();

        assert_eq!(
            fields.icms_operation_amount,
            fields.icms_due_amount + fields.icms_deferred_amount
        );
    }

    #[test]
    fn phase_out_of_range_is_an_error() {
        assert_eq!(
            IncentiveEngine::invoice_fields(dec!(1000), &ttd(), 2),
            Err(PricingError::PhaseOutOfRange {
                program: "TTD_409".to_string(),
                index: 2,
                phases: 2,
            })
        );
    }

    #[test]
    fn program_without_nf_config_cannot_stamp_invoices() {
        let (programs, schedule) = (registry(), ReformSchedule::default());
        let engine = IncentiveEngine::new(&programs, &schedule);

        assert_eq!(
            engine.calculate_invoice_fields(dec!(1000), "PRO_EMPREGO", 0),
            Err(PricingError::MissingNfConfig("PRO_EMPREGO".to_string()))
        );
    }

    #[test]
    fn non_positive_subtotal_is_invalid() {
        assert!(matches!(
            IncentiveEngine::invoice_fields(dec!(0), &ttd(), 0),
            Err(PricingError::InvalidBase {
                name: "subtotal",
                ..
            })
        ));
    }

    #[test]
    fn oversized_subtotal_is_an_error_not_a_panic() {
        assert_eq!(
            IncentiveEngine::invoice_fields(Decimal::MAX, &fundap(), 0),
            Err(PricingError::invalid("booking_base", "amount overflow"))
        );
    }

    #[test]
    fn anticipation_above_booking_rate_is_invalid() {
        let mut program = ttd();
        program.phases[0].anticipation_rate = dec!(0.05);

        assert!(matches!(
            IncentiveEngine::invoice_fields(dec!(9600), &program, 0),
            Err(PricingError::InvalidBase {
                name: "icms_deferred_amount",
                ..
            })
        ));
    }

    // =========================================================================
    // reform projection
    // =========================================================================

    #[test]
    fn projection_defaults_to_2033() {
        let programs = registry();
        let schedule = ReformSchedule::new(
            (2031..=2033)
                .map(|year| ReformEntry {
                    year,
                    retained: dec!(0.5),
                    phase_label: "Transição".to_string(),
                })
                .collect(),
        )
        .unwrap();
        let engine = IncentiveEngine::new(&programs, &schedule);

        let years: Vec<i32> = engine
            .project_reform_schedule(2031)
            .map(|s| s.map(|s| s.year))
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(years, vec![2031, 2032, 2033]);
    }
}
