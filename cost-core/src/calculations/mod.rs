//! Landed-cost, credit and incentive calculations.
//!
//! Calculators borrow their tables from a
//! [`ConfigSnapshot`](crate::config::ConfigSnapshot) and never perform I/O.

pub mod cascade;
pub mod common;
pub mod credits;
pub mod incentives;
pub mod ncm;
pub mod reform;
pub mod validation;

pub use cascade::{
    AccountingBreakdown, BaseCostBreakdown, CostCascadeCalculator, CostCascadeResult,
    DisbursementBreakdown, PricingBaseBreakdown,
};
pub use credits::{CreditBreakdown, RegimeCreditEngine};
pub use incentives::{
    AppliedBenefit, EligibilityReason, EligibilityResult, IncentiveEngine, InvoiceFields,
};
pub use ncm::{NcmMatcher, normalize_ncm};
pub use reform::{DEFAULT_PROJECTION_END, REFORM_TRANSITION_START, ReformProjection, YearScenario};
pub use validation::{RawAddition, RawManagerialParameters, RawTaxTotals};
