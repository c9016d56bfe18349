//! Four-tier landed-cost cascade for one import declaration.
//!
//! # Tiers
//!
//! | Tier | Name          | Formula                                                       |
//! |------|---------------|---------------------------------------------------------------|
//! | 1    | Base cost     | customs value + II + IPI + PIS + COFINS + ICMS + expenses     |
//! | 2    | Disbursement  | base cost − recoverable credits                               |
//! | 3    | Accounting    | disbursement + disbursement × financial % − other recoverable |
//! | 4    | Pricing base  | accounting + accounting × indirect % + accounting × margin %  |
//!
//! Each tier only reads the previous tier and its own inputs, and each
//! returns a breakdown record with every intermediate value. Tier values keep
//! full decimal precision.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use cost_core::calculations::{CostCascadeCalculator, RegimeCreditEngine};
//! use cost_core::config::MonophasicTable;
//! use cost_core::{ManagerialParameters, RateTable, Regime, TaxTotals};
//!
//! let rates = RateTable {
//!     pis_import_rate: dec!(2.10),
//!     cofins_import_rate: dec!(9.65),
//!     pis_import_rate_monophasic: dec!(2.76),
//!     cofins_import_rate_monophasic: dec!(13.03),
//!     cofins_surcharge_rate: dec!(1.00),
//! };
//! let monophasic = MonophasicTable::default();
//! let calculator = CostCascadeCalculator::new(RegimeCreditEngine::new(&rates, &monophasic));
//!
//! let totals = TaxTotals {
//!     customs_value: dec!(10000),
//!     ii_due: dec!(600),
//!     ipi_due: dec!(200),
//!     pis_due: dec!(165),
//!     cofins_due: dec!(760),
//!     icms_due: dec!(1700),
//!     customs_expenses: dec!(300),
//!     additions: Vec::new(),
//! };
//! let params = ManagerialParameters {
//!     financial_charges_percent: dec!(2),
//!     other_recoverable_taxes: dec!(0),
//!     indirect_costs_percent: dec!(10),
//!     operating_margin_percent: dec!(30),
//! };
//!
//! let result = calculator.compute(&totals, Regime::LucroReal, &params).unwrap();
//! assert_eq!(result.base_cost(), dec!(13725));
//! assert_eq!(result.disbursement_cost(), dec!(10626.5));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::PricingError;
use crate::calculations::common::{checked_sum, percent_of};
use crate::calculations::credits::{CreditBreakdown, RegimeCreditEngine};
use crate::calculations::validation::positive;
use crate::models::{ManagerialParameters, Regime, TaxTotals};

/// Tier 1: the seven monetary components and their sum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseCostBreakdown {
    pub customs_value: Decimal,
    pub ii_due: Decimal,
    pub ipi_due: Decimal,
    pub pis_due: Decimal,
    pub cofins_due: Decimal,
    pub icms_due: Decimal,
    pub customs_expenses: Decimal,
    pub base_cost: Decimal,
}

/// Tier 2: base cost net of recoverable credits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisbursementBreakdown {
    pub base_cost: Decimal,
    pub credits: CreditBreakdown,
    pub disbursement_cost: Decimal,
}

/// Tier 3: disbursement plus financing, less other recoverable taxes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountingBreakdown {
    pub disbursement_cost: Decimal,
    pub financial_charges_percent: Decimal,
    pub financial_charges: Decimal,
    pub other_recoverable_taxes: Decimal,
    pub accounting_cost: Decimal,
}

/// Tier 4: accounting cost plus indirect costs and operating margin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingBaseBreakdown {
    pub accounting_cost: Decimal,
    pub indirect_costs_percent: Decimal,
    pub indirect_costs: Decimal,
    pub operating_margin_percent: Decimal,
    pub operating_margin: Decimal,
    pub pricing_base: Decimal,
}

/// All four tiers of one declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostCascadeResult {
    pub base: BaseCostBreakdown,
    pub disbursement: DisbursementBreakdown,
    pub accounting: AccountingBreakdown,
    pub pricing: PricingBaseBreakdown,
}

impl CostCascadeResult {
    pub fn base_cost(&self) -> Decimal {
        self.base.base_cost
    }

    pub fn disbursement_cost(&self) -> Decimal {
        self.disbursement.disbursement_cost
    }

    pub fn accounting_cost(&self) -> Decimal {
        self.accounting.accounting_cost
    }

    pub fn pricing_base(&self) -> Decimal {
        self.pricing.pricing_base
    }

    pub fn credits(&self) -> &CreditBreakdown {
        &self.disbursement.credits
    }
}

/// Runs the cascade tiers in order.
#[derive(Debug, Clone, Copy)]
pub struct CostCascadeCalculator<'a> {
    credits: RegimeCreditEngine<'a>,
}

impl<'a> CostCascadeCalculator<'a> {
    pub fn new(credits: RegimeCreditEngine<'a>) -> Self {
        Self { credits }
    }

    /// Runs all four tiers.
    ///
    /// # Errors
    ///
    /// Propagates the first error raised by any tier.
    pub fn compute(
        &self,
        totals: &TaxTotals,
        regime: Regime,
        params: &ManagerialParameters,
    ) -> Result<CostCascadeResult, PricingError> {
        let base = self.compute_base_cost(totals)?;
        let disbursement = self.compute_disbursement_cost(base.base_cost, regime, totals)?;
        let accounting = self.compute_accounting_cost(disbursement.disbursement_cost, params)?;
        let pricing = self.compute_pricing_base(accounting.accounting_cost, params)?;

        Ok(CostCascadeResult {
            base,
            disbursement,
            accounting,
            pricing,
        })
    }

    /// Tier 1: sums the seven monetary components without rounding.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::InvalidType`] when a component is negative or
    /// the sum overflows.
    pub fn compute_base_cost(
        &self,
        totals: &TaxTotals,
    ) -> Result<BaseCostBreakdown, PricingError> {
        totals.validate()?;
        let base_cost = checked_sum(
            "base_cost",
            totals.components().into_iter().map(|(_, value)| value),
        )?;
        debug!(base_cost = %base_cost, "base cost computed");

        Ok(BaseCostBreakdown {
            customs_value: totals.customs_value,
            ii_due: totals.ii_due,
            ipi_due: totals.ipi_due,
            pis_due: totals.pis_due,
            cofins_due: totals.cofins_due,
            icms_due: totals.icms_due,
            customs_expenses: totals.customs_expenses,
            base_cost,
        })
    }

    /// Tier 2: subtracts the regime's credits from the base cost.
    ///
    /// # Errors
    ///
    /// - [`PricingError::InvalidBase`] when `base_cost <= 0`
    /// - any error from [`RegimeCreditEngine::compute_credits`]
    pub fn compute_disbursement_cost(
        &self,
        base_cost: Decimal,
        regime: Regime,
        totals: &TaxTotals,
    ) -> Result<DisbursementBreakdown, PricingError> {
        positive("base_cost", base_cost)?;
        let credits = self.credits.compute_credits(base_cost, regime, totals)?;
        let disbursement_cost = base_cost
            .checked_sub(credits.total_credit)
            .ok_or_else(|| PricingError::invalid("disbursement_cost", "amount overflow"))?;
        debug!(
            base_cost = %base_cost,
            total_credit = %credits.total_credit,
            disbursement_cost = %disbursement_cost,
            "disbursement cost computed"
        );

        Ok(DisbursementBreakdown {
            base_cost,
            credits,
            disbursement_cost,
        })
    }

    /// Tier 3: adds financing and removes other recoverable taxes.
    ///
    /// # Errors
    ///
    /// - [`PricingError::InvalidBase`] when `disbursement_cost <= 0`
    /// - [`PricingError::InvalidType`] for out-of-range parameters or overflow
    pub fn compute_accounting_cost(
        &self,
        disbursement_cost: Decimal,
        params: &ManagerialParameters,
    ) -> Result<AccountingBreakdown, PricingError> {
        positive("disbursement_cost", disbursement_cost)?;
        params.validate()?;

        let financial_charges = percent_of(
            "financial_charges",
            disbursement_cost,
            params.financial_charges_percent,
        )?;
        let accounting_cost = checked_sum(
            "accounting_cost",
            [
                disbursement_cost,
                financial_charges,
                -params.other_recoverable_taxes,
            ],
        )?;

        if accounting_cost < disbursement_cost {
            warn!(
                disbursement_cost = %disbursement_cost,
                financial_charges = %financial_charges,
                other_recoverable_taxes = %params.other_recoverable_taxes,
                accounting_cost = %accounting_cost,
                "other recoverable taxes exceed financial charges; accounting cost below disbursement"
            );
        }
        debug!(accounting_cost = %accounting_cost, "accounting cost computed");

        Ok(AccountingBreakdown {
            disbursement_cost,
            financial_charges_percent: params.financial_charges_percent,
            financial_charges,
            other_recoverable_taxes: params.other_recoverable_taxes,
            accounting_cost,
        })
    }

    /// Tier 4: adds indirect costs and the operating margin.
    ///
    /// Both percentages apply to the accounting cost, not to each other.
    ///
    /// # Errors
    ///
    /// - [`PricingError::InvalidBase`] when `accounting_cost <= 0`
    /// - [`PricingError::InvalidType`] for out-of-range parameters or overflow
    pub fn compute_pricing_base(
        &self,
        accounting_cost: Decimal,
        params: &ManagerialParameters,
    ) -> Result<PricingBaseBreakdown, PricingError> {
        positive("accounting_cost", accounting_cost)?;
        params.validate()?;

        let indirect_costs = percent_of(
            "indirect_costs",
            accounting_cost,
            params.indirect_costs_percent,
        )?;
        let operating_margin = percent_of(
            "operating_margin",
            accounting_cost,
            params.operating_margin_percent,
        )?;
        let pricing_base = checked_sum(
            "pricing_base",
            [accounting_cost, indirect_costs, operating_margin],
        )?;
        debug!(pricing_base = %pricing_base, "pricing base computed");

        Ok(PricingBaseBreakdown {
            accounting_cost,
            indirect_costs_percent: params.indirect_costs_percent,
            indirect_costs,
            operating_margin_percent: params.operating_margin_percent,
            operating_margin,
            pricing_base,
        })
    }
}
