//! End-to-end pricing of import declarations.
//!
//! The orchestrator runs the cost cascade and, when asked, the incentive
//! engine on the same declaration. Incentive results are reported next to
//! the cascade and never change its values.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::PricingError;
use crate::calculations::common::round_half_up;
use crate::calculations::{
    CostCascadeResult, CreditBreakdown, EligibilityResult, InvoiceFields, ReformProjection,
    YearScenario,
};
use crate::config::{ConfigSnapshot, ConfigurationProvider};
use crate::models::{ManagerialParameters, Regime, TaxTotals};

/// Incentive program to evaluate for a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncentiveRequest {
    /// Destination state (UF), e.g. `"SC"`.
    pub state: String,
    pub program_code: String,
    #[serde(default)]
    pub phase_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingRequest {
    /// Declaration number, carried through to the result.
    pub declaration: String,
    pub totals: TaxTotals,
    pub regime: Regime,
    pub params: ManagerialParameters,
    #[serde(default)]
    pub incentive: Option<IncentiveRequest>,
    /// First year of the reform projection; no projection when absent.
    #[serde(default)]
    pub reform_start_year: Option<i32>,
}

/// Deferred ICMS still granted in one projected year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedBenefit {
    pub scenario: YearScenario,
    pub retained_deferral: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncentiveOutcome {
    pub eligibility: EligibilityResult,
    /// Present only when the program is eligible.
    pub invoice_fields: Option<InvoiceFields>,
    pub reform_projection: Vec<ProjectedBenefit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingResult {
    pub declaration: String,
    pub cascade: CostCascadeResult,
    pub incentive: Option<IncentiveOutcome>,
}

/// Entry point for every pricing operation.
///
/// Cheap to clone; all clones share one configuration snapshot.
#[derive(Debug, Clone)]
pub struct PricingOrchestrator {
    config: Arc<ConfigSnapshot>,
}

impl PricingOrchestrator {
    pub fn new(config: Arc<ConfigSnapshot>) -> Self {
        Self { config }
    }

    /// Loads a snapshot from `provider` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::Configuration`] when loading or validation
    /// fails.
    pub async fn from_provider(provider: &dyn ConfigurationProvider) -> Result<Self, PricingError> {
        let snapshot = ConfigSnapshot::load(provider).await?;
        Ok(Self::new(Arc::new(snapshot)))
    }

    pub fn config(&self) -> &Arc<ConfigSnapshot> {
        &self.config
    }

    pub fn compute_cost_cascade(
        &self,
        totals: &TaxTotals,
        regime: Regime,
        params: &ManagerialParameters,
    ) -> Result<CostCascadeResult, PricingError> {
        self.config
            .cascade_calculator()
            .compute(totals, regime, params)
    }

    pub fn compute_credits(
        &self,
        base_cost: Decimal,
        regime: Regime,
        totals: &TaxTotals,
    ) -> Result<CreditBreakdown, PricingError> {
        self.config
            .credit_engine()
            .compute_credits(base_cost, regime, totals)
    }

    pub fn validate_eligibility<S: AsRef<str>>(
        &self,
        state: &str,
        program_code: &str,
        ncms: &[S],
    ) -> Result<EligibilityResult, PricingError> {
        self.config
            .incentive_engine()
            .validate_eligibility(state, program_code, ncms)
    }

    pub fn calculate_invoice_fields(
        &self,
        subtotal: Decimal,
        program_code: &str,
        phase_index: usize,
    ) -> Result<InvoiceFields, PricingError> {
        self.config
            .incentive_engine()
            .calculate_invoice_fields(subtotal, program_code, phase_index)
    }

    pub fn project_reform_schedule(
        &self,
        start_year: i32,
    ) -> ReformProjection<'_> {
        self.config
            .incentive_engine()
            .project_reform_schedule(start_year)
    }

    /// Prices one declaration: cascade first, then the requested incentive.
    ///
    /// The pricing base is the subtotal of the resale invoice. The reform
    /// projection applies each year's multiplier to the deferred ICMS.
    ///
    /// # Errors
    ///
    /// Propagates the first [`PricingError`] of any stage. An ineligible
    /// program is not an error.
    pub fn price_declaration(
        &self,
        request: &PricingRequest,
    ) -> Result<PricingResult, PricingError> {
        let cascade = self.compute_cost_cascade(&request.totals, request.regime, &request.params)?;

        let incentive = match &request.incentive {
            Some(incentive) => Some(self.evaluate_incentive(request, incentive, &cascade)?),
            None => None,
        };

        info!(
            declaration = %request.declaration,
            regime = %request.regime,
            base_cost = %cascade.base_cost(),
            disbursement_cost = %cascade.disbursement_cost(),
            pricing_base = %cascade.pricing_base(),
            incentive_eligible = ?incentive.as_ref().map(|i| i.eligibility.eligible),
            "declaration priced"
        );

        Ok(PricingResult {
            declaration: request.declaration.clone(),
            cascade,
            incentive,
        })
    }

    fn evaluate_incentive(
        &self,
        request: &PricingRequest,
        incentive: &IncentiveRequest,
        cascade: &CostCascadeResult,
    ) -> Result<IncentiveOutcome, PricingError> {
        let ncms: Vec<&str> = request
            .totals
            .additions
            .iter()
            .map(|a| a.ncm.as_str())
            .collect();
        let eligibility =
            self.validate_eligibility(&incentive.state, &incentive.program_code, &ncms)?;

        if !eligibility.eligible {
            return Ok(IncentiveOutcome {
                eligibility,
                invoice_fields: None,
                reform_projection: Vec::new(),
            });
        }

        let fields = self.calculate_invoice_fields(
            cascade.pricing_base(),
            &incentive.program_code,
            incentive.phase_index,
        )?;

        let reform_projection = match request.reform_start_year {
            Some(start_year) => self
                .project_reform_schedule(start_year)
                .map(|scenario| {
                    scenario.map(|scenario| ProjectedBenefit {
                        retained_deferral: round_half_up(
                            scenario.retained_amount(fields.icms_deferred_amount),
                        ),
                        scenario,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Ok(IncentiveOutcome {
            eligibility,
            invoice_fields: Some(fields),
            reform_projection,
        })
    }
}
