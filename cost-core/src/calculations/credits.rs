//! Regime-dependent recovery of taxes paid at import.
//!
//! | Regime             | PIS / COFINS                          | IPI       | ICMS       |
//! |--------------------|---------------------------------------|-----------|------------|
//! | `lucro_real`       | credit base × rate for the import type | `ipi_due` | `icms_due` |
//! | `lucro_presumido`  | 0                                     | `ipi_due` | `icms_due` |
//! | `simples_nacional` | 0                                     | 0         | 0          |
//!
//! The credit base is the customs value plus IPI. Customs expenses never
//! generate PIS/COFINS credits. A declaration is monophasic when any of its
//! additions falls under a configured monophasic NCM heading; the extra COFINS
//! surcharge levied on those goods is never creditable.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::PricingError;
use crate::calculations::common::{checked_sum, percent_of};
use crate::calculations::ncm::normalize_ncm;
use crate::calculations::validation::positive;
use crate::config::MonophasicTable;
use crate::models::{ImportType, RateTable, Regime, TaxTotals};

/// Credits recoverable on one declaration under one regime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditBreakdown {
    pub regime: Regime,
    pub import_type: ImportType,
    /// Base cost the credits are measured against.
    pub base_cost: Decimal,
    /// Customs value + IPI.
    pub credit_base: Decimal,
    /// PIS rate actually applied, in percent. Zero when the regime takes no
    /// PIS credit.
    pub pis_rate: Decimal,
    /// COFINS rate actually applied, in percent.
    pub cofins_rate: Decimal,
    /// COFINS surcharge paid on monophasic goods and left out of the credit.
    pub non_creditable_surcharge_rate: Decimal,
    pub pis_credit: Decimal,
    pub cofins_credit: Decimal,
    pub ipi_credit: Decimal,
    pub icms_credit: Decimal,
    pub total_credit: Decimal,
    /// Normalised NCMs that made the declaration monophasic.
    pub monophasic_ncms: Vec<String>,
}

impl CreditBreakdown {
    /// Share of the base cost recovered as credit (0.2257 = 22.57%).
    pub fn effective_credit_rate(&self) -> Decimal {
        self.total_credit
            .checked_div(self.base_cost)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Computes credits from the configured rate table and monophasic headings.
#[derive(Debug, Clone, Copy)]
pub struct RegimeCreditEngine<'a> {
    rates: &'a RateTable,
    monophasic: &'a MonophasicTable,
}

impl<'a> RegimeCreditEngine<'a> {
    pub fn new(
        rates: &'a RateTable,
        monophasic: &'a MonophasicTable,
    ) -> Self {
        Self { rates, monophasic }
    }

    /// Classifies the declaration and returns the NCMs that matched a
    /// monophasic heading.
    ///
    /// A declaration without additions is a normal import.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::MissingField`] / [`PricingError::InvalidType`]
    /// for a blank or malformed addition NCM.
    pub fn detect_import_type(
        &self,
        totals: &TaxTotals,
    ) -> Result<(ImportType, Vec<String>), PricingError> {
        let mut monophasic_ncms = Vec::new();
        for addition in &totals.additions {
            let field = format!("additions[{}].ncm", addition.number);
            let ncm = normalize_ncm(&field, &addition.ncm)?;
            if self.monophasic.contains_heading(&ncm) && !monophasic_ncms.contains(&ncm) {
                monophasic_ncms.push(ncm);
            }
        }

        let import_type = if monophasic_ncms.is_empty() {
            ImportType::Normal
        } else {
            ImportType::Monophasic
        };
        Ok((import_type, monophasic_ncms))
    }

    /// Computes the PIS, COFINS, IPI and ICMS credits for `regime`.
    ///
    /// # Errors
    ///
    /// - [`PricingError::InvalidBase`] when `base_cost` or the credit base is
    ///   not strictly positive
    /// - [`PricingError::InvalidType`] for negative totals, malformed NCMs or
    ///   amounts too large to add up
    ///
    /// # Example
    ///
    /// ```
    /// use rust_decimal_macros::dec;
    /// use cost_core::calculations::RegimeCreditEngine;
    /// use cost_core::config::MonophasicTable;
    /// use cost_core::{RateTable, Regime, TaxTotals};
    ///
    /// let rates = RateTable {
    ///     pis_import_rate: dec!(2.10),
    ///     cofins_import_rate: dec!(9.65),
    ///     pis_import_rate_monophasic: dec!(2.76),
    ///     cofins_import_rate_monophasic: dec!(13.03),
    ///     cofins_surcharge_rate: dec!(1.00),
    /// };
    /// let monophasic = MonophasicTable::default();
    /// let engine = RegimeCreditEngine::new(&rates, &monophasic);
    ///
    /// let totals = TaxTotals {
    ///     customs_value: dec!(10000),
    ///     ii_due: dec!(600),
    ///     ipi_due: dec!(200),
    ///     pis_due: dec!(165),
    ///     cofins_due: dec!(760),
    ///     icms_due: dec!(1700),
    ///     customs_expenses: dec!(300),
    ///     additions: Vec::new(),
    /// };
    ///
    /// let credits = engine
    ///     .compute_credits(dec!(13725), Regime::LucroReal, &totals)
    ///     .unwrap();
    /// assert_eq!(credits.pis_credit, dec!(214.2));
    /// assert_eq!(credits.cofins_credit, dec!(984.3));
    /// assert_eq!(credits.total_credit, dec!(3098.5));
    /// ```
    pub fn compute_credits(
        &self,
        base_cost: Decimal,
        regime: Regime,
        totals: &TaxTotals,
    ) -> Result<CreditBreakdown, PricingError> {
        positive("base_cost", base_cost)?;
        totals.validate()?;
        let credit_base = positive(
            "credit_base",
            checked_sum("credit_base", [totals.customs_value, totals.ipi_due])?,
        )?;
        let (import_type, monophasic_ncms) = self.detect_import_type(totals)?;

        if import_type == ImportType::Monophasic {
            warn!(
                ncms = ?monophasic_ncms,
                surcharge_rate = %self.rates.cofins_surcharge_rate,
                "monophasic products detected; COFINS surcharge is not creditable"
            );
        }

        let (pis_rate, cofins_rate, ipi_credit, icms_credit) = match regime {
            Regime::LucroReal => {
                let (pis, cofins) = self.rates.credit_rates(import_type);
                (pis, cofins, totals.ipi_due, totals.icms_due)
            }
            Regime::LucroPresumido => (
                Decimal::ZERO,
                Decimal::ZERO,
                totals.ipi_due,
                totals.icms_due,
            ),
            Regime::SimplesNacional => {
                warn!(
                    base_cost = %base_cost,
                    "simples nacional recovers no import taxes; disbursement equals base cost"
                );
                (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
            }
        };

        let pis_credit = percent_of("pis_credit", credit_base, pis_rate)?;
        let cofins_credit = percent_of("cofins_credit", credit_base, cofins_rate)?;
        let total_credit = checked_sum(
            "total_credit",
            [pis_credit, cofins_credit, ipi_credit, icms_credit],
        )?;

        let non_creditable_surcharge_rate = match import_type {
            ImportType::Monophasic => self.rates.cofins_surcharge_rate,
            ImportType::Normal => Decimal::ZERO,
        };

        debug!(
            regime = %regime,
            import_type = %import_type,
            credit_base = %credit_base,
            pis_credit = %pis_credit,
            cofins_credit = %cofins_credit,
            ipi_credit = %ipi_credit,
            icms_credit = %icms_credit,
            total_credit = %total_credit,
            "credits computed"
        );

        Ok(CreditBreakdown {
            regime,
            import_type,
            base_cost,
            credit_base,
            pis_rate,
            cofins_rate,
            non_creditable_surcharge_rate,
            pis_credit,
            cofins_credit,
            ipi_credit,
            icms_credit,
            total_credit,
            monophasic_ncms,
        })
    }
}
