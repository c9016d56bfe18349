use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::PricingError;
use crate::calculations::validation::{non_negative, percent_within};

/// Upper bound for the operating margin percentage.
pub const MAX_MARGIN_PERCENT: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// One addition (adição) of an import declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addition {
    pub number: u32,
    pub ncm: String,
}

/// Aggregated duty and tax amounts of one import declaration, in BRL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxTotals {
    /// Customs value (valor aduaneiro) after exchange conversion.
    pub customs_value: Decimal,
    pub ii_due: Decimal,
    pub ipi_due: Decimal,
    pub pis_due: Decimal,
    pub cofins_due: Decimal,
    pub icms_due: Decimal,
    /// Port, storage and clearance expenses (despesas aduaneiras).
    pub customs_expenses: Decimal,
    #[serde(default)]
    pub additions: Vec<Addition>,
}

impl TaxTotals {
    /// The seven monetary components, in cascade order.
    pub fn components(&self) -> [(&'static str, Decimal); 7] {
        [
            ("customs_value", self.customs_value),
            ("ii_due", self.ii_due),
            ("ipi_due", self.ipi_due),
            ("pis_due", self.pis_due),
            ("cofins_due", self.cofins_due),
            ("icms_due", self.icms_due),
            ("customs_expenses", self.customs_expenses),
        ]
    }

    /// Checks that every monetary component is non-negative.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::InvalidType`] naming the first negative field.
    pub fn validate(&self) -> Result<(), PricingError> {
        for (field, value) in self.components() {
            non_negative(field, value)?;
        }
        Ok(())
    }
}

/// Business parameters entered by the user for the accounting and pricing
/// tiers. None of them has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerialParameters {
    /// Financing cost over the disbursement, in percent (0–100).
    pub financial_charges_percent: Decimal,
    /// Other recoverable taxes in BRL, subtracted from the accounting cost.
    pub other_recoverable_taxes: Decimal,
    /// Indirect costs over the accounting cost, in percent (0–100).
    pub indirect_costs_percent: Decimal,
    /// Operating margin over the accounting cost, in percent (0–1000).
    pub operating_margin_percent: Decimal,
}

impl ManagerialParameters {
    /// Checks percent ranges and the sign of the recoverable-tax amount.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::InvalidType`] naming the first offending field.
    pub fn validate(&self) -> Result<(), PricingError> {
        percent_within(
            "financial_charges_percent",
            self.financial_charges_percent,
            Decimal::ONE_HUNDRED,
        )?;
        non_negative("other_recoverable_taxes", self.other_recoverable_taxes)?;
        percent_within(
            "indirect_costs_percent",
            self.indirect_costs_percent,
            Decimal::ONE_HUNDRED,
        )?;
        percent_within(
            "operating_margin_percent",
            self.operating_margin_percent,
            MAX_MARGIN_PERCENT,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn params() -> ManagerialParameters {
        ManagerialParameters {
            financial_charges_percent: dec!(2.5),
            other_recoverable_taxes: dec!(0),
            indirect_costs_percent: dec!(10),
            operating_margin_percent: dec!(30),
        }
    }

    #[test]
    fn max_margin_constant_is_one_thousand() {
        assert_eq!(MAX_MARGIN_PERCENT, dec!(1000));
    }

    #[test]
    fn validate_accepts_margin_above_one_hundred() {
        let params = ManagerialParameters {
            operating_margin_percent: dec!(250),
            ..params()
        };

        assert_eq!(params.validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_margin_above_one_thousand() {
        let params = ManagerialParameters {
            operating_margin_percent: dec!(1000.01),
            ..params()
        };

        let err = params.validate().unwrap_err();

        assert!(matches!(
            err,
            PricingError::InvalidType { ref field, .. } if field == "operating_margin_percent"
        ));
    }

    #[test]
    fn validate_rejects_indirect_costs_above_one_hundred() {
        let params = ManagerialParameters {
            indirect_costs_percent: dec!(101),
            ..params()
        };

        let err = params.validate().unwrap_err();

        assert!(matches!(
            err,
            PricingError::InvalidType { ref field, .. } if field == "indirect_costs_percent"
        ));
    }

    #[test]
    fn validate_rejects_negative_recoverable_taxes() {
        let params = ManagerialParameters {
            other_recoverable_taxes: dec!(-1),
            ..params()
        };

        let err = params.validate().unwrap_err();

        assert!(matches!(
            err,
            PricingError::InvalidType { ref field, .. } if field == "other_recoverable_taxes"
        ));
    }

    #[test]
    fn tax_totals_validate_names_negative_field() {
        let totals = TaxTotals {
            customs_value: dec!(100),
            ii_due: dec!(0),
            ipi_due: dec!(0),
            pis_due: dec!(0),
            cofins_due: dec!(-0.01),
            icms_due: dec!(0),
            customs_expenses: dec!(0),
            additions: Vec::new(),
        };

        let err = totals.validate().unwrap_err();

        assert!(matches!(
            err,
            PricingError::InvalidType { ref field, .. } if field == "cofins_due"
        ));
    }
}
