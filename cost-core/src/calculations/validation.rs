//! Input validation combinators.
//!
//! Every public calculation validates its inputs through these helpers before
//! doing any arithmetic, so a missing or malformed value is reported with the
//! field name instead of being replaced by a default.
//!
//! Upstream collaborators (declaration extractors, forms, CSV files) hand over
//! text cells. [`RawTaxTotals`] and [`RawManagerialParameters`] capture those
//! cells as-is and convert into the typed models with `TryFrom`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::PricingError;
use crate::models::{Addition, ManagerialParameters, TaxTotals};

/// Unwraps a required value.
///
/// # Errors
///
/// Returns [`PricingError::MissingField`] when `value` is `None`.
pub fn require<T>(
    field: &str,
    value: Option<T>,
) -> Result<T, PricingError> {
    value.ok_or_else(|| PricingError::MissingField(field.to_string()))
}

/// Parses a required decimal cell.
///
/// Absent or blank cells are missing, never zero. A zero amount must be
/// written explicitly as `0`.
///
/// # Errors
///
/// - [`PricingError::MissingField`] for `None` or whitespace-only input
/// - [`PricingError::InvalidType`] when the text is not a decimal number
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use cost_core::PricingError;
/// use cost_core::calculations::validation::parse_decimal_field;
///
/// assert_eq!(parse_decimal_field("ii_due", Some(" 600.00 ")), Ok(dec!(600.00)));
/// assert_eq!(
///     parse_decimal_field("ii_due", Some("")),
///     Err(PricingError::MissingField("ii_due".to_string()))
/// );
/// ```
pub fn parse_decimal_field(
    field: &str,
    raw: Option<&str>,
) -> Result<Decimal, PricingError> {
    let text = require(field, raw.map(str::trim).filter(|s| !s.is_empty()))?;
    text.parse::<Decimal>()
        .map_err(|e| PricingError::invalid(field, format!("'{text}' is not a number ({e})")))
}

/// Rejects negative amounts.
///
/// # Errors
///
/// Returns [`PricingError::InvalidType`] when `value < 0`.
pub fn non_negative(
    field: &str,
    value: Decimal,
) -> Result<Decimal, PricingError> {
    if value < Decimal::ZERO {
        return Err(PricingError::invalid(
            field,
            format!("must not be negative, got {value}"),
        ));
    }
    Ok(value)
}

/// Accepts percentages in `[0, max]`.
///
/// # Errors
///
/// Returns [`PricingError::InvalidType`] when `value` is outside the range.
pub fn percent_within(
    field: &str,
    value: Decimal,
    max: Decimal,
) -> Result<Decimal, PricingError> {
    if value < Decimal::ZERO || value > max {
        return Err(PricingError::invalid(
            field,
            format!("percentage must be between 0 and {max}, got {value}"),
        ));
    }
    Ok(value)
}

/// Requires a computed intermediate to be strictly positive.
///
/// # Errors
///
/// Returns [`PricingError::InvalidBase`] when `value <= 0`.
pub fn positive(
    name: &'static str,
    value: Decimal,
) -> Result<Decimal, PricingError> {
    if value <= Decimal::ZERO {
        return Err(PricingError::InvalidBase { name, value });
    }
    Ok(value)
}

/// Requires a non-blank text value and returns it trimmed.
///
/// # Errors
///
/// Returns [`PricingError::MissingField`] for `None` or blank text.
pub fn require_text(
    field: &str,
    raw: Option<&str>,
) -> Result<String, PricingError> {
    require(field, raw.map(str::trim).filter(|s| !s.is_empty())).map(str::to_string)
}

/// Declaration addition as received from upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAddition {
    pub number: u32,
    pub ncm: Option<String>,
}

/// Declaration totals as received from upstream, one text cell per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTaxTotals {
    pub customs_value: Option<String>,
    pub ii_due: Option<String>,
    pub ipi_due: Option<String>,
    pub pis_due: Option<String>,
    pub cofins_due: Option<String>,
    pub icms_due: Option<String>,
    pub customs_expenses: Option<String>,
    #[serde(default)]
    pub additions: Vec<RawAddition>,
}

impl TryFrom<RawTaxTotals> for TaxTotals {
    type Error = PricingError;

    fn try_from(raw: RawTaxTotals) -> Result<Self, Self::Error> {
        let additions = raw
            .additions
            .iter()
            .map(|addition| {
                let field = format!("additions[{}].ncm", addition.number);
                Ok(Addition {
                    number: addition.number,
                    ncm: require_text(&field, addition.ncm.as_deref())?,
                })
            })
            .collect::<Result<Vec<_>, PricingError>>()?;

        let totals = TaxTotals {
            customs_value: parse_decimal_field("customs_value", raw.customs_value.as_deref())?,
            ii_due: parse_decimal_field("ii_due", raw.ii_due.as_deref())?,
            ipi_due: parse_decimal_field("ipi_due", raw.ipi_due.as_deref())?,
            pis_due: parse_decimal_field("pis_due", raw.pis_due.as_deref())?,
            cofins_due: parse_decimal_field("cofins_due", raw.cofins_due.as_deref())?,
            icms_due: parse_decimal_field("icms_due", raw.icms_due.as_deref())?,
            customs_expenses: parse_decimal_field(
                "customs_expenses",
                raw.customs_expenses.as_deref(),
            )?,
            additions,
        };
        totals.validate()?;
        Ok(totals)
    }
}

/// Managerial parameters as entered by the user, one text cell per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawManagerialParameters {
    pub financial_charges_percent: Option<String>,
    pub other_recoverable_taxes: Option<String>,
    pub indirect_costs_percent: Option<String>,
    pub operating_margin_percent: Option<String>,
}

impl TryFrom<RawManagerialParameters> for ManagerialParameters {
    type Error = PricingError;

    fn try_from(raw: RawManagerialParameters) -> Result<Self, Self::Error> {
        let params = ManagerialParameters {
            financial_charges_percent: parse_decimal_field(
                "financial_charges_percent",
                raw.financial_charges_percent.as_deref(),
            )?,
            other_recoverable_taxes: parse_decimal_field(
                "other_recoverable_taxes",
                raw.other_recoverable_taxes.as_deref(),
            )?,
            indirect_costs_percent: parse_decimal_field(
                "indirect_costs_percent",
                raw.indirect_costs_percent.as_deref(),
            )?,
            operating_margin_percent: parse_decimal_field(
                "operating_margin_percent",
                raw.operating_margin_percent.as_deref(),
            )?,
        };
        params.validate()?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn cell(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    fn raw_totals() -> RawTaxTotals {
        RawTaxTotals {
            customs_value: cell("10000"),
            ii_due: cell("600"),
            ipi_due: cell("200"),
            pis_due: cell("165"),
            cofins_due: cell("760"),
            icms_due: cell("1700"),
            customs_expenses: cell("300"),
            additions: vec![RawAddition {
                number: 1,
                ncm: cell("8471.30.12"),
            }],
        }
    }

    // =========================================================================
    // combinator tests
    // =========================================================================

    #[test]
    fn parse_decimal_field_rejects_non_numeric_text() {
        let err = parse_decimal_field("icms_due", Some("mil")).unwrap_err();

        assert!(matches!(
            err,
            PricingError::InvalidType { ref field, .. } if field == "icms_due"
        ));
    }

    #[test]
    fn parse_decimal_field_accepts_explicit_zero() {
        assert_eq!(parse_decimal_field("ipi_due", Some("0")), Ok(dec!(0)));
    }

    #[test]
    fn non_negative_accepts_zero() {
        assert_eq!(non_negative("ii_due", dec!(0.00)), Ok(dec!(0.00)));
    }

    #[test]
    fn percent_within_accepts_bounds() {
        assert_eq!(
            percent_within("p", dec!(100), Decimal::ONE_HUNDRED),
            Ok(dec!(100))
        );
        assert_eq!(percent_within("p", dec!(0), Decimal::ONE_HUNDRED), Ok(dec!(0)));
    }

    #[test]
    fn positive_rejects_zero_as_invalid_base() {
        assert_eq!(
            positive("base_cost", dec!(0)),
            Err(PricingError::InvalidBase {
                name: "base_cost",
                value: dec!(0),
            })
        );
    }

    // =========================================================================
    // RawTaxTotals conversion tests
    // =========================================================================

    #[test]
    fn raw_totals_convert_to_typed_totals() {
        let totals = TaxTotals::try_from(raw_totals()).expect("valid totals");

        assert_eq!(totals.customs_value, dec!(10000));
        assert_eq!(totals.customs_expenses, dec!(300));
        assert_eq!(
            totals.additions,
            vec![Addition {
                number: 1,
                ncm: "8471.30.12".to_string(),
            }]
        );
    }

    #[test]
    fn raw_totals_missing_tax_is_an_error_not_zero() {
        let raw = RawTaxTotals {
            pis_due: None,
            ..raw_totals()
        };

        assert_eq!(
            TaxTotals::try_from(raw),
            Err(PricingError::MissingField("pis_due".to_string()))
        );
    }

    #[test]
    fn raw_totals_blank_cell_counts_as_missing() {
        let raw = RawTaxTotals {
            customs_value: cell("   "),
            ..raw_totals()
        };

        assert_eq!(
            TaxTotals::try_from(raw),
            Err(PricingError::MissingField("customs_value".to_string()))
        );
    }

    #[test]
    fn raw_totals_missing_ncm_names_the_addition() {
        let raw = RawTaxTotals {
            additions: vec![RawAddition {
                number: 3,
                ncm: None,
            }],
            ..raw_totals()
        };

        assert_eq!(
            TaxTotals::try_from(raw),
            Err(PricingError::MissingField("additions[3].ncm".to_string()))
        );
    }

    #[test]
    fn raw_totals_reject_negative_amounts() {
        let raw = RawTaxTotals {
            ii_due: cell("-5"),
            ..raw_totals()
        };

        assert!(matches!(
            TaxTotals::try_from(raw),
            Err(PricingError::InvalidType { ref field, .. }) if field == "ii_due"
        ));
    }

    // =========================================================================
    // RawManagerialParameters conversion tests
    // =========================================================================

    #[test]
    fn raw_params_require_every_field() {
        let raw = RawManagerialParameters {
            financial_charges_percent: cell("2"),
            other_recoverable_taxes: cell("0"),
            indirect_costs_percent: None,
            operating_margin_percent: cell("30"),
        };

        assert_eq!(
            ManagerialParameters::try_from(raw),
            Err(PricingError::MissingField(
                "indirect_costs_percent".to_string()
            ))
        );
    }

    #[test]
    fn raw_params_reject_out_of_range_percent() {
        let raw = RawManagerialParameters {
            financial_charges_percent: cell("150"),
            other_recoverable_taxes: cell("0"),
            indirect_costs_percent: cell("10"),
            operating_margin_percent: cell("30"),
        };

        assert!(matches!(
            ManagerialParameters::try_from(raw),
            Err(PricingError::InvalidType { ref field, .. }) if field == "financial_charges_percent"
        ));
    }
}
