//! Common arithmetic helpers for cost and invoice calculations.
//!
//! Cost tiers keep the precision carried by their inputs; only invoice fields,
//! which are printed on documents, are rounded to centavos.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::PricingError;

fn overflow(field: &str) -> PricingError {
    PricingError::invalid(field, "amount overflow")
}

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// Values at exactly 0.005 are rounded away from zero, matching the rounding
/// applied by SEFAZ validators to NF-e monetary fields.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use cost_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(1097.5609)), dec!(1097.56));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46)); // Away from zero
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Applies a percentage expressed in percent units (2.1 = 2.1%).
///
/// # Errors
///
/// Returns [`PricingError::InvalidType`] for `field` when the product does
/// not fit in a [`Decimal`].
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use cost_core::calculations::common::percent_of;
///
/// assert_eq!(percent_of("pis_credit", dec!(10200), dec!(2.1)), Ok(dec!(214.2)));
/// assert_eq!(percent_of("pis_credit", dec!(10200), dec!(0)), Ok(dec!(0)));
/// ```
pub fn percent_of(
    field: &str,
    amount: Decimal,
    percent: Decimal,
) -> Result<Decimal, PricingError> {
    amount
        .checked_mul(percent)
        .and_then(|product| product.checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(|| overflow(field))
}

/// Adds `values` without rounding.
///
/// # Errors
///
/// Returns [`PricingError::InvalidType`] for `field` when the sum does not
/// fit in a [`Decimal`].
pub fn checked_sum(
    field: &str,
    values: impl IntoIterator<Item = Decimal>,
) -> Result<Decimal, PricingError> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |total, value| total.checked_add(value))
        .ok_or_else(|| overflow(field))
}
