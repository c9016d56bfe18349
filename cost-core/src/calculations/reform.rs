//! Year-by-year projection of state ICMS benefits through the consumption-tax
//! reform transition.
//!
//! Benefits are kept in full until [`REFORM_TRANSITION_START`], shrink to the
//! configured retained factor for each transition year, and are extinguished
//! after the last configured year.

use std::iter::FusedIterator;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::PricingError;
use crate::config::ReformSchedule;

/// First year in which incentive benefits start to shrink.
pub const REFORM_TRANSITION_START: i32 = 2029;

/// Last year projected when the caller does not choose an end year.
pub const DEFAULT_PROJECTION_END: i32 = 2033;

const EXTINGUISHED_LABEL: &str = "Extinto";

/// Benefit level for a single calendar year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearScenario {
    pub year: i32,
    /// Share of the benefit kept in this year, in [0, 1].
    pub retained_multiplier: Decimal,
    pub phase_label: String,
    pub extinguished: bool,
}

impl YearScenario {
    /// The portion of `amount` still granted in this year.
    pub fn retained_amount(
        &self,
        amount: Decimal,
    ) -> Decimal {
        amount * self.retained_multiplier
    }
}

/// Lazy projection over an inclusive year range.
///
/// Clone the projection before consuming it to walk the same years again.
#[derive(Debug, Clone)]
pub struct ReformProjection<'a> {
    schedule: &'a ReformSchedule,
    next: i32,
    end: i32,
}

impl<'a> ReformProjection<'a> {
    pub fn new(
        schedule: &'a ReformSchedule,
        start_year: i32,
        end_year: i32,
    ) -> Self {
        Self {
            schedule,
            next: start_year,
            end: end_year,
        }
    }

    fn scenario(
        &self,
        year: i32,
    ) -> Result<YearScenario, PricingError> {
        if self.schedule.terminal_year().is_some_and(|terminal| year > terminal) {
            return Ok(YearScenario {
                year,
                retained_multiplier: Decimal::ZERO,
                phase_label: EXTINGUISHED_LABEL.to_string(),
                extinguished: true,
            });
        }

        let entry = self
            .schedule
            .get(year)
            .ok_or(PricingError::MissingYearConfig(year))?;

        let retained_multiplier = if year < REFORM_TRANSITION_START {
            Decimal::ONE
        } else {
            entry.retained
        };

        Ok(YearScenario {
            year,
            retained_multiplier,
            phase_label: entry.phase_label.clone(),
            extinguished: retained_multiplier.is_zero(),
        })
    }

    fn remaining(&self) -> usize {
        if self.next > self.end {
            0
        } else {
            (i64::from(self.end) - i64::from(self.next) + 1) as usize
        }
    }
}

impl Iterator for ReformProjection<'_> {
    type Item = Result<YearScenario, PricingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.end {
            return None;
        }
        let year = self.next;
        match year.checked_add(1) {
            Some(next) => self.next = next,
            None => self.end = year - 1,
        }
        Some(self.scenario(year))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ReformProjection<'_> {}

impl FusedIterator for ReformProjection<'_> {}
