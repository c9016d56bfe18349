use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One year of the tax-reform transition schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReformEntry {
    pub year: i32,
    /// Share of ICMS benefits still retained that year (0–1).
    pub retained: Decimal,
    pub phase_label: String,
}
