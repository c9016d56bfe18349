mod declaration;
mod program;
mod rates;
mod reform;
mod regime;

pub use declaration::{Addition, MAX_MARGIN_PERCENT, ManagerialParameters, TaxTotals};
pub use program::{BenefitPhase, BenefitType, IncentiveProgram, NcmRestrictionSet, NfConfig};
pub use rates::RateTable;
pub use reform::ReformEntry;
pub use regime::{ImportType, Regime};
