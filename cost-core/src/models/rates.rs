use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::ImportType;

/// Federal import contribution rates, in percent (2.10 = 2.10%).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTable {
    /// PIS-Importação rate for ordinary goods.
    pub pis_import_rate: Decimal,
    /// COFINS-Importação rate for ordinary goods.
    pub cofins_import_rate: Decimal,
    /// PIS-Importação rate for monophasic goods.
    pub pis_import_rate_monophasic: Decimal,
    /// COFINS-Importação rate for monophasic goods, without the surcharge.
    pub cofins_import_rate_monophasic: Decimal,
    /// Additional COFINS-Importação on monophasic goods. Never creditable.
    pub cofins_surcharge_rate: Decimal,
}

impl RateTable {
    /// The (PIS, COFINS) credit rates that apply to `import_type`.
    pub fn credit_rates(
        &self,
        import_type: ImportType,
    ) -> (Decimal, Decimal) {
        match import_type {
            ImportType::Normal => (self.pis_import_rate, self.cofins_import_rate),
            ImportType::Monophasic => (
                self.pis_import_rate_monophasic,
                self.cofins_import_rate_monophasic,
            ),
        }
    }

    pub fn named_rates(&self) -> [(&'static str, Decimal); 5] {
        [
            ("pis_import_rate", self.pis_import_rate),
            ("cofins_import_rate", self.cofins_import_rate),
            ("pis_import_rate_monophasic", self.pis_import_rate_monophasic),
            (
                "cofins_import_rate_monophasic",
                self.cofins_import_rate_monophasic,
            ),
            ("cofins_surcharge_rate", self.cofins_surcharge_rate),
        ]
    }
}
