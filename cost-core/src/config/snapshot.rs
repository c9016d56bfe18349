use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};

use super::provider::{ConfigurationProvider, ProviderError};
use super::tables::{MonophasicTable, ProgramRegistry, ReformSchedule};
use crate::calculations::{CostCascadeCalculator, IncentiveEngine, RegimeCreditEngine};
use crate::models::{IncentiveProgram, NcmRestrictionSet, RateTable, ReformEntry};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("configuration provider failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("invalid rate '{field}': {reason}")]
    InvalidRate { field: String, reason: String },

    #[error("invalid incentive program '{code}': {reason}")]
    InvalidProgram { code: String, reason: String },

    #[error("duplicate incentive program code '{0}'")]
    DuplicateProgram(String),

    #[error("NCM restrictions reference unknown program '{0}'")]
    UnknownRestrictionProgram(String),

    #[error("invalid NCM restriction '{pattern}' for program '{program}': {reason}")]
    InvalidPattern {
        program: String,
        pattern: String,
        reason: String,
    },

    #[error("invalid monophasic NCM heading '{0}' (expected 4 digits)")]
    InvalidMonophasicPrefix(String),

    #[error("invalid reform schedule entry for {year}: {reason}")]
    InvalidReformEntry { year: i32, reason: String },

    #[error("duplicate reform schedule entry for {0}")]
    DuplicateReformYear(i32),
}

/// Immutable, validated configuration captured for a set of calculations.
///
/// Build one per configuration load and share it (`Arc<ConfigSnapshot>`)
/// across workers; reloading produces a new snapshot and leaves calculations
/// holding the old one untouched.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    rates: RateTable,
    monophasic: MonophasicTable,
    programs: ProgramRegistry,
    reform: ReformSchedule,
}

impl ConfigSnapshot {
    /// Reads every table from `provider` and validates it.
    ///
    /// # Errors
    ///
    /// Provider failures are wrapped in [`ConfigError::Provider`]; validation
    /// failures are reported as returned by [`ConfigSnapshot::build`].
    pub async fn load(provider: &dyn ConfigurationProvider) -> Result<Self, ConfigError> {
        let rates = provider.rate_table().await?;
        let prefixes = provider.monophasic_prefixes().await?;
        let programs = provider.programs().await?;
        let restrictions = provider.ncm_restrictions().await?;
        let reform = provider.reform_schedule().await?;

        let snapshot = Self::build(rates, prefixes, programs, restrictions, reform)?;
        info!(
            programs = snapshot.programs.len(),
            monophasic_headings = snapshot.monophasic.len(),
            reform_terminal_year = ?snapshot.reform.terminal_year(),
            "configuration snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Validates already-fetched tables into a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a rate is outside [0, 100], or when any
    /// table fails its own validation.
    pub fn build(
        rates: RateTable,
        monophasic_prefixes: Vec<String>,
        programs: Vec<IncentiveProgram>,
        restrictions: Vec<NcmRestrictionSet>,
        reform: Vec<ReformEntry>,
    ) -> Result<Self, ConfigError> {
        for (field, value) in rates.named_rates() {
            if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
                return Err(ConfigError::InvalidRate {
                    field: field.to_string(),
                    reason: format!("must be a percentage between 0 and 100, got {value}"),
                });
            }
        }
        debug!(?rates, "rate table validated");

        Ok(Self {
            rates,
            monophasic: MonophasicTable::new(monophasic_prefixes)?,
            programs: ProgramRegistry::new(programs, restrictions)?,
            reform: ReformSchedule::new(reform)?,
        })
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    pub fn monophasic(&self) -> &MonophasicTable {
        &self.monophasic
    }

    pub fn programs(&self) -> &ProgramRegistry {
        &self.programs
    }

    pub fn reform(&self) -> &ReformSchedule {
        &self.reform
    }

    pub fn credit_engine(&self) -> RegimeCreditEngine<'_> {
        RegimeCreditEngine::new(&self.rates, &self.monophasic)
    }

    pub fn cascade_calculator(&self) -> CostCascadeCalculator<'_> {
        CostCascadeCalculator::new(self.credit_engine())
    }

    pub fn incentive_engine(&self) -> IncentiveEngine<'_> {
        IncentiveEngine::new(&self.programs, &self.reform)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::config::InMemoryProvider;

    fn rates() -> RateTable {
        RateTable {
            pis_import_rate: dec!(2.10),
            cofins_import_rate: dec!(9.65),
            pis_import_rate_monophasic: dec!(2.76),
            cofins_import_rate_monophasic: dec!(13.03),
            cofins_surcharge_rate: dec!(1.00),
        }
    }

    #[test]
    fn build_rejects_rate_above_one_hundred() {
        let result = ConfigSnapshot::build(
            RateTable {
                cofins_import_rate: dec!(965),
                ..rates()
            },
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );

        assert!(matches!(
            result,
            Err(ConfigError::InvalidRate { ref field, .. }) if field == "cofins_import_rate"
        ));
    }

    #[test]
    fn build_accepts_empty_optional_tables() {
        let snapshot =
            ConfigSnapshot::build(rates(), Vec::new(), Vec::new(), Vec::new(), Vec::new())
                .expect("rates alone are a valid configuration");

        assert!(snapshot.programs().is_empty());
        assert!(snapshot.monophasic().is_empty());
        assert!(snapshot.reform().is_empty());
    }

    #[tokio::test]
    async fn load_reads_every_table_from_provider() {
        let provider = InMemoryProvider {
            rates: Some(rates()),
            monophasic_prefixes: vec!["3004".to_string()],
            ..Default::default()
        };

        let snapshot = ConfigSnapshot::load(&provider).await.unwrap();

        assert_eq!(snapshot.rates(), &rates());
        assert!(snapshot.monophasic().contains_heading("30049099"));
    }

    #[tokio::test]
    async fn load_propagates_provider_failure() {
        let provider = InMemoryProvider::default();

        let result = ConfigSnapshot::load(&provider).await;

        assert_eq!(
            result.unwrap_err(),
            ConfigError::Provider(ProviderError::NotFound("rate table".to_string()))
        );
    }
}
