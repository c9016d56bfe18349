use async_trait::async_trait;

use super::provider::{ConfigurationProvider, ProviderError};
use crate::models::{IncentiveProgram, NcmRestrictionSet, RateTable, ReformEntry};

/// Provider serving tables held in memory.
///
/// Used by embedders that assemble configuration themselves and by tests.
/// A missing rate table is reported as [`ProviderError::NotFound`]; every
/// other table may be empty.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    pub rates: Option<RateTable>,
    pub monophasic_prefixes: Vec<String>,
    pub programs: Vec<IncentiveProgram>,
    pub ncm_restrictions: Vec<NcmRestrictionSet>,
    pub reform_schedule: Vec<ReformEntry>,
}

#[async_trait]
impl ConfigurationProvider for InMemoryProvider {
    async fn rate_table(&self) -> Result<RateTable, ProviderError> {
        self.rates
            .clone()
            .ok_or_else(|| ProviderError::NotFound("rate table".to_string()))
    }

    async fn monophasic_prefixes(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.monophasic_prefixes.clone())
    }

    async fn programs(&self) -> Result<Vec<IncentiveProgram>, ProviderError> {
        Ok(self.programs.clone())
    }

    async fn ncm_restrictions(&self) -> Result<Vec<NcmRestrictionSet>, ProviderError> {
        Ok(self.ncm_restrictions.clone())
    }

    async fn reform_schedule(&self) -> Result<Vec<ReformEntry>, ProviderError> {
        Ok(self.reform_schedule.clone())
    }
}
