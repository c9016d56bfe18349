use async_trait::async_trait;
use thiserror::Error;

use crate::models::{IncentiveProgram, NcmRestrictionSet, RateTable, ReformEntry};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Configuration entry not found: {0}")]
    NotFound(String),

    #[error("Configuration source error: {0}")]
    Source(String),

    #[error("Configuration source unavailable: {0}")]
    Unavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Read-only source of the tables the engines need.
///
/// Implementations are queried once per snapshot load; engines never call
/// them during a calculation.
#[async_trait]
pub trait ConfigurationProvider: Send + Sync {
    // Federal rates
    async fn rate_table(&self) -> Result<RateTable, ProviderError>;

    // Monophasic detection
    async fn monophasic_prefixes(&self) -> Result<Vec<String>, ProviderError>;

    // State incentive programs
    async fn programs(&self) -> Result<Vec<IncentiveProgram>, ProviderError>;
    async fn ncm_restrictions(&self) -> Result<Vec<NcmRestrictionSet>, ProviderError>;

    // Tax reform transition
    async fn reform_schedule(&self) -> Result<Vec<ReformEntry>, ProviderError>;
}
