pub mod calculations;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;

pub use config::{ConfigError, ConfigSnapshot, ConfigurationProvider, ProviderError};
pub use error::PricingError;
pub use models::*;
pub use orchestrator::{
    IncentiveOutcome, IncentiveRequest, PricingOrchestrator, PricingRequest, PricingResult,
    ProjectedBenefit,
};
