//! File-backed configuration and input loading for the pricing engines.

pub mod declarations;
pub mod loader;
pub mod logging;
pub mod toml_provider;

pub use declarations::{DeclarationLoader, DeclarationRecord};
pub use loader::{
    LoaderError, MonophasicPrefixLoader, MonophasicPrefixRecord, NcmRestrictionLoader,
    NcmRestrictionRecord, RestrictionKind,
};
pub use logging::init_tracing;
pub use toml_provider::TomlConfigurationProvider;
