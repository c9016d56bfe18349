//! Configuration sources and the validated snapshot the engines read from.

pub mod memory;
pub mod provider;
pub mod snapshot;
pub mod tables;

pub use memory::InMemoryProvider;
pub use provider::{ConfigurationProvider, ProviderError};
pub use snapshot::{ConfigError, ConfigSnapshot};
pub use tables::{MonophasicTable, ProgramRegistry, RegisteredProgram, ReformSchedule};
