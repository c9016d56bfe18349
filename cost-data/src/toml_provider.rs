//! [`ConfigurationProvider`] backed by a TOML document.
//!
//! ```toml
//! [rates]
//! pis_import_rate = "2.10"
//! cofins_import_rate = "9.65"
//! pis_import_rate_monophasic = "2.76"
//! cofins_import_rate_monophasic = "13.03"
//! cofins_surcharge_rate = "1.00"
//!
//! [monophasic]
//! prefixes = ["3303", "3304"]
//! file = "monophasic.csv"          # optional, relative to this file
//!
//! [restrictions]
//! file = "ncm_restrictions.csv"    # optional, relative to this file
//!
//! [[programs]]
//! code = "TTD_409"
//! name = "TTD 409 - Santa Catarina"
//! eligible_states = ["SC"]
//! benefit_type = "partial_deferral"
//! booking_rate = "0.04"
//! calculation_rate = "0.04"
//! phases = [{ label = "Fase 1", anticipation_rate = "0.026" }]
//! nf_config = { cst = "51", benefit_code = "SC830015" }
//! restrictions = { exact = ["2203.00.00"], patterns = ["8703*"] }
//!
//! [[reform]]
//! year = 2029
//! retained = "0.9"
//! phase_label = "Transição 2029"
//! ```
//!
//! Decimals may be written as strings or numbers; strings avoid float
//! rounding. The document is read and parsed once by [`open`]; the trait
//! methods serve clones of the parsed tables.
//!
//! [`open`]: TomlConfigurationProvider::open

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cost_core::config::ProviderError;
use cost_core::{
    BenefitPhase, BenefitType, ConfigurationProvider, IncentiveProgram, NcmRestrictionSet,
    NfConfig, RateTable, ReformEntry,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::loader::{LoaderError, MonophasicPrefixLoader, NcmRestrictionLoader};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PricingDocument {
    rates: Option<RateTable>,
    #[serde(default)]
    monophasic: MonophasicSection,
    #[serde(default)]
    restrictions: RestrictionsSection,
    #[serde(default)]
    programs: Vec<ProgramEntry>,
    #[serde(default)]
    reform: Vec<ReformEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MonophasicSection {
    #[serde(default)]
    prefixes: Vec<String>,
    file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RestrictionsSection {
    file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProgramEntry {
    code: String,
    name: String,
    eligible_states: Vec<String>,
    benefit_type: String,
    booking_rate: Decimal,
    calculation_rate: Option<Decimal>,
    #[serde(default)]
    phases: Vec<BenefitPhase>,
    nf_config: Option<NfConfig>,
    restrictions: Option<InlineRestrictions>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InlineRestrictions {
    #[serde(default)]
    exact: Vec<String>,
    #[serde(default)]
    patterns: Vec<String>,
}

impl ProgramEntry {
    fn into_parts(self) -> Result<(IncentiveProgram, Option<NcmRestrictionSet>), ProviderError> {
        let benefit_type: BenefitType = self.benefit_type.parse().map_err(|err| {
            ProviderError::Configuration(format!("program '{}': {err}", self.code))
        })?;

        let restrictions = self.restrictions.map(|lists| NcmRestrictionSet {
            program_code: self.code.clone(),
            exact: lists.exact,
            patterns: lists.patterns,
        });

        let program = IncentiveProgram {
            code: self.code,
            name: self.name,
            eligible_states: self.eligible_states,
            benefit_type,
            booking_rate: self.booking_rate,
            calculation_rate: self.calculation_rate,
            phases: self.phases,
            nf_config: self.nf_config,
        };

        Ok((program, restrictions))
    }
}

/// Provider reading the pricing configuration from a TOML file plus the
/// optional CSV side files it references.
#[derive(Debug, Clone)]
pub struct TomlConfigurationProvider {
    rates: Option<RateTable>,
    monophasic_prefixes: Vec<String>,
    programs: Vec<IncentiveProgram>,
    ncm_restrictions: Vec<NcmRestrictionSet>,
    reform_schedule: Vec<ReformEntry>,
}

impl TomlConfigurationProvider {
    /// Read and parse the document at `path`.
    ///
    /// # Errors
    ///
    /// * [`ProviderError::NotFound`] if the document or a referenced CSV
    ///   file does not exist.
    /// * [`ProviderError::Unavailable`] for any other I/O failure.
    /// * [`ProviderError::Source`] for malformed TOML or CSV.
    /// * [`ProviderError::Configuration`] for an unsupported benefit type.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|err| io_error(path, err))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        Self::from_document(&text, base_dir).await
    }

    /// Parse a document held in memory. CSV side files are resolved
    /// against `base_dir`.
    pub async fn from_document(
        text: &str,
        base_dir: &Path,
    ) -> Result<Self, ProviderError> {
        let document: PricingDocument =
            toml::from_str(text).map_err(|err| ProviderError::Source(err.to_string()))?;

        let mut monophasic_prefixes = document.monophasic.prefixes;
        if let Some(file) = &document.monophasic.file {
            let path = base_dir.join(file);
            let bytes = read_side_file(&path).await?;
            let loaded =
                MonophasicPrefixLoader::load(bytes.as_slice()).map_err(|err| csv_error(&path, err))?;
            debug!(path = %path.display(), count = loaded.len(), "Loaded monophasic prefixes");
            monophasic_prefixes.extend(loaded);
        }

        let mut programs = Vec::with_capacity(document.programs.len());
        let mut ncm_restrictions = Vec::new();
        for entry in document.programs {
            let (program, restrictions) = entry.into_parts()?;
            programs.push(program);
            ncm_restrictions.extend(restrictions);
        }

        if let Some(file) = &document.restrictions.file {
            let path = base_dir.join(file);
            let bytes = read_side_file(&path).await?;
            let loaded =
                NcmRestrictionLoader::load(bytes.as_slice()).map_err(|err| csv_error(&path, err))?;
            debug!(path = %path.display(), programs = loaded.len(), "Loaded NCM restrictions");
            ncm_restrictions.extend(loaded);
        }

        Ok(Self {
            rates: document.rates,
            monophasic_prefixes,
            programs,
            ncm_restrictions,
            reform_schedule: document.reform,
        })
    }
}

async fn read_side_file(path: &Path) -> Result<Vec<u8>, ProviderError> {
    tokio::fs::read(path).await.map_err(|err| io_error(path, err))
}

fn io_error(
    path: &Path,
    err: std::io::Error,
) -> ProviderError {
    match err.kind() {
        std::io::ErrorKind::NotFound => ProviderError::NotFound(path.display().to_string()),
        _ => ProviderError::Unavailable(format!("{}: {err}", path.display())),
    }
}

fn csv_error(
    path: &Path,
    err: LoaderError,
) -> ProviderError {
    ProviderError::Source(format!("{}: {err}", path.display()))
}

#[async_trait]
impl ConfigurationProvider for TomlConfigurationProvider {
    async fn rate_table(&self) -> Result<RateTable, ProviderError> {
        self.rates
            .clone()
            .ok_or_else(|| ProviderError::NotFound("[rates] section".to_string()))
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
