use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::PricingError;

/// Corporate tax regime (regime tributário) of the importer.
///
/// Determines which taxes paid at import can be recovered as credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    LucroReal,
    LucroPresumido,
    SimplesNacional,
}

impl Regime {
    pub fn all() -> &'static [Regime] {
        &[
            Regime::LucroReal,
            Regime::LucroPresumido,
            Regime::SimplesNacional,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LucroReal => "lucro_real",
            Self::LucroPresumido => "lucro_presumido",
            Self::SimplesNacional => "simples_nacional",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::LucroReal => "Lucro Real",
            Self::LucroPresumido => "Lucro Presumido",
            Self::SimplesNacional => "Simples Nacional",
        }
    }
}

impl FromStr for Regime {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lucro_real" => Ok(Self::LucroReal),
            "lucro_presumido" => Ok(Self::LucroPresumido),
            "simples_nacional" => Ok(Self::SimplesNacional),
            _ => Err(PricingError::UnsupportedRegime(s.to_string())),
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a declaration carries monophasic products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportType {
    Normal,
    Monophasic,
}

impl ImportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Monophasic => "monophasic",
        }
    }
}

impl fmt::Display for ImportType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
